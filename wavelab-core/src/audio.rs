//! # Audio Capture Module
//!
//! This module handles live microphone capture. It defines the
//! [`SampleBuffer`] analysis window, the [`InputDevice`] collaborator the
//! session talks to, and (with the `audio` feature) a CPAL-backed device.
//!
//! ## Features
//! - Non-blocking acquisition: the stream is opened on a capture thread and
//!   the tick loop simply sees no buffer until the first window arrives
//! - Mono f32 capture close to 44.1 kHz, with channel down-mixing as fallback
//! - Synchronous release that stops the stream before returning

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::error::Result;

/// One immutable analysis window of raw input samples.
///
/// Samples are nominally in [-1, 1]. Cloning is cheap: the samples are
/// shared, never copied.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate of the device the window was captured from, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A live audio input the session can listen to.
///
/// `acquire` only starts the request; a device that is still opening returns
/// `Ok(None)` from `read_buffer`. A device that turned out to be unavailable
/// reports `WaveError::DeviceUnavailable` from either call.
pub trait InputDevice: Send {
    /// Requests access to the input hardware.
    fn acquire(&mut self) -> Result<()>;

    /// Returns the newest complete window, if one arrived since the last call.
    fn read_buffer(&mut self) -> Result<Option<SampleBuffer>>;

    /// Stops capturing and frees the hardware before returning.
    fn release(&mut self);
}

/// Placeholder input used when the crate is built without a backend.
///
/// Every acquisition fails, which the session turns into the usual
/// device-unavailable fallback.
#[derive(Debug, Default)]
pub struct NoInput;

impl InputDevice for NoInput {
    fn acquire(&mut self) -> Result<()> {
        Err(crate::error::WaveError::DeviceUnavailable(
            "built without audio support".to_string(),
        ))
    }

    fn read_buffer(&mut self) -> Result<Option<SampleBuffer>> {
        Ok(None)
    }

    fn release(&mut self) {}
}

#[cfg(feature = "audio")]
pub use self::cpal_input::CpalInput;

/// Queues `frame` without blocking. When the queue is full the oldest
/// queued frame is evicted so the reader always finds the freshest audio.
#[cfg_attr(not(feature = "audio"), allow(dead_code))]
fn push_latest(
    sender: &Sender<SampleBuffer>,
    evict: &Receiver<SampleBuffer>,
    frame: SampleBuffer,
) {
    if let Err(TrySendError::Full(frame)) = sender.try_send(frame) {
        let _ = evict.try_recv();
        let _ = sender.try_send(frame);
    }
}

#[cfg(feature = "audio")]
mod cpal_input {
    use std::thread::{self, JoinHandle};

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::SupportedStreamConfigRange;
    use crossbeam_channel::{Receiver, Sender, TryRecvError};
    use tracing::{debug, info, warn};

    use super::{push_latest, InputDevice, SampleBuffer};
    use crate::error::{Result, WaveError};

    /// Preferred capture rate in Hz.
    const TARGET_SAMPLE_RATE: u32 = 44100;

    /// Frames queued between the callback and the tick loop.
    /// The oldest frame is evicted when the tick loop falls behind.
    const FRAME_QUEUE: usize = 8;

    enum CaptureStatus {
        Pending,
        Ready,
        Failed(WaveError),
    }

    struct CaptureWorker {
        shutdown_tx: Sender<()>,
        thread_handle: Option<JoinHandle<()>>,
        status_rx: Receiver<Result<u32>>,
        frame_rx: Receiver<SampleBuffer>,
        status: CaptureStatus,
    }

    /// Microphone input on the default CPAL host.
    ///
    /// The `cpal::Stream` lives on a dedicated capture thread, so this handle
    /// can be moved into any context that drives the session.
    pub struct CpalInput {
        buffer_size: usize,
        worker: Option<CaptureWorker>,
    }

    impl CpalInput {
        pub fn new(buffer_size: usize) -> Self {
            Self {
                buffer_size,
                worker: None,
            }
        }
    }

    impl InputDevice for CpalInput {
        fn acquire(&mut self) -> Result<()> {
            if self.worker.is_some() {
                return Ok(());
            }

            let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_QUEUE);
            let evict_rx = frame_rx.clone();
            let (status_tx, status_rx) = crossbeam_channel::bounded(1);
            let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
            let buffer_size = self.buffer_size;

            let thread_handle = thread::Builder::new()
                .name("wavelab-capture".to_string())
                .spawn(move || {
                    let stream = match start_audio_capture(frame_tx, evict_rx, buffer_size) {
                        Ok((stream, sample_rate)) => {
                            let _ = status_tx.send(Ok(sample_rate));
                            stream
                        }
                        Err(e) => {
                            warn!("Could not start audio capture: {}", e);
                            let _ = status_tx.send(Err(e));
                            return;
                        }
                    };

                    // Park until release; a dropped sender also ends capture.
                    let _ = shutdown_rx.recv();

                    if let Err(e) = stream.pause() {
                        warn!("Error pausing input stream: {}", e);
                    }
                    drop(stream);
                    debug!("Capture thread finished");
                })
                .map_err(|e| WaveError::DeviceUnavailable(e.to_string()))?;

            self.worker = Some(CaptureWorker {
                shutdown_tx,
                thread_handle: Some(thread_handle),
                status_rx,
                frame_rx,
                status: CaptureStatus::Pending,
            });
            Ok(())
        }

        fn read_buffer(&mut self) -> Result<Option<SampleBuffer>> {
            let Some(worker) = self.worker.as_mut() else {
                return Err(WaveError::DeviceUnavailable(
                    "input device not acquired".to_string(),
                ));
            };

            if let CaptureStatus::Pending = worker.status {
                worker.status = match worker.status_rx.try_recv() {
                    Ok(Ok(sample_rate)) => {
                        info!("Microphone ready at {} Hz", sample_rate);
                        CaptureStatus::Ready
                    }
                    Ok(Err(e)) => CaptureStatus::Failed(e),
                    Err(TryRecvError::Empty) => CaptureStatus::Pending,
                    Err(TryRecvError::Disconnected) => CaptureStatus::Failed(
                        WaveError::DeviceUnavailable("capture thread exited".to_string()),
                    ),
                };
            }

            match &worker.status {
                CaptureStatus::Failed(e) => Err(e.clone()),
                CaptureStatus::Pending => Ok(None),
                CaptureStatus::Ready => Ok(worker.frame_rx.try_iter().last()),
            }
        }

        fn release(&mut self) {
            if let Some(mut worker) = self.worker.take() {
                let _ = worker.shutdown_tx.send(());
                if let Some(handle) = worker.thread_handle.take() {
                    if handle.join().is_err() {
                        warn!("Capture thread panicked during release");
                    }
                }
                info!("Microphone released");
            }
        }
    }

    impl Drop for CpalInput {
        fn drop(&mut self) {
            self.release();
        }
    }

    /// Starts audio capture from the default input device.
    ///
    /// Frames of exactly `buffer_size` samples are pushed to `sender`; when
    /// the queue is full the oldest frame is taken off through `evict`
    /// rather than blocking the audio callback.
    fn start_audio_capture(
        sender: Sender<SampleBuffer>,
        evict: Receiver<SampleBuffer>,
        buffer_size: usize,
    ) -> Result<(cpal::Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| WaveError::DeviceUnavailable("No input device available".to_string()))?;

        info!(
            "Using audio input device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        let configs = device
            .supported_input_configs()
            .map_err(|e| WaveError::DeviceUnavailable(e.to_string()))?
            .collect::<Vec<_>>();

        let config: cpal::StreamConfig = match find_supported_config(configs, TARGET_SAMPLE_RATE) {
            Some(range) => {
                let rate = TARGET_SAMPLE_RATE
                    .clamp(range.min_sample_rate().0, range.max_sample_rate().0);
                range.with_sample_rate(cpal::SampleRate(rate)).into()
            }
            None => {
                let default = device
                    .default_input_config()
                    .map_err(|e| WaveError::DeviceUnavailable(e.to_string()))?;
                if default.sample_format() != cpal::SampleFormat::F32 {
                    return Err(WaveError::DeviceUnavailable(
                        "No suitable f32 input format found".to_string(),
                    ));
                }
                default.into()
            }
        };

        let sample_rate = config.sample_rate.0;
        let channels = config.channels.max(1) as usize;
        info!("Selected input: {} Hz, {} channel(s)", sample_rate, channels);

        let err_fn = |err| warn!("An error occurred on the input stream: {}", err);

        // Accumulates mono samples from the callback until a full frame exists.
        let mut audio_buffer: Vec<f32> = Vec::with_capacity(buffer_size * 2);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if channels == 1 {
                        audio_buffer.extend_from_slice(data);
                    } else {
                        audio_buffer.extend(
                            data.chunks(channels)
                                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
                        );
                    }

                    while audio_buffer.len() >= buffer_size {
                        let frame: Vec<f32> = audio_buffer.drain(..buffer_size).collect();
                        push_latest(&sender, &evict, SampleBuffer::new(frame, sample_rate));
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| WaveError::DeviceUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| WaveError::Stream(e.to_string()))?;

        Ok((stream, sample_rate))
    }

    /// Picks the mono f32 configuration whose rate range lies closest to the
    /// target rate.
    fn find_supported_config(
        configs: Vec<SupportedStreamConfigRange>,
        target_rate: u32,
    ) -> Option<SupportedStreamConfigRange> {
        configs
            .into_iter()
            .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
            .min_by_key(|c| {
                let min = c.min_sample_rate().0;
                let max = c.max_sample_rate().0;
                if (min..=max).contains(&target_rate) {
                    0
                } else {
                    min.abs_diff(target_rate).min(max.abs_diff(target_rate))
                }
            })
    }
}
