//! # Synth Playback Module
//!
//! A single sine voice for the explorer and keyboard views. Gain changes are
//! linear ramps so starting, stopping and moving the sliders never click.

use std::f32::consts::TAU;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Result, WaveError};

/// Parameters shared between the controlling thread and the audio callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthParams {
    pub frequency: f32,
    /// Target gain in [0, 1]
    pub amplitude: f32,
    /// Time to reach the target gain
    pub ramp_ms: f32,
}

/// The parameter cell a render callback reads once per buffer.
///
/// Writers never wait on the audio thread; a poisoned lock is recovered.
#[derive(Debug, Clone)]
pub struct SharedParams(Arc<Mutex<SynthParams>>);

impl SharedParams {
    /// Silent voice at `frequency`.
    pub fn new(frequency: f32) -> Self {
        Self(Arc::new(Mutex::new(SynthParams {
            frequency,
            amplitude: 0.0,
            ramp_ms: 0.0,
        })))
    }

    pub fn get(&self) -> SynthParams {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_frequency(&self, frequency: f32) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).frequency = frequency;
    }

    /// Moves the gain to `amplitude` over `ramp_ms`.
    pub fn fade_to(&self, amplitude: f32, ramp_ms: f32) {
        let mut params = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        params.amplitude = amplitude;
        params.ramp_ms = ramp_ms;
    }
}

/// Phase-accumulating sine oscillator with a linear gain ramp.
#[derive(Debug, Clone)]
pub struct SineOscillator {
    sample_rate: f32,
    frequency: f32,
    phase: f32,
    gain: f32,
    target_gain: f32,
    gain_step: f32,
}

impl SineOscillator {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frequency: 440.0,
            phase: 0.0,
            gain: 0.0,
            target_gain: 0.0,
            gain_step: 0.0,
        }
    }

    /// Applies new parameters; only a changed target restarts the ramp.
    pub fn apply(&mut self, params: &SynthParams) {
        self.frequency = params.frequency.max(0.0);
        let target = params.amplitude.clamp(0.0, 1.0);
        if target != self.target_gain {
            self.target_gain = target;
            let ramp_samples = (params.ramp_ms / 1000.0 * self.sample_rate).max(1.0);
            self.gain_step = (target - self.gain).abs() / ramp_samples;
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> f32 {
        if self.gain < self.target_gain {
            self.gain = (self.gain + self.gain_step).min(self.target_gain);
        } else if self.gain > self.target_gain {
            self.gain = (self.gain - self.gain_step).max(self.target_gain);
        }

        let sample = (TAU * self.phase).sin() * self.gain;
        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        sample
    }
}

/// Tone generator the session drives from explorer and keyboard commands.
pub trait SynthOutput: Send {
    /// Starts (or retunes) the tone, fading in.
    fn start(&mut self, frequency: f32, amplitude: f32) -> Result<()>;

    fn set_frequency(&mut self, frequency: f32);

    fn set_amplitude(&mut self, amplitude: f32);

    /// Fades out. Returns at once; the output device stays open.
    fn stop(&mut self);
}

/// Output used when the crate is built without a backend.
#[derive(Debug, Default)]
pub struct NoOutput;

impl SynthOutput for NoOutput {
    fn start(&mut self, _frequency: f32, _amplitude: f32) -> Result<()> {
        Err(WaveError::OutputUnavailable(
            "built without audio support".to_string(),
        ))
    }

    fn set_frequency(&mut self, _frequency: f32) {}

    fn set_amplitude(&mut self, _amplitude: f32) {}

    fn stop(&mut self) {}
}

#[cfg(feature = "audio")]
pub use self::cpal_output::CpalSynth;

#[cfg(feature = "audio")]
mod cpal_output {
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use crossbeam_channel::{Receiver, Sender};
    use tracing::{debug, info, warn};

    use super::{SharedParams, SineOscillator, SynthOutput};
    use crate::config::SynthConfig;
    use crate::error::{Result, WaveError};

    struct PlaybackWorker {
        shutdown_tx: Sender<()>,
        thread_handle: Option<JoinHandle<()>>,
    }

    /// Sine playback on the default CPAL output device.
    ///
    /// The output stream is opened on the first `start` and lives on a
    /// playback thread until the synth is dropped. Starting and stopping
    /// only move the target gain, so neither waits on the device.
    pub struct CpalSynth {
        config: SynthConfig,
        params: SharedParams,
        worker: Option<PlaybackWorker>,
    }

    impl CpalSynth {
        pub fn new(config: SynthConfig) -> Self {
            let params = SharedParams::new(config.frequency);
            Self {
                config,
                params,
                worker: None,
            }
        }

        fn open(&self) -> Result<PlaybackWorker> {
            let (status_tx, status_rx) = crossbeam_channel::bounded::<Result<()>>(1);
            let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
            let params = self.params.clone();
            let release = Duration::from_secs_f32(self.config.release_ms.max(0.0) / 1000.0);

            let thread_handle = thread::Builder::new()
                .name("wavelab-synth".to_string())
                .spawn(move || {
                    let stream = match start_playback(params) {
                        Ok(stream) => {
                            let _ = status_tx.send(Ok(()));
                            stream
                        }
                        Err(e) => {
                            let _ = status_tx.send(Err(e));
                            return;
                        }
                    };
                    let _ = shutdown_rx.recv();
                    // Let the release ramp finish before tearing down.
                    thread::sleep(release);
                    if let Err(e) = stream.pause() {
                        warn!("Error pausing output stream: {}", e);
                    }
                    drop(stream);
                    debug!("Synth thread finished");
                })
                .map_err(|e| WaveError::OutputUnavailable(e.to_string()))?;

            if let Err(e) = wait_for_status(&status_rx) {
                let _ = thread_handle.join();
                return Err(e);
            }
            Ok(PlaybackWorker {
                shutdown_tx,
                thread_handle: Some(thread_handle),
            })
        }
    }

    impl SynthOutput for CpalSynth {
        fn start(&mut self, frequency: f32, amplitude: f32) -> Result<()> {
            if self.worker.is_none() {
                self.worker = Some(self.open()?);
            }
            self.params.set_frequency(frequency);
            self.params.fade_to(amplitude, self.config.attack_ms);
            info!("Synth playing {:.1} Hz", frequency);
            Ok(())
        }

        fn set_frequency(&mut self, frequency: f32) {
            self.params.set_frequency(frequency);
        }

        fn set_amplitude(&mut self, amplitude: f32) {
            self.params.fade_to(amplitude, self.config.attack_ms);
        }

        fn stop(&mut self) {
            self.params.fade_to(0.0, self.config.release_ms);
            debug!("Synth released");
        }
    }

    impl Drop for CpalSynth {
        fn drop(&mut self) {
            self.stop();
            if let Some(mut worker) = self.worker.take() {
                let _ = worker.shutdown_tx.send(());
                if let Some(handle) = worker.thread_handle.take() {
                    if handle.join().is_err() {
                        warn!("Synth thread panicked during shutdown");
                    }
                }
                info!("Synth output closed");
            }
        }
    }

    fn wait_for_status(status_rx: &Receiver<Result<()>>) -> Result<()> {
        match status_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(result) => result,
            Err(_) => Err(WaveError::OutputUnavailable(
                "output device did not open in time".to_string(),
            )),
        }
    }

    /// Opens the default output device and renders the oscillator into it.
    fn start_playback(params: SharedParams) -> Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| WaveError::OutputUnavailable("No output device found".to_string()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| WaveError::OutputUnavailable(e.to_string()))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(WaveError::OutputUnavailable(format!(
                "unsupported output sample format {:?}",
                supported.sample_format()
            )));
        }

        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels.max(1) as usize;
        info!(
            "Audio output: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate.0
        );

        let mut oscillator = SineOscillator::new(config.sample_rate.0 as f32);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    oscillator.apply(&params.get());
                    for frame in data.chunks_mut(channels) {
                        let sample = oscillator.next_sample();
                        frame.fill(sample);
                    }
                },
                |err| warn!("Audio output stream error: {}", err),
                None,
            )
            .map_err(|e| WaveError::OutputUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| WaveError::Stream(e.to_string()))?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(frequency: f32, amplitude: f32, ramp_ms: f32) -> SynthParams {
        SynthParams {
            frequency,
            amplitude,
            ramp_ms,
        }
    }

    #[test]
    fn gain_ramps_linearly_to_target() {
        let mut osc = SineOscillator::new(1000.0);
        osc.apply(&params(100.0, 0.5, 10.0));
        // 10 ms at 1 kHz = 10 samples.
        for _ in 0..5 {
            osc.next_sample();
        }
        assert!((osc.gain() - 0.25).abs() < 1e-5);
        for _ in 0..20 {
            osc.next_sample();
        }
        assert_eq!(osc.gain(), 0.5);
    }

    #[test]
    fn release_fades_to_silence() {
        let mut osc = SineOscillator::new(1000.0);
        osc.apply(&params(100.0, 1.0, 0.0));
        osc.next_sample();
        assert_eq!(osc.gain(), 1.0);
        osc.apply(&params(100.0, 0.0, 100.0));
        for _ in 0..100 {
            osc.next_sample();
        }
        assert!(osc.gain().abs() < 1e-5);
    }

    #[test]
    fn output_stays_within_gain() {
        let mut osc = SineOscillator::new(44100.0);
        osc.apply(&params(440.0, 0.3, 0.0));
        let peak = (0..4410).map(|_| osc.next_sample().abs()).fold(0.0, f32::max);
        assert!(peak <= 0.3 + 1e-6);
        assert!(peak > 0.29);
    }

    #[test]
    fn one_voice_survives_stop_and_restart() {
        let shared = SharedParams::new(220.0);
        let mut osc = SineOscillator::new(1000.0);
        let render = |osc: &mut SineOscillator, samples: usize| {
            osc.apply(&shared.get());
            for _ in 0..samples {
                osc.next_sample();
            }
        };

        shared.fade_to(0.8, 10.0);
        render(&mut osc, 20);
        assert_eq!(osc.gain(), 0.8);

        // Stopping only ramps the gain down; the callback keeps running.
        shared.fade_to(0.0, 100.0);
        render(&mut osc, 50);
        assert!((osc.gain() - 0.4).abs() < 1e-4);
        render(&mut osc, 60);
        assert_eq!(osc.gain(), 0.0);

        shared.set_frequency(330.0);
        shared.fade_to(0.5, 10.0);
        render(&mut osc, 20);
        assert_eq!(osc.gain(), 0.5);
        assert_eq!(shared.get().frequency, 330.0);
    }

    #[test]
    fn no_output_refuses_to_start() {
        assert!(matches!(
            NoOutput.start(440.0, 0.5),
            Err(WaveError::OutputUnavailable(_))
        ));
    }
}
