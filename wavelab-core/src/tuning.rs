//! # Musical Tuning Module
//!
//! Equal-temperament frequencies for the on-screen keyboard.
//!
//! ## Features
//! - 88-key note table (A0 to C8), A4 = 440 Hz
//! - One-octave keyboard around middle C with an octave shift of ±2

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

/// The octave the keyboard shows at offset 0.
pub const MIDDLE_C_OCTAVE: i32 = 4;
/// Lowest octave shift of the keyboard.
pub const MIN_OCTAVE_OFFSET: i32 = -2;
/// Highest octave shift of the keyboard.
pub const MAX_OCTAVE_OFFSET: i32 = 2;

/// Pitch classes of the keyboard, left to right.
pub const KEY_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Note name ("A4", "C#3") to frequency for a standard 88-key piano.
static NOTES: Lazy<BTreeMap<String, f32>> = Lazy::new(|| {
    const NOTE_NAMES: [&str; 12] = [
        "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
    ];
    (0..88)
        .map(|i| {
            // A4 is key 48; f = 440 * 2^(n/12) with n semitones from A4.
            let frequency = 440.0 * 2.0_f32.powf((i as f32 - 48.0) / 12.0);
            // The octave number changes at C, three keys above A.
            let octave = (i + 9) / 12;
            (format!("{}{}", NOTE_NAMES[i % 12], octave), frequency)
        })
        .collect()
});

/// Frequency of a named note such as "A4" or "C#3".
pub fn note_frequency(name: &str) -> Option<f32> {
    NOTES.get(name).copied()
}

/// Octave state of the on-screen keyboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keyboard {
    octave_offset: i32,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn octave_offset(&self) -> i32 {
        self.octave_offset
    }

    /// Octave shown on the middle C key.
    pub fn octave(&self) -> i32 {
        MIDDLE_C_OCTAVE + self.octave_offset
    }

    pub fn can_shift_down(&self) -> bool {
        self.octave_offset > MIN_OCTAVE_OFFSET
    }

    pub fn can_shift_up(&self) -> bool {
        self.octave_offset < MAX_OCTAVE_OFFSET
    }

    pub fn octave_down(&mut self) {
        if self.can_shift_down() {
            self.octave_offset -= 1;
        }
    }

    pub fn octave_up(&mut self) {
        if self.can_shift_up() {
            self.octave_offset += 1;
        }
    }

    /// Frequency of a keyboard key (a pitch class from [`KEY_NAMES`]) in the
    /// current octave.
    pub fn key_frequency(&self, key: &str) -> Option<f32> {
        if !KEY_NAMES.contains(&key) {
            return None;
        }
        note_frequency(&format!("{}{}", key, self.octave()))
    }

    /// All keys with their current frequencies, left to right.
    pub fn keys(&self) -> Vec<(&'static str, f32)> {
        KEY_NAMES
            .iter()
            .filter_map(|&key| self.key_frequency(key).map(|f| (key, f)))
            .collect()
    }
}
