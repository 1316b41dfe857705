//! # UI Module
//!
//! This module contains all UI components for the WaveLab classroom.

pub mod main_display;
pub mod match_meter;
pub mod parcours_display;
pub mod piano_keyboard;
pub mod wave_display;
