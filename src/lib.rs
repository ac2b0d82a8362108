//! Streaming spectrum analysis: a windowed real FFT fed from arbitrarily
//! chunked audio, refreshed at a fixed display rate, plus the axis mapping
//! used to place bins and levels on screen.

pub mod audio;
pub mod display;
pub mod dsp;
pub mod settings;
pub mod util;
