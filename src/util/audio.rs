// Default sample rate (Hz) used until a source reports its actual rate.
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;

// Spectrum refreshes per second, independent of the audio block rate.
pub const DEFAULT_TARGET_FPS: f64 = 15.0;

pub const MIN_WINDOW_SIZE: usize = 1_024;
pub const MAX_WINDOW_SIZE: usize = 16_384;

// Preferred analysis length when none is configured.
const ACCURACY_WINDOW_SIZE: usize = 8_192;

/// Picks the analysis window for `sample_rate`.
///
/// Without an explicit request this is the larger of 8192 samples and a third
/// of a second. The result is always a power of two in
/// `[MIN_WINDOW_SIZE, MAX_WINDOW_SIZE]`.
pub fn select_window_size(sample_rate: f64, requested: Option<usize>) -> usize {
    let wanted = requested.unwrap_or_else(|| {
        let third = (sample_rate.max(0.0) / 3.0) as usize;
        third.max(ACCURACY_WINDOW_SIZE)
    });
    wanted
        .clamp(MIN_WINDOW_SIZE, MAX_WINDOW_SIZE)
        .next_power_of_two()
}

#[inline]
pub fn apply_window(buffer: &mut [f32], window: &[f32]) {
    debug_assert_eq!(buffer.len(), window.len());
    for (sample, coeff) in buffer.iter_mut().zip(window.iter()) {
        *sample *= *coeff;
    }
}
