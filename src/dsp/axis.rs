//! Display coordinate mapping for spectrum bins and power levels.
//!
//! Frequencies land on a logarithmic axis anchored so that low bins take up
//! proportionally more room; power is mapped through decibels onto `[0, 1]`
//! between caller supplied bounds. Nothing here draws.

/// ISO third-octave frequencies labelled on a spectrum grid, with a label
/// priority (0 = always shown).
pub const GRID_FREQUENCIES: &[(f32, u8)] = &[
    (20.0, 2),
    (31.5, 3),
    (40.0, 2),
    (50.0, 2),
    (63.0, 3),
    (80.0, 2),
    (100.0, 0),
    (125.0, 2),
    (160.0, 2),
    (200.0, 1),
    (250.0, 2),
    (315.0, 3),
    (400.0, 2),
    (500.0, 1),
    (630.0, 2),
    (800.0, 2),
    (1_000.0, 0),
    (1_250.0, 2),
    (1_600.0, 2),
    (2_000.0, 1),
    (2_500.0, 2),
    (3_150.0, 3),
    (4_000.0, 1),
    (5_000.0, 2),
    (6_300.0, 3),
    (8_000.0, 1),
    (10_000.0, 0),
    (16_000.0, 1),
];

/// Power (squared magnitude) to decibels. Zero and negative power map to `-inf`.
#[inline]
pub fn power_to_db(power: f32) -> f32 {
    // 10 rather than 20: the input is already squared.
    if power > 0.0 {
        10.0 * power.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Normalized vertical position of `power` between `min_db` and `max_db`.
///
/// Not clamped: values outside the range fall outside `[0, 1]`.
#[inline]
pub fn y_position(power: f32, min_db: f32, max_db: f32) -> f32 {
    debug_assert!(max_db > min_db);
    (power_to_db(power) - min_db) / (max_db - min_db)
}

/// Per-sample-rate constants of the logarithmic frequency axis.
///
/// At or below 8 kHz the logarithmic constants degenerate; `log_rate` and
/// `log_base` are then zero and positions fall back to a linear axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleParameters {
    pub log_rate: f32,
    pub log_base: f32,
}

impl ScaleParameters {
    pub fn new(sample_rate: f64) -> Self {
        let quarter = 4000.0 / sample_rate;
        let log_rate = ((1.0 - 8000.0 / sample_rate) / (quarter * quarter)) as f32;
        let log_base = (1.0 + log_rate).log10();
        if log_rate > 0.0 && log_base.is_finite() && log_base > 0.0 {
            Self { log_rate, log_base }
        } else {
            Self {
                log_rate: 0.0,
                log_base: 0.0,
            }
        }
    }

    pub fn is_logarithmic(&self) -> bool {
        self.log_base > 0.0
    }

    /// Normalized horizontal position of `v` on an axis spanning `bin_count` bins.
    #[inline]
    pub fn x_deflect(&self, v: f32, bin_count: usize) -> f32 {
        debug_assert!(bin_count > 0);
        if !self.is_logarithmic() {
            return v / bin_count as f32;
        }
        (1.0 + v * self.log_rate / bin_count as f32).log10() / self.log_base
    }
}

/// Centre frequency of `bin` for a transform of `window_size` samples.
#[inline]
pub fn bin_frequency(bin: usize, sample_rate: f64, window_size: usize) -> f64 {
    bin as f64 * sample_rate / window_size as f64
}

/// Fractional bin index of `frequency` for a transform of `window_size` samples.
#[inline]
pub fn frequency_bin(frequency: f64, sample_rate: f64, window_size: usize) -> f64 {
    frequency * window_size as f64 / sample_rate
}

/// Frequency axis used for drawing, independent of the analysis window.
///
/// Positions depend only on frequency and sample rate: rescaling bins to a
/// nominal display resolution before the log mapping cancels out, so a
/// given frequency stays put when the analysis window changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayScale {
    scale: ScaleParameters,
    analysis_bins: usize,
}

impl DisplayScale {
    pub fn new(sample_rate: f64, analysis_bins: usize) -> Self {
        Self {
            scale: ScaleParameters::new(sample_rate),
            analysis_bins: analysis_bins.max(1),
        }
    }

    /// Horizontal position of analysis bin `bin`.
    pub fn x_for_bin(&self, bin: f32) -> f32 {
        self.scale.x_deflect(bin, self.analysis_bins)
    }

    /// Horizontal position of `frequency` given the analysis configuration.
    pub fn x_for_frequency(&self, frequency: f64, sample_rate: f64, window_size: usize) -> f32 {
        self.x_for_bin(frequency_bin(frequency, sample_rate, window_size) as f32)
    }
}

/// Decibel grid lines from `max_db` down to `min_db` every `step_db`, paired
/// with their normalized vertical position.
pub fn db_grid(min_db: f32, max_db: f32, step_db: f32) -> impl Iterator<Item = (f32, f32)> {
    let valid = max_db > min_db && step_db > 0.0;
    let count = if valid {
        ((max_db - min_db) / step_db).floor() as usize + 1
    } else {
        0
    };
    (0..count).map(move |i| {
        let db = max_db - i as f32 * step_db;
        (db, (db - min_db) / (max_db - min_db))
    })
}

/// Grid frequencies below Nyquist with their horizontal position and label priority.
pub fn frequency_grid(
    scale: DisplayScale,
    sample_rate: f64,
    window_size: usize,
) -> impl Iterator<Item = (f32, f32, u8)> {
    let nyquist = sample_rate / 2.0;
    GRID_FREQUENCIES
        .iter()
        .filter(move |(freq, _)| (*freq as f64) < nyquist)
        .map(move |&(freq, priority)| {
            (
                freq,
                scale.x_for_frequency(freq as f64, sample_rate, window_size),
                priority,
            )
        })
}
