//! Presentation-side state built from published spectrum frames.
//!
//! Turns `(bin, power)` pairs into normalized display coordinates. Drawing is
//! left to whatever consumes [`SpectrumView`].

use crate::audio::spectrum_tap::SpectrumFrame;
use crate::dsp::axis::{self, DisplayScale};
use crate::settings::AnalyzerSettings;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub min_db: f32,
    pub max_db: f32,
    pub step_db: f32,
}

impl From<&AnalyzerSettings> for DisplayRange {
    fn from(settings: &AnalyzerSettings) -> Self {
        Self {
            min_db: settings.min_db,
            max_db: settings.max_db,
            step_db: settings.step_db,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeakLabel {
    pub text: String,
    pub frequency: f64,
    pub db: f32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScaleKey {
    sample_rate: f64,
    window_size: usize,
}

#[derive(Debug, Clone)]
pub struct SpectrumView {
    range: DisplayRange,
    scale: Option<(ScaleKey, DisplayScale)>,
    points: Arc<[[f32; 2]]>,
    peak: Option<PeakLabel>,
    db_grid: Arc<[(f32, f32)]>,
    frequency_grid: Arc<[(f32, String, u8)]>,
    last_sequence: u64,
}

impl SpectrumView {
    pub fn new(range: DisplayRange) -> Self {
        Self {
            db_grid: axis::db_grid(range.min_db, range.max_db, range.step_db).collect(),
            range,
            scale: None,
            points: Arc::from([]),
            peak: None,
            frequency_grid: Arc::from([]),
            last_sequence: 0,
        }
    }

    /// Rebuilds curve points, peak label and grids from `frame`.
    ///
    /// Bins with no energy sit at `y = 0` rather than `-inf`.
    pub fn apply_frame(&mut self, frame: &SpectrumFrame) {
        if frame.power.is_empty() {
            self.points = Arc::from([]);
            self.peak = None;
            return;
        }
        let scale = self.ensure_scale(frame);
        let DisplayRange { min_db, max_db, .. } = self.range;

        let points: Vec<[f32; 2]> = frame
            .power
            .iter()
            .enumerate()
            .map(|(bin, &power)| {
                let y = axis::y_position(power, min_db, max_db);
                [
                    scale.x_for_bin(bin as f32),
                    if y.is_finite() { y.clamp(0.0, 1.0) } else { 0.0 },
                ]
            })
            .collect();
        self.points = Arc::from(points);

        self.peak = frame
            .power
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .filter(|(_, power)| **power > 0.0)
            .map(|(bin, &power)| {
                let frequency = axis::bin_frequency(bin, frame.sample_rate, frame.window_size);
                let db = axis::power_to_db(power);
                PeakLabel {
                    text: format!("{} | {db:.1} dB", fmt_freq(frequency as f32)),
                    frequency,
                    db,
                    x: scale.x_for_bin(bin as f32),
                    y: axis::y_position(power, min_db, max_db).clamp(0.0, 1.0),
                }
            });
        self.last_sequence = frame.sequence;
    }

    fn ensure_scale(&mut self, frame: &SpectrumFrame) -> DisplayScale {
        let key = ScaleKey {
            sample_rate: frame.sample_rate,
            window_size: frame.window_size,
        };
        match self.scale {
            Some((current, scale)) if current == key => scale,
            _ => {
                let scale = DisplayScale::new(frame.sample_rate, frame.bin_count());
                self.frequency_grid =
                    axis::frequency_grid(scale, frame.sample_rate, frame.window_size)
                        .map(|(freq, x, priority)| (x, fmt_freq(freq), priority))
                        .collect();
                self.scale = Some((key, scale));
                scale
            }
        }
    }

    pub fn points(&self) -> Arc<[[f32; 2]]> {
        Arc::clone(&self.points)
    }

    pub fn peak(&self) -> Option<&PeakLabel> {
        self.peak.as_ref()
    }

    pub fn db_grid(&self) -> Arc<[(f32, f32)]> {
        Arc::clone(&self.db_grid)
    }

    pub fn frequency_grid(&self) -> Arc<[(f32, String, u8)]> {
        Arc::clone(&self.frequency_grid)
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}

fn fmt_freq(freq: f32) -> String {
    if freq >= 1_000.0 {
        let khz = freq / 1_000.0;
        if (khz - khz.round()).abs() < 0.05 {
            format!("{:.0} kHz", khz)
        } else {
            format!("{:.1} kHz", khz)
        }
    } else if (freq - freq.round()).abs() < 0.05 {
        format!("{:.0} Hz", freq)
    } else {
        format!("{:.1} Hz", freq)
    }
}
