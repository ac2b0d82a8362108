//! Streaming power-spectrum analyzer.
//!
//! Audio arrives in chunks of any size up to the window length. Every chunk
//! extends the sample history; a new spectrum is only computed once enough
//! samples have accumulated to honour the target refresh rate.

use super::axis::{self, ScaleParameters};
use super::history::HistoryBuffer;
use super::transform::{RealFftTransform, Transform, half_complex_power};
use super::window::AnalysisWindow;
use super::{AnalyzerError, RunOutcome};
use crate::util::audio::apply_window;

/// Counts samples since the last published spectrum.
///
/// The counter resets to zero on every update; samples beyond the threshold
/// do not carry into the next cycle.
#[derive(Debug, Clone, Copy)]
pub struct RefreshThrottle {
    threshold: f64,
    pending: u64,
}

impl RefreshThrottle {
    pub fn new(sample_rate: f64, target_fps: f64) -> Self {
        Self {
            threshold: sample_rate / target_fps,
            pending: 0,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Records `samples` and reports whether a refresh is due.
    pub fn advance(&mut self, samples: usize) -> bool {
        self.pending = self.pending.saturating_add(samples as u64);
        if (self.pending as f64) < self.threshold {
            return false;
        }
        self.pending = 0;
        true
    }
}

/// Fixed-size windowed spectrum analyzer fed from a single audio context.
///
/// All buffers are sized at construction; [`SpectrumAnalyzer::run`] never
/// allocates. Changing the window size or sample rate means building a new
/// analyzer.
#[derive(Debug)]
pub struct SpectrumAnalyzer<T: Transform = RealFftTransform> {
    window_size: usize,
    sample_rate: f64,
    scale: ScaleParameters,
    window: AnalysisWindow,
    history: HistoryBuffer,
    throttle: RefreshThrottle,
    transform: T,
    fft_in: Vec<f32>,
    fft_out: Vec<f32>,
    power: Vec<f32>,
}

impl SpectrumAnalyzer<RealFftTransform> {
    pub fn new(
        window_size: usize,
        sample_rate: f64,
        target_fps: f64,
    ) -> Result<Self, AnalyzerError> {
        Self::with_transform(window_size, sample_rate, target_fps)
    }
}

impl<T: Transform> SpectrumAnalyzer<T> {
    /// Builds an analyzer using `T` as the transform implementation.
    pub fn with_transform(
        window_size: usize,
        sample_rate: f64,
        target_fps: f64,
    ) -> Result<Self, AnalyzerError> {
        if window_size < 2 {
            return Err(AnalyzerError::InvalidWindowSize(window_size));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(AnalyzerError::InvalidSampleRate(sample_rate));
        }
        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(AnalyzerError::InvalidRefreshRate(target_fps));
        }

        let transform = T::plan(window_size)?;
        if transform.len() != window_size {
            return Err(AnalyzerError::ConstructionFailure(format!(
                "planned {} points, requested {window_size}",
                transform.len()
            )));
        }

        Ok(Self {
            window_size,
            sample_rate,
            scale: ScaleParameters::new(sample_rate),
            window: AnalysisWindow::hann(window_size),
            history: HistoryBuffer::new(window_size),
            throttle: RefreshThrottle::new(sample_rate, target_fps),
            transform,
            fft_in: vec![0.0; window_size],
            fft_out: vec![0.0; window_size],
            power: vec![0.0; window_size / 2],
        })
    }

    /// Feeds one chunk of mono samples.
    ///
    /// Returns [`RunOutcome::Updated`] when [`Self::power`] holds a fresh
    /// spectrum, [`RunOutcome::Throttled`] otherwise.
    pub fn run(&mut self, samples: &[f32]) -> Result<RunOutcome, AnalyzerError> {
        if samples.len() > self.window_size {
            return Err(AnalyzerError::CapacityExceeded {
                requested: samples.len(),
                capacity: self.window_size,
            });
        }

        self.history.ingest(samples);
        if !self.throttle.advance(samples.len()) {
            return Ok(RunOutcome::Throttled);
        }

        self.analyze()?;
        Ok(RunOutcome::Updated)
    }

    fn analyze(&mut self) -> Result<(), AnalyzerError> {
        self.history.linearize(&mut self.fft_in);
        apply_window(&mut self.fft_in, self.window.coefficients());
        self.transform.execute(&mut self.fft_in, &mut self.fft_out)?;
        half_complex_power(&self.fft_out, &mut self.power);
        Ok(())
    }

    /// Latest power spectrum, `window_size / 2` bins starting at DC.
    pub fn power(&self) -> &[f32] {
        &self.power
    }

    pub fn bin_count(&self) -> usize {
        self.power.len()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Samples required between two spectrum updates.
    pub fn threshold(&self) -> f64 {
        self.throttle.threshold()
    }

    /// Samples counted towards the next update.
    pub fn pending_samples(&self) -> u64 {
        self.throttle.pending()
    }

    pub fn scale(&self) -> ScaleParameters {
        self.scale
    }

    /// Normalized vertical position of `bin` between `min_db` and `max_db`.
    pub fn y_power(&self, bin: usize, min_db: f32, max_db: f32) -> f32 {
        axis::y_position(self.power[bin], min_db, max_db)
    }

    /// Normalized horizontal position of (fractional) bin `v`.
    pub fn x_deflect(&self, v: f32) -> f32 {
        self.scale.x_deflect(v, self.bin_count())
    }

    /// Index of the loudest bin in the current spectrum.
    pub fn peak_bin(&self) -> Option<usize> {
        self.power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
    }
}
