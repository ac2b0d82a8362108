//! Normalized Hann analysis window.

/// Sum every window is rescaled to, independent of its length.
pub const WINDOW_SUM: f64 = 2.0;

/// Raised-cosine window whose coefficients sum to [`WINDOW_SUM`].
///
/// Keeping the sum fixed keeps power levels comparable between different
/// analysis sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisWindow {
    coefficients: Box<[f32]>,
}

impl AnalysisWindow {
    pub fn hann(len: usize) -> Self {
        debug_assert!(len >= 2, "window needs at least two coefficients");
        let raw: Vec<f64> = (0..len)
            .map(|n| {
                let phase = (n as f64) * core::f64::consts::TAU / (len as f64);
                0.5 - 0.5 * phase.cos()
            })
            .collect();

        let sum: f64 = raw.iter().sum();
        let scale = if sum > 0.0 { WINDOW_SUM / sum } else { 0.0 };

        Self {
            coefficients: raw.into_iter().map(|w| (w * scale) as f32).collect(),
        }
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    pub fn sum(&self) -> f64 {
        self.coefficients.iter().map(|&w| w as f64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_sum_to_two() {
        for len in [2, 3, 16, 1000, 1024, 4096, 16_384] {
            let window = AnalysisWindow::hann(len);
            assert_eq!(window.coefficients().len(), len);
            assert!(
                (window.sum() - WINDOW_SUM).abs() < 1e-4,
                "len {len}: sum {}",
                window.sum()
            );
        }
    }

    #[test]
    fn periodic_hann_is_symmetric() {
        for len in [8, 17, 1024] {
            let window = AnalysisWindow::hann(len);
            for i in 1..len {
                let w = window.coefficients();
                assert!((w[i] - w[len - i]).abs() < 1e-6, "len {len} i {i}");
            }
        }
    }

    #[test]
    fn starts_at_zero_and_peaks_in_the_middle() {
        let window = AnalysisWindow::hann(64);
        let w = window.coefficients();
        assert!(w[0].abs() < 1e-9);
        let peak = w
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx);
        assert_eq!(peak, Some(32));
        assert!(w.iter().all(|&c| c >= 0.0));
    }
}
