//! Real-input Fourier transform producing the packed half-complex layout.
//!
//! For a transform of size `n` the packed buffer holds
//! `r0, r1, ..., r(n/2), i((n+1)/2 - 1), ..., i1`: real parts ascending in the
//! front half, imaginary parts mirrored into the back half.

use super::AnalyzerError;
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex32;
use std::sync::Arc;

/// A planned, fixed-size real-to-half-complex transform.
pub trait Transform: Sized {
    fn plan(size: usize) -> Result<Self, AnalyzerError>;

    fn len(&self) -> usize;

    /// Transforms `input` into `output`. `input` may be clobbered.
    fn execute(&mut self, input: &mut [f32], output: &mut [f32]) -> Result<(), AnalyzerError>;
}

/// [`Transform`] backed by `realfft`.
#[derive(Clone)]
pub struct RealFftTransform {
    fft: Arc<dyn RealToComplex<f32>>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl std::fmt::Debug for RealFftTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealFftTransform")
            .field("size", &self.fft.len())
            .finish_non_exhaustive()
    }
}

impl Transform for RealFftTransform {
    fn plan(size: usize) -> Result<Self, AnalyzerError> {
        if size < 2 {
            return Err(AnalyzerError::ConstructionFailure(format!(
                "cannot plan a real transform of size {size}"
            )));
        }
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        Ok(Self {
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            fft,
        })
    }

    fn len(&self) -> usize {
        self.fft.len()
    }

    fn execute(&mut self, input: &mut [f32], output: &mut [f32]) -> Result<(), AnalyzerError> {
        let size = self.fft.len();
        if output.len() != size {
            return Err(AnalyzerError::Transform(format!(
                "output holds {} values, transform needs {size}",
                output.len()
            )));
        }

        self.fft
            .process_with_scratch(input, &mut self.spectrum, &mut self.scratch)
            .map_err(|err| AnalyzerError::Transform(err.to_string()))?;

        pack_half_complex(&self.spectrum, output);
        Ok(())
    }
}

/// Packs the `n/2 + 1` complex outputs of a real transform into `packed`
/// (length `n`) using the half-complex layout.
pub fn pack_half_complex(spectrum: &[Complex32], packed: &mut [f32]) {
    let size = packed.len();
    debug_assert_eq!(spectrum.len(), size / 2 + 1);

    packed[0] = spectrum[0].re;
    for k in 1..size.div_ceil(2) {
        packed[k] = spectrum[k].re;
        packed[size - k] = spectrum[k].im;
    }
    if size % 2 == 0 {
        packed[size / 2] = spectrum[size / 2].re;
    }
}

/// Reduces a half-complex buffer to per-bin power.
///
/// `power[0]` is the DC term alone; every later bin `i` is
/// `packed[i]^2 + packed[n - i]^2`. The Nyquist term (`packed[n/2]` for even
/// `n`) lies past the last stored bin and is not reported.
pub fn half_complex_power(packed: &[f32], power: &mut [f32]) {
    let size = packed.len();
    debug_assert!(power.len() <= size / 2);
    if power.is_empty() {
        return;
    }

    power[0] = packed[0] * packed[0];
    for (bin, slot) in power.iter_mut().enumerate().skip(1) {
        let re = packed[bin];
        let im = packed[size - bin];
        *slot = re * re + im * im;
    }
}
