pub mod axis;
pub mod history;
pub mod spectrum;
pub mod transform;
pub mod window;

use std::fmt;

/// Result of feeding one chunk of audio into an analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// History was updated but the refresh threshold has not been reached yet.
    Throttled,
    /// A new power spectrum was computed and is ready to be read.
    Updated,
}

impl RunOutcome {
    pub fn is_updated(self) -> bool {
        matches!(self, RunOutcome::Updated)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    /// More samples were handed to a single `run` call than the window holds.
    CapacityExceeded { requested: usize, capacity: usize },
    InvalidWindowSize(usize),
    InvalidSampleRate(f64),
    InvalidRefreshRate(f64),
    /// The transform plan could not be built.
    ConstructionFailure(String),
    /// The transform rejected its buffers while executing.
    Transform(String),
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerError::CapacityExceeded {
                requested,
                capacity,
            } => write!(
                f,
                "chunk of {requested} samples exceeds analysis window of {capacity}"
            ),
            AnalyzerError::InvalidWindowSize(size) => {
                write!(f, "window size {size} is too small (need at least 2)")
            }
            AnalyzerError::InvalidSampleRate(rate) => write!(f, "invalid sample rate {rate}"),
            AnalyzerError::InvalidRefreshRate(fps) => write!(f, "invalid refresh rate {fps}"),
            AnalyzerError::ConstructionFailure(reason) => {
                write!(f, "failed to plan transform: {reason}")
            }
            AnalyzerError::Transform(reason) => write!(f, "transform failed: {reason}"),
        }
    }
}

impl std::error::Error for AnalyzerError {}
