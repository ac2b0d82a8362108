use crate::util::audio::{DEFAULT_TARGET_FPS, select_window_size};
use serde::{Deserialize, Serialize};

pub const MIN_TARGET_FPS: f64 = 1.0;
pub const MAX_TARGET_FPS: f64 = 60.0;

const DEFAULT_MIN_DB: f32 = -120.0;
const DEFAULT_MAX_DB: f32 = 0.0;
const DEFAULT_STEP_DB: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    /// Requested analysis window; `None` derives it from the sample rate.
    pub window_size: Option<usize>,
    pub target_fps: f64,
    pub min_db: f32,
    pub max_db: f32,
    pub step_db: f32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            window_size: None,
            target_fps: DEFAULT_TARGET_FPS,
            min_db: DEFAULT_MIN_DB,
            max_db: DEFAULT_MAX_DB,
            step_db: DEFAULT_STEP_DB,
        }
    }
}

impl AnalyzerSettings {
    pub fn sanitize(&mut self) {
        self.target_fps = if self.target_fps.is_finite() {
            self.target_fps.clamp(MIN_TARGET_FPS, MAX_TARGET_FPS)
        } else {
            DEFAULT_TARGET_FPS
        };

        if !(self.min_db.is_finite() && self.max_db.is_finite()) || self.max_db <= self.min_db {
            self.min_db = DEFAULT_MIN_DB;
            self.max_db = DEFAULT_MAX_DB;
        }
        if !self.step_db.is_finite() || self.step_db <= 0.0 {
            self.step_db = DEFAULT_STEP_DB;
        }
    }

    /// Window size the analyzer will actually run with at `sample_rate`.
    pub fn effective_window_size(&self, sample_rate: f64) -> usize {
        select_window_size(sample_rate, self.window_size)
    }
}
