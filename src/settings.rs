// Analyzer settings and their persistence.

mod data;
mod persistence;

pub use data::AnalyzerSettings;
pub use persistence::{SettingsManager, default_settings_path};
