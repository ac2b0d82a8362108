use super::data::AnalyzerSettings;
use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use tracing::{debug, warn};

fn config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spectra")
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

#[derive(Debug)]
pub struct SettingsManager {
    path: PathBuf,
    pub data: AnalyzerSettings,
}

impl SettingsManager {
    /// Loads settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: PathBuf) -> Self {
        let mut data: AnalyzerSettings = match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s)
                .map_err(|e| warn!("[settings] parse error {path:?}: {e}"))
                .unwrap_or_default(),
            Err(e) => {
                debug!("[settings] no settings at {path:?}: {e}");
                AnalyzerSettings::default()
            }
        };
        data.sanitize();
        Self { path, data }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.data
    }

    pub fn update<F: FnOnce(&mut AnalyzerSettings) -> R, R>(&mut self, mutate: F) -> R {
        let result = mutate(&mut self.data);
        self.data.sanitize();
        result
    }

    /// Writes the settings as pretty JSON, replacing the file atomically.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.data).context("serialising settings")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating settings directory {parent:?}"))?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &json).with_context(|| format!("writing {temp_path:?}"))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("replacing {:?}", self.path))?;
        Ok(())
    }
}
