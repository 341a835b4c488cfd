// src/config.rs
use crate::error::{Error, Result};
use crate::recognition::{Recognizer, DEFAULT_THRESHOLD};
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const STORAGE_FILE_NAME: &str = "gestures.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Aggregate similarity a gesture must strictly exceed to match.
    pub recognition_threshold: f32,
    /// How often the host polls for a recognition, in milliseconds.
    pub recognition_interval_ms: u64,
    pub training: TrainingConfig,
    pub storage_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recognition_threshold: DEFAULT_THRESHOLD,
            recognition_interval_ms: 500,
            training: TrainingConfig::default(),
            storage_path: default_storage_path(),
        }
    }
}

/// Platform data directory, or the working directory if none is known.
pub fn default_storage_path() -> PathBuf {
    directories::ProjectDirs::from("com", "SignTracker", "SignTracker")
        .map(|dirs| dirs.data_dir().join(STORAGE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(STORAGE_FILE_NAME))
}

impl Settings {
    /// Reads settings from a JSON file; omitted fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("cannot read {}: {}", path.display(), e)))?;
        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.recognizer()?;
        self.training.validate()
    }

    pub fn recognizer(&self) -> Result<Recognizer> {
        Recognizer::new(self.recognition_threshold)
    }

    pub fn recognition_interval(&self) -> Duration {
        Duration::from_millis(self.recognition_interval_ms)
    }
}
