// File-backed user preferences (TOML)
use crate::application::preferences::PreferenceStore;
use crate::domain::traffic_light::DEFAULT_YELLOW_THRESHOLD;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_API_ENDPOINT: &str = "https://instana.io";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to access preferences file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid preferences file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "default_endpoint")]
    pub api_endpoint: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_threshold")]
    pub yellow_threshold: f64,
    #[serde(default)]
    pub selected_slo_ids: BTreeSet<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            api_endpoint: default_endpoint(),
            api_token: String::new(),
            yellow_threshold: default_threshold(),
            selected_slo_ids: BTreeSet::new(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_threshold() -> f64 {
    DEFAULT_YELLOW_THRESHOLD
}

fn clamp_threshold(threshold: f64) -> f64 {
    if threshold.is_nan() {
        DEFAULT_YELLOW_THRESHOLD
    } else {
        threshold.clamp(0.0, 100.0)
    }
}

pub struct FilePreferenceStore {
    path: PathBuf,
    state: RwLock<Preferences>,
}

impl FilePreferenceStore {
    /// Load preferences from `path`; a missing file yields the defaults
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let mut preferences = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str::<Preferences>(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No preferences file, using defaults");
                Preferences::default()
            }
            Err(e) => return Err(e.into()),
        };
        preferences.yellow_threshold = clamp_threshold(preferences.yellow_threshold);

        Ok(Self {
            path,
            state: RwLock::new(preferences),
        })
    }

    pub fn preferences(&self) -> Preferences {
        self.state.read().clone()
    }

    pub fn has_selection(&self) -> bool {
        !self.state.read().selected_slo_ids.is_empty()
    }

    /// Apply `change` and persist immediately. The in-memory state is only
    /// replaced once the file write succeeded.
    pub fn update<F>(&self, change: F) -> Result<Preferences, PreferenceError>
    where
        F: FnOnce(&mut Preferences),
    {
        let mut state = self.state.write();
        let mut next = state.clone();
        change(&mut next);
        next.yellow_threshold = clamp_threshold(next.yellow_threshold);

        self.persist(&next)?;
        *state = next.clone();
        Ok(next)
    }

    fn persist(&self, preferences: &Preferences) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(preferences)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn selected_ids(&self) -> HashSet<String> {
        self.state.read().selected_slo_ids.iter().cloned().collect()
    }

    fn yellow_threshold(&self) -> f64 {
        self.state.read().yellow_threshold
    }

    fn is_configured(&self) -> bool {
        let state = self.state.read();
        !state.api_endpoint.trim().is_empty() && !state.api_token.trim().is_empty()
    }
}
