use crate::application::session::FetchScope;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub preferences: PreferenceSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub fetch_scope: FetchScope,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreferenceSettings {
    #[serde(default = "default_preferences_path")]
    pub path: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            fetch_scope: FetchScope::default(),
        }
    }
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        Self {
            path: default_preferences_path(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_preferences_path() -> PathBuf {
    PathBuf::from("config/preferences.toml")
}

pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from("config/slo")
}

/// File settings (optional) overlaid with `SLO_SECTION__KEY` environment variables
pub fn load_app_config_from(name: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(name).required(false))
        .add_source(config::Environment::with_prefix("SLO").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_app_config_from("does/not/exist/slo").unwrap();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.fetch_scope, FetchScope::All);
        assert_eq!(config.preferences.path, PathBuf::from("config/preferences.toml"));
    }

    #[test]
    fn test_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slo.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nbind = \"127.0.0.1:9000\"\n\n[api]\ntimeout_secs = 5\nfetch_scope = \"selected\""
        )
        .unwrap();

        let config = load_app_config_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.fetch_scope, FetchScope::Selected);
    }
}
