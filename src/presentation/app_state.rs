// Application state for HTTP handlers
use crate::application::session::SloSession;
use crate::application::transport::SloTransport;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::instana_client::InstanaClient;
use crate::infrastructure::preference_store::{FilePreferenceStore, PreferenceError, Preferences};
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Builds the transport for the current credentials
pub type TransportFactory =
    Box<dyn Fn(&Preferences) -> anyhow::Result<Arc<dyn SloTransport>> + Send + Sync>;

/// Partial settings change; absent fields are left as they are
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub api_endpoint: Option<String>,
    pub api_token: Option<String>,
    pub yellow_threshold: Option<f64>,
    pub selected_slo_ids: Option<Vec<String>>,
}

/// Result of a settings change
pub struct AppliedSettings {
    pub session: Arc<SloSession>,
    /// True when the session was replaced and has not fetched anything yet
    pub rebuilt: bool,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Preferences(#[from] PreferenceError),

    #[error("failed to build API client: {0:#}")]
    Transport(anyhow::Error),
}

pub struct AppState {
    session: RwLock<Arc<SloSession>>,
    preferences: Arc<FilePreferenceStore>,
    config: AppConfig,
    transport_factory: TransportFactory,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        preferences: Arc<FilePreferenceStore>,
        transport_factory: TransportFactory,
    ) -> anyhow::Result<Self> {
        let session = build_session(&config, &preferences, &transport_factory)?;
        Ok(Self {
            session: RwLock::new(Arc::new(session)),
            preferences,
            config,
            transport_factory,
        })
    }

    /// Default factory: an `InstanaClient` with the configured timeout
    pub fn instana_transport(config: &AppConfig) -> TransportFactory {
        let timeout = Duration::from_secs(config.api.timeout_secs);
        Box::new(move |preferences: &Preferences| -> anyhow::Result<Arc<dyn SloTransport>> {
            let client = InstanaClient::new(&preferences.api_endpoint, &preferences.api_token, timeout)?;
            tracing::debug!(endpoint = client.endpoint(), "Built Instana client");
            Ok(Arc::new(client) as Arc<dyn SloTransport>)
        })
    }

    pub fn session(&self) -> Arc<SloSession> {
        self.session.read().clone()
    }

    pub fn preferences(&self) -> &FilePreferenceStore {
        &self.preferences
    }

    /// Persist `update`. Credential or threshold changes replace the session
    /// (the old one's in-flight completions go nowhere); a selection-only
    /// change is pushed into the live session.
    pub fn apply_settings(&self, update: SettingsUpdate) -> Result<AppliedSettings, SettingsError> {
        let before = self.preferences.preferences();
        let after = self.preferences.update(|p| {
            if let Some(endpoint) = &update.api_endpoint {
                p.api_endpoint = endpoint.trim().to_string();
            }
            if let Some(token) = &update.api_token {
                p.api_token = token.trim().to_string();
            }
            if let Some(threshold) = update.yellow_threshold {
                p.yellow_threshold = threshold;
            }
            if let Some(ids) = &update.selected_slo_ids {
                p.selected_slo_ids = ids.iter().cloned().collect();
            }
        })?;

        let needs_rebuild = before.api_endpoint != after.api_endpoint
            || before.api_token != after.api_token
            || before.yellow_threshold != after.yellow_threshold;

        if needs_rebuild {
            tracing::info!(
                endpoint = %after.api_endpoint,
                yellow_threshold = after.yellow_threshold,
                "Settings changed, rebuilding SLO session"
            );
            let session = build_session(&self.config, &self.preferences, &self.transport_factory)
                .map_err(SettingsError::Transport)?;
            let session = Arc::new(session);
            *self.session.write() = session.clone();
            return Ok(AppliedSettings { session, rebuilt: true });
        }

        let session = self.session();
        if before.selected_slo_ids != after.selected_slo_ids {
            tracing::info!(count = after.selected_slo_ids.len(), "Selection changed");
            session.set_selected_ids(after.selected_slo_ids.into_iter().collect());
        }
        Ok(AppliedSettings { session, rebuilt: false })
    }
}

fn build_session(
    config: &AppConfig,
    preferences: &FilePreferenceStore,
    transport_factory: &TransportFactory,
) -> anyhow::Result<SloSession> {
    let transport = transport_factory(&preferences.preferences())?;
    Ok(SloSession::new(transport, preferences, config.api.fetch_scope))
}
