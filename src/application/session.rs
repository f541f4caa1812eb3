// SLO session - Owns one orchestrator, one filter engine, and the current fetch cycle
use crate::application::filter_engine::{FilterEngine, FilterState, VisibleSnapshot};
use crate::application::orchestrator::{
    into_handles, LoadCompletion, ReportFetchOrchestrator, SloHandle,
};
use crate::application::preferences::PreferenceStore;
use crate::application::transport::SloTransport;
use crate::domain::entity::EntityType;
use crate::domain::report::SloReport;
use crate::domain::slo::Slo;
use crate::domain::traffic_light::TrafficLightStatus;
use crate::error::{SloError, SloResult};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};

/// Which records get their report fetched after a list refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchScope {
    #[default]
    All,
    /// Only selected records; others stay `NotLoaded` until selected
    Selected,
}

/// State of the most recent list fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum ListStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_entity_type: BTreeMap<&'static str, usize>,
    pub total: usize,
}

/// Explicitly owned replacement for a process-wide repository: build a new
/// session whenever credentials or the threshold change.
pub struct SloSession {
    orchestrator: ReportFetchOrchestrator,
    engine: Arc<Mutex<FilterEngine>>,
    epoch: AtomicU64,
    list_status: RwLock<ListStatus>,
    fetch_scope: FetchScope,
    configured: bool,
}

impl SloSession {
    pub fn new(
        transport: Arc<dyn SloTransport>,
        preferences: &dyn PreferenceStore,
        fetch_scope: FetchScope,
    ) -> Self {
        let orchestrator = ReportFetchOrchestrator::new(transport, preferences.yellow_threshold());
        Self {
            orchestrator,
            engine: Arc::new(Mutex::new(FilterEngine::new(preferences.selected_ids()))),
            epoch: AtomicU64::new(0),
            list_status: RwLock::new(ListStatus::Idle),
            fetch_scope,
            configured: preferences.is_configured(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn yellow_threshold(&self) -> f64 {
        self.orchestrator.yellow_threshold()
    }

    pub fn list_status(&self) -> ListStatus {
        self.list_status.read().clone()
    }

    pub fn snapshot(&self) -> Arc<VisibleSnapshot> {
        self.engine.lock().snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<VisibleSnapshot>> {
        self.engine.lock().subscribe()
    }

    pub fn filters(&self) -> FilterState {
        self.engine.lock().filters().clone()
    }

    /// Start a new fetch cycle: fetch the list, install it, then fan out
    /// report fetches. Returns the first snapshot of the new cycle; later
    /// snapshots arrive through `subscribe` as reports complete.
    pub async fn refresh(&self) -> SloResult<Arc<VisibleSnapshot>> {
        if !self.configured {
            return Err(SloError::Configuration(
                "API endpoint and token are required".to_string(),
            ));
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *self.list_status.write() = ListStatus::Loading;
        tracing::info!(epoch, "Refreshing SLO list");

        let slos = match self.orchestrator.fetch_list().await {
            Ok(slos) => slos,
            Err(e) => {
                if self.is_current(epoch) {
                    *self.list_status.write() = ListStatus::Error(e.to_string());
                }
                return Err(e.into());
            }
        };

        let handles = into_handles(slos);
        let mut engine = self.engine.lock();
        if !self.is_current(epoch) {
            tracing::debug!(epoch, "List fetch superseded by a newer refresh");
            return Ok(engine.snapshot());
        }
        let snapshot = engine.replace_records(handles.clone(), epoch);
        *self.list_status.write() = ListStatus::Loaded;

        let to_fetch = match self.fetch_scope {
            FetchScope::All => handles,
            FetchScope::Selected => engine.pending_selected(),
        };
        self.fetch_reports(&to_fetch, epoch);
        Ok(snapshot)
    }

    /// Fetch the SLO list without touching the current cycle, for picking a selection
    pub async fn fetch_catalog(&self) -> SloResult<Vec<Slo>> {
        if !self.configured {
            return Err(SloError::Configuration(
                "API endpoint and token are required".to_string(),
            ));
        }
        Ok(self.orchestrator.fetch_list().await?)
    }

    pub async fn fetch_report(&self, slo_id: &str) -> SloResult<SloReport> {
        Ok(self.orchestrator.fetch_report(slo_id).await?)
    }

    pub async fn version_info(&self) -> SloResult<serde_json::Value> {
        Ok(self.orchestrator.fetch_version_info().await?)
    }

    pub fn set_filters(
        &self,
        status: Option<TrafficLightStatus>,
        entity_type: Option<String>,
    ) -> Arc<VisibleSnapshot> {
        let mut engine = self.engine.lock();
        engine.set_status_filter(status);
        engine.set_entity_type_filter(entity_type)
    }

    pub fn clear_filters(&self) -> Arc<VisibleSnapshot> {
        self.engine.lock().clear_filters()
    }

    /// Apply a new selection; with `FetchScope::Selected` newly selected
    /// records that were never fetched are loaded now.
    pub fn set_selected_ids(&self, selected_ids: HashSet<String>) -> Arc<VisibleSnapshot> {
        let mut engine = self.engine.lock();
        let snapshot = engine.set_selected_ids(selected_ids);
        if self.fetch_scope == FetchScope::Selected {
            // claimed under the engine lock so concurrent updates cannot both take a record
            let pending = engine.pending_selected();
            if !pending.is_empty() {
                self.fetch_reports(&pending, engine.epoch());
            }
        }
        snapshot
    }

    /// Every record of the current cycle, ignoring filters
    pub fn all_records(&self) -> Vec<Slo> {
        self.engine.lock().all_records()
    }

    pub fn counts(&self) -> StatusCounts {
        let engine = self.engine.lock();
        let by_status = TrafficLightStatus::ALL
            .into_iter()
            .map(|status| (status.as_str(), engine.count_by_status(status)))
            .collect();
        let by_entity_type = EntityType::KNOWN
            .into_iter()
            .map(|t| (t.as_str(), engine.count_by_entity_type(t.as_str())))
            .collect();
        StatusCounts {
            by_status,
            by_entity_type,
            total: engine.all_records().len(),
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Claims and spawns synchronously; callers hold the engine lock
    fn fetch_reports(&self, records: &[SloHandle], epoch: u64) {
        tracing::debug!(epoch, count = records.len(), "Fetching SLO reports");
        let rx = self.orchestrator.fetch_reports_independently(records, epoch);
        spawn_completion_pump(self.engine.clone(), rx);
    }
}

/// Feed completions into the engine, one recompute per completed record
fn spawn_completion_pump(engine: Arc<Mutex<FilterEngine>>, mut rx: mpsc::Receiver<LoadCompletion>) {
    tokio::spawn(async move {
        while let Some(completion) = rx.recv().await {
            let snapshot = engine.lock().on_record_changed(&completion);
            if let Some(snapshot) = snapshot {
                tracing::debug!(
                    slo_id = completion.slo.id(),
                    success = completion.success,
                    visible = snapshot.slos.len(),
                    is_loading = snapshot.is_loading,
                    "Recomputed visible SLOs"
                );
            }
        }
    });
}
