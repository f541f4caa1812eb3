// Stub collaborators shared by application layer tests
use crate::application::preferences::PreferenceStore;
use crate::application::transport::SloTransport;
use crate::domain::entity::SloEntity;
use crate::domain::report::SloReport;
use crate::domain::slo::RawSlo;
use crate::error::TransportError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

pub struct StubTransport {
    pub slos: Mutex<Result<Vec<RawSlo>, TransportError>>,
    pub reports: Mutex<HashMap<String, Result<SloReport, TransportError>>>,
    /// Report fetches for these ids wait until the gate is opened
    pub gates: Mutex<HashMap<String, Arc<Notify>>>,
    pub report_calls: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            slos: Mutex::new(Ok(Vec::new())),
            reports: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            report_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_slo(self, id: &str, entity: Option<SloEntity>) -> Self {
        if let Ok(slos) = &mut *self.slos.lock() {
            slos.push(RawSlo {
                id: id.to_string(),
                name: Some(format!("SLO {}", id)),
                entity,
            });
        }
        self
    }

    pub fn with_report(self, id: &str, report: SloReport) -> Self {
        self.reports.lock().insert(id.to_string(), Ok(report));
        self
    }

    pub fn with_report_error(self, id: &str, error: TransportError) -> Self {
        self.reports.lock().insert(id.to_string(), Err(error));
        self
    }

    pub fn with_list_error(self, error: TransportError) -> Self {
        *self.slos.lock() = Err(error);
        self
    }

    pub fn gate(&self, id: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().insert(id.to_string(), notify.clone());
        notify
    }

    pub fn report_calls(&self) -> usize {
        self.report_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SloTransport for StubTransport {
    async fn list_slos(&self) -> Result<Vec<RawSlo>, TransportError> {
        self.slos.lock().clone()
    }

    async fn get_report(&self, slo_id: &str) -> Result<SloReport, TransportError> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().get(slo_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.reports
            .lock()
            .get(slo_id)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Status { status: 404, body: String::new() }))
    }

    async fn get_version_info(&self) -> Result<serde_json::Value, TransportError> {
        Ok(serde_json::json!({ "imageTag": "1.0.0" }))
    }
}

pub struct StaticPreferences {
    pub selected: HashSet<String>,
    pub threshold: f64,
    pub configured: bool,
}

impl StaticPreferences {
    pub fn selecting(ids: &[&str]) -> Self {
        Self {
            selected: ids.iter().map(|id| id.to_string()).collect(),
            threshold: 50.0,
            configured: true,
        }
    }
}

impl PreferenceStore for StaticPreferences {
    fn selected_ids(&self) -> HashSet<String> {
        self.selected.clone()
    }

    fn yellow_threshold(&self) -> f64 {
        self.threshold
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}
