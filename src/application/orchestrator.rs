// Report fetch orchestration - One independent fetch per SLO
use crate::application::transport::SloTransport;
use crate::domain::report::SloReport;
use crate::domain::slo::Slo;
use crate::error::TransportError;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A record mutated in place by its own fetch task
pub type SloHandle = Arc<RwLock<Slo>>;

/// Emitted exactly once per record when its report fetch terminates
#[derive(Debug, Clone)]
pub struct LoadCompletion {
    /// Fetch cycle that issued the request
    pub epoch: u64,
    pub slo: Slo,
    pub success: bool,
}

#[derive(Clone)]
pub struct ReportFetchOrchestrator {
    transport: Arc<dyn SloTransport>,
    yellow_threshold: f64,
}

impl ReportFetchOrchestrator {
    pub fn new(transport: Arc<dyn SloTransport>, yellow_threshold: f64) -> Self {
        Self {
            transport,
            yellow_threshold,
        }
    }

    pub fn yellow_threshold(&self) -> f64 {
        self.yellow_threshold
    }

    /// Fetch the SLO list; every record starts out `NotLoaded`
    pub async fn fetch_list(&self) -> Result<Vec<Slo>, TransportError> {
        let raw = self.transport.list_slos().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to fetch SLO list");
        })?;

        let slos: Vec<Slo> = raw.into_iter().map(Slo::from).collect();
        tracing::info!(count = slos.len(), "Fetched SLO list");
        for slo in &slos {
            tracing::debug!(
                slo_id = slo.id(),
                name = slo.name(),
                entity_type = %slo.entity_type(),
                "SLO in list"
            );
        }

        Ok(slos)
    }

    /// Spawn one fetch task per record and return the completion stream.
    ///
    /// Tasks never wait on each other: a slow or failing report only affects
    /// its own record. Completions arrive in whatever order the fetches
    /// finish, one per record. Records that are not `NotLoaded` are skipped,
    /// so a record is never fetched twice. The stream closes once every task
    /// is done.
    pub fn fetch_reports_independently(
        &self,
        records: &[SloHandle],
        epoch: u64,
    ) -> mpsc::Receiver<LoadCompletion> {
        // one slot per record so no task ever blocks on send
        let (tx, rx) = mpsc::channel(records.len().max(1));

        for record in records {
            let slo_id = {
                let mut slo = record.write();
                if !slo.begin_loading() {
                    tracing::debug!(slo_id = slo.id(), state = ?slo.loading_state(), "SLO already claimed");
                    continue;
                }
                slo.id().to_string()
            };

            let tx = tx.clone();
            let transport = self.transport.clone();
            let record = record.clone();
            let yellow_threshold = self.yellow_threshold;

            tokio::spawn(async move {
                let result = transport.get_report(&slo_id).await;

                let completion = {
                    let mut slo = record.write();
                    let outcome = match result {
                        Ok(report) => {
                            let status = report.classify(yellow_threshold);
                            tracing::debug!(
                                slo_id = %slo_id,
                                status = status.map(|s| s.as_str()).unwrap_or("UNKNOWN"),
                                "SLO report loaded"
                            );
                            slo.complete_loaded(report, status)
                        }
                        Err(e) => {
                            tracing::warn!(slo_id = %slo_id, error = %e, "Failed to fetch SLO report");
                            slo.complete_failed()
                        }
                    };
                    outcome.map(|outcome| LoadCompletion {
                        epoch,
                        slo: slo.clone(),
                        success: outcome.is_success(),
                    })
                };

                if let Some(completion) = completion {
                    // receiver gone means the cycle was superseded
                    let _ = tx.send(completion).await;
                }
            });
        }

        rx
    }

    /// Fetch a single report for the detail view
    pub async fn fetch_report(&self, slo_id: &str) -> Result<SloReport, TransportError> {
        self.transport.get_report(slo_id).await.inspect_err(|e| {
            tracing::error!(slo_id, error = %e, "Failed to fetch SLO report");
        })
    }

    pub async fn fetch_version_info(&self) -> Result<serde_json::Value, TransportError> {
        self.transport.get_version_info().await
    }
}

pub fn into_handles(slos: Vec<Slo>) -> Vec<SloHandle> {
    slos.into_iter().map(|slo| Arc::new(RwLock::new(slo))).collect()
}
