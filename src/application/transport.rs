// Transport trait for SLO data access
use crate::domain::report::SloReport;
use crate::domain::slo::RawSlo;
use crate::error::TransportError;
use async_trait::async_trait;

#[async_trait]
pub trait SloTransport: Send + Sync {
    /// List all configured SLOs (without reports)
    async fn list_slos(&self) -> Result<Vec<RawSlo>, TransportError>;

    /// Fetch the current report for a single SLO
    async fn get_report(&self, slo_id: &str) -> Result<SloReport, TransportError>;

    /// Backend version info, used to validate credentials
    async fn get_version_info(&self) -> Result<serde_json::Value, TransportError>;
}
