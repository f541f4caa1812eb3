// Instana REST client implementation
use crate::application::transport::SloTransport;
use crate::domain::report::SloReport;
use crate::domain::slo::RawSlo;
use crate::error::TransportError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct InstanaClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SloListResponse {
    #[serde(default)]
    items: Option<Vec<RawSlo>>,
}

impl InstanaClient {
    pub fn new(endpoint: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn report_url(&self, slo_id: &str) -> String {
        self.build_url(&format!("/api/slo/report/{}", urlencoding::encode(slo_id)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        tracing::debug!(url, "Instana request");

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("apiToken {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SloTransport for InstanaClient {
    async fn list_slos(&self) -> Result<Vec<RawSlo>, TransportError> {
        let url = self.build_url("/api/settings/slo");
        let response: SloListResponse = self.get_json(&url).await?;
        Ok(response.items.unwrap_or_default())
    }

    async fn get_report(&self, slo_id: &str) -> Result<SloReport, TransportError> {
        self.get_json(&self.report_url(slo_id)).await
    }

    async fn get_version_info(&self) -> Result<serde_json::Value, TransportError> {
        let url = self.build_url("/api/instana/version");
        self.get_json(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(endpoint: &str) -> InstanaClient {
        InstanaClient::new(endpoint, "secret", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_urls() {
        let client = client("https://tenant.instana.io/");
        assert_eq!(client.endpoint(), "https://tenant.instana.io");
        assert_eq!(
            client.build_url("/api/settings/slo"),
            "https://tenant.instana.io/api/settings/slo"
        );
        assert_eq!(
            client.report_url("slo a/b"),
            "https://tenant.instana.io/api/slo/report/slo%20a%2Fb"
        );
    }

    #[tokio::test]
    async fn test_list_slos() {
        let router = Router::new().route(
            "/api/settings/slo",
            get(|headers: HeaderMap| async move {
                if headers.get("Authorization").and_then(|v| v.to_str().ok()) != Some("apiToken secret") {
                    return (StatusCode::UNAUTHORIZED, Json(json!({})));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "items": [
                            { "id": "a", "name": "Checkout", "entity": { "type": "application", "applicationId": "app-1" } },
                            { "id": "b" }
                        ]
                    })),
                )
            }),
        );
        let endpoint = serve(router).await;

        let slos = client(&endpoint).list_slos().await.unwrap();
        assert_eq!(slos.len(), 2);
        assert_eq!(slos[0].name.as_deref(), Some("Checkout"));
        assert!(slos[1].entity.is_none());

        let unauthorized = InstanaClient::new(&endpoint, "wrong", Duration::from_secs(5))
            .unwrap()
            .list_slos()
            .await;
        assert!(matches!(unauthorized, Err(TransportError::Status { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_list_without_items_is_empty() {
        let router = Router::new().route("/api/settings/slo", get(|| async { Json(json!({})) }));
        let endpoint = serve(router).await;

        assert!(client(&endpoint).list_slos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_report() {
        let router = Router::new().route(
            "/api/slo/report/:id",
            get(|Path(id): Path<String>| async move {
                if id != "slo a" {
                    return (StatusCode::NOT_FOUND, "no such slo".to_string());
                }
                (
                    StatusCode::OK,
                    json!({
                        "sli": 0.9991,
                        "slo": 0.999,
                        "errorBudgetRemaining": 30.0,
                        "totalErrorBudget": 100.0,
                        "errorBudgetRemainChart": { "0": 100.0, "1": 30.0 },
                        "fromTimestamp": 1000,
                        "toTimestamp": 2000
                    })
                    .to_string(),
                )
            }),
        );
        let endpoint = serve(router).await;
        let client = client(&endpoint);

        let report = client.get_report("slo a").await.unwrap();
        assert_eq!(report.sli, Some(0.9991));
        assert_eq!(report.chart_points().len(), 2);

        match client.get_report("other").await {
            Err(TransportError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such slo");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let router = Router::new().route("/api/instana/version", get(|| async { "not json" }));
        let endpoint = serve(router).await;

        assert!(matches!(
            client(&endpoint).get_version_info().await,
            Err(TransportError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client(&format!("http://{}", addr)).get_version_info().await;
        assert!(matches!(result, Err(TransportError::Network(_))));
    }
}
