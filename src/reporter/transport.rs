// src/reporter/transport.rs
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::config::ReporterConfig;
use super::payload::ReportPayload;

pub const ACCEPT_CONTENT_TYPE: &str = "application/json";

/// Request timeout applied to every delivery attempt.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully formed report delivery: `POST` to `url` with basic auth and a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub url: String,
    pub username: String,
    pub password: String,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: Vec<u8>,
}

impl ReportRequest {
    pub fn json(config: &ReporterConfig, payload: &ReportPayload) -> Result<Self, serde_json::Error> {
        Ok(Self {
            url: config.report_url().to_string(),
            username: String::new(),
            password: config.token().to_string(),
            headers: vec![
                ("Accept", ACCEPT_CONTENT_TYPE),
                ("Content-Type", ACCEPT_CONTENT_TYPE),
            ],
            body: payload.to_json()?,
        })
    }
}

#[derive(Debug)]
pub enum TransportError {
    Request(reqwest::Error),
    /// Failure reported by a host-supplied transport.
    Other(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(e) => write!(f, "Report request failed: {}", e),
            Self::Other(msg) => write!(f, "Report transport error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(e) => Some(e),
            Self::Other(_) => None,
        }
    }
}

/// Sends report requests and hands back the response status code.
#[async_trait]
pub trait ReportTransport: Send + Sync {
    async fn send(&self, request: ReportRequest) -> Result<u16, TransportError>;
}

/// [`ReportTransport`] over a reqwest [`Client`], reused for every report.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(CLIENT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        debug!(target: "vigil_reporter", "HTTP client configured with {:?} timeout", timeout);

        Ok(Self { client })
    }
}

#[async_trait]
impl ReportTransport for HttpTransport {
    async fn send(&self, request: ReportRequest) -> Result<u16, TransportError> {
        debug!(target: "vigil_reporter", "Submitting report to URL: {}", request.url);

        let mut builder = self
            .client
            .post(&request.url)
            .basic_auth(&request.username, Some(&request.password));

        for (name, value) in &request.headers {
            builder = builder.header(*name, *value);
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(TransportError::Request)?;

        debug!(target: "vigil_reporter", "Received response status: {}", response.status());

        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::config::ReporterBuilder;
    use crate::reporter::metrics::LoadSample;
    use mockito::Matcher;

    fn request_for(url: &str) -> ReportRequest {
        let config = ReporterBuilder::new(url, "secret")
            .probe_id("relay")
            .node_id("socket-client")
            .replica_id("192.168.1.10")
            .config()
            .unwrap();
        let payload = ReportPayload::new(&config, LoadSample { cpu: 0.5, ram: 0.25 });
        ReportRequest::json(&config, &payload).unwrap()
    }

    #[test]
    fn test_request_contract() {
        let request = request_for("http://host:8080");

        assert_eq!(request.url, "http://host:8080/reporter/relay/socket-client/");
        assert_eq!(request.username, "");
        assert_eq!(request.password, "secret");
        assert!(request.headers.contains(&("Accept", "application/json")));
        assert!(request.headers.contains(&("Content-Type", "application/json")));
    }

    #[tokio::test]
    async fn test_http_transport_sends_contract() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/reporter/relay/socket-client/")
            .match_header("accept", "application/json")
            .match_header("content-type", "application/json")
            // base64(":secret")
            .match_header("authorization", "Basic OnNlY3JldA==")
            .match_body(Matcher::Json(serde_json::json!({
                "replica": "192.168.1.10",
                "interval": 30,
                "load": { "cpu": 0.5, "ram": 0.25 }
            })))
            .with_status(200)
            .create_async()
            .await;

        let transport = HttpTransport::new().unwrap();
        let status = transport.send(request_for(&server.url())).await.unwrap();

        assert_eq!(status, 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_transport_passes_error_status_through() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/reporter/relay/socket-client/")
            .with_status(503)
            .create_async()
            .await;

        let transport = HttpTransport::new().unwrap();
        let status = transport.send(request_for(&server.url())).await.unwrap();

        assert_eq!(status, 503);
    }

    #[tokio::test]
    async fn test_http_transport_connection_refused() {
        let transport = HttpTransport::with_timeout(Duration::from_secs(2)).unwrap();
        let result = transport.send(request_for("http://127.0.0.1:1")).await;

        assert!(matches!(result, Err(TransportError::Request(_))));
    }
}
