// src/reporter/config.rs
use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::metrics::{SysinfoProbe, SystemProbe};
use super::transport::{HttpTransport, ReportTransport};
use super::Reporter;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Bytes left unescaped in report path segments: alphanumerics and `-_.~`.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug)]
pub enum ConfigError {
    MissingProbeId,
    MissingNodeId,
    MissingReplicaId,
    InvalidInterval,
    HttpClient(reqwest::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingProbeId => write!(f, "missing probeID"),
            Self::MissingNodeId => write!(f, "missing nodeID"),
            Self::MissingReplicaId => write!(f, "missing replicaID"),
            Self::InvalidInterval => write!(f, "reporting interval must be greater than zero"),
            Self::HttpClient(e) => write!(f, "Failed to build HTTP client: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::HttpClient(e) => Some(e),
            _ => None,
        }
    }
}

/// Immutable reporter configuration, validated by [`ReporterBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    report_url: String,
    token: String,
    replica_id: String,
    interval: Duration,
}

impl ReporterConfig {
    /// `{url}/reporter/{probe_id}/{node_id}/` with both IDs escaped.
    pub fn report_url(&self) -> &str {
        &self.report_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn replica_id(&self) -> &str {
        &self.replica_id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Chainable builder for a [`Reporter`].
///
/// Setters store values as given; validation happens in [`ReporterBuilder::build`].
pub struct ReporterBuilder {
    url: String,
    token: String,
    probe_id: Option<String>,
    node_id: Option<String>,
    replica_id: Option<String>,
    interval: Option<Duration>,
    transport: Option<Arc<dyn ReportTransport>>,
    probe: Option<Arc<dyn SystemProbe>>,
}

impl ReporterBuilder {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            probe_id: None,
            node_id: None,
            replica_id: None,
            interval: None,
            transport: None,
            probe: None,
        }
    }

    pub fn probe_id(mut self, probe_id: impl Into<String>) -> Self {
        self.probe_id = Some(probe_id.into());
        self
    }

    pub fn node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    pub fn replica_id(mut self, replica_id: impl Into<String>) -> Self {
        self.replica_id = Some(replica_id.into());
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Deliver reports through `transport` instead of the default reqwest client.
    pub fn transport(mut self, transport: Arc<dyn ReportTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sample load from `probe` instead of the default `sysinfo` probe.
    pub fn probe(mut self, probe: Arc<dyn SystemProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Validate the collected fields and derive the report URL.
    pub fn config(&self) -> Result<ReporterConfig, ConfigError> {
        let probe_id = required(&self.probe_id).ok_or(ConfigError::MissingProbeId)?;
        let node_id = required(&self.node_id).ok_or(ConfigError::MissingNodeId)?;
        let replica_id = required(&self.replica_id).ok_or(ConfigError::MissingReplicaId)?;

        let interval = self.interval.unwrap_or(DEFAULT_INTERVAL);
        if interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }

        let report_url = format!(
            "{}/reporter/{}/{}/",
            self.url,
            escape(probe_id),
            escape(node_id)
        );

        Ok(ReporterConfig {
            report_url,
            token: self.token.clone(),
            replica_id: replica_id.to_string(),
            interval,
        })
    }

    pub fn build(self) -> Result<Reporter, ConfigError> {
        let config = self.config()?;

        let transport: Arc<dyn ReportTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new().map_err(ConfigError::HttpClient)?),
        };
        let probe: Arc<dyn SystemProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(SysinfoProbe::new()),
        };

        Ok(Reporter::from_parts(config, transport, probe))
    }
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// Query-component escaping, e.g. `a b/c*` becomes `a+b%2Fc%2A`.
fn escape(value: &str) -> String {
    value
        .split(' ')
        .map(|part| utf8_percent_encode(part, QUERY_ESCAPE).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Reporter settings as read from a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReporterSettings {
    pub url: String,
    #[serde(default)]
    pub token: String,
    pub probe_id: Option<String>,
    pub node_id: Option<String>,
    pub replica_id: Option<String>,
    /// Interval in seconds.
    pub interval: Option<u64>,
}

impl ReporterSettings {
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let contents = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn into_builder(self) -> ReporterBuilder {
        let mut builder = ReporterBuilder::new(self.url, self.token);
        if let Some(probe_id) = self.probe_id {
            builder = builder.probe_id(probe_id);
        }
        if let Some(node_id) = self.node_id {
            builder = builder.node_id(node_id);
        }
        if let Some(replica_id) = self.replica_id {
            builder = builder.replica_id(replica_id);
        }
        if let Some(secs) = self.interval {
            builder = builder.interval(Duration::from_secs(secs));
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn complete() -> ReporterBuilder {
        ReporterBuilder::new("http://host:8080", "secret")
            .probe_id("relay")
            .node_id("socket-client")
            .replica_id("192.168.1.10")
    }

    #[test]
    fn test_report_url_and_defaults() {
        let config = complete().config().unwrap();

        assert_eq!(
            config.report_url(),
            "http://host:8080/reporter/relay/socket-client/"
        );
        assert_eq!(config.token(), "secret");
        assert_eq!(config.replica_id(), "192.168.1.10");
        assert_eq!(config.interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_report_url_escapes_ids() {
        let config = complete()
            .probe_id("web probe")
            .node_id("eu/west?1&x")
            .config()
            .unwrap();

        assert_eq!(
            config.report_url(),
            "http://host:8080/reporter/web+probe/eu%2Fwest%3F1%26x/"
        );
    }

    #[test]
    fn test_report_url_keeps_tilde_and_escapes_star() {
        let config = complete().probe_id("a~b").node_id("c*d").config().unwrap();
        assert_eq!(config.report_url(), "http://host:8080/reporter/a~b/c%2Ad/");

        let config = complete()
            .probe_id("50% off")
            .node_id("zürich-1")
            .config()
            .unwrap();
        assert_eq!(
            config.report_url(),
            "http://host:8080/reporter/50%25+off/z%C3%BCrich-1/"
        );
    }

    #[test]
    fn test_explicit_interval() {
        let config = complete().interval(Duration::from_secs(5)).config().unwrap();
        assert_eq!(config.interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let base = || ReporterBuilder::new("http://host:8080", "secret");

        assert!(matches!(
            base().node_id("n").replica_id("r").build(),
            Err(ConfigError::MissingProbeId)
        ));
        assert!(matches!(
            base().probe_id("p").replica_id("r").build(),
            Err(ConfigError::MissingNodeId)
        ));
        assert!(matches!(
            base().probe_id("p").node_id("n").build(),
            Err(ConfigError::MissingReplicaId)
        ));
    }

    #[test]
    fn test_empty_fields_rejected() {
        assert!(matches!(
            complete().probe_id("").build(),
            Err(ConfigError::MissingProbeId)
        ));
        assert!(matches!(
            complete().node_id("").build(),
            Err(ConfigError::MissingNodeId)
        ));
        assert!(matches!(
            complete().replica_id("").build(),
            Err(ConfigError::MissingReplicaId)
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = complete().interval(Duration::ZERO).build();
        assert!(matches!(result, Err(ConfigError::InvalidInterval)));
    }

    #[test]
    fn test_build_produces_reporter() {
        let reporter = complete().build().unwrap();
        assert_eq!(reporter.config(), &complete().config().unwrap());
    }

    #[test]
    fn test_settings_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"url": "http://host:8080", "token": "secret", "probe_id": "relay",
                "node_id": "socket-client", "replica_id": "192.168.1.10", "interval": 45}}"#
        )
        .unwrap();

        let settings = ReporterSettings::from_file(file.path()).unwrap();
        let config = settings.into_builder().config().unwrap();

        assert_eq!(
            config.report_url(),
            "http://host:8080/reporter/relay/socket-client/"
        );
        assert_eq!(config.interval(), Duration::from_secs(45));
    }

    #[test]
    fn test_settings_without_ids_fail_validation() {
        let settings: ReporterSettings =
            serde_json::from_str(r#"{"url": "http://host:8080"}"#).unwrap();

        assert!(matches!(
            settings.into_builder().config(),
            Err(ConfigError::MissingProbeId)
        ));
    }
}
