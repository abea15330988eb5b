// src/reporter/payload.rs
use serde::Serialize;

use super::config::ReporterConfig;
use super::metrics::LoadSample;

/// Body of one report, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    pub replica: String,
    /// Reporting interval in whole seconds.
    pub interval: u64,
    pub load: PayloadLoad,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PayloadLoad {
    pub cpu: f32,
    pub ram: f32,
}

impl ReportPayload {
    pub fn new(config: &ReporterConfig, sample: LoadSample) -> Self {
        Self {
            replica: config.replica_id().to_string(),
            interval: config.interval().as_secs(),
            load: PayloadLoad {
                cpu: sample.cpu,
                ram: sample.ram,
            },
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
