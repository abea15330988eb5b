// src/reporter/mod.rs
mod config;
mod metrics;
mod payload;
mod transport;

pub use config::{
    ConfigError, ReporterBuilder, ReporterConfig, ReporterSettings, DEFAULT_INTERVAL,
};
pub use metrics::{
    load_cpu, load_ram, LoadSample, MemoryStats, MetricsError, SysinfoProbe, SystemProbe,
};
pub use payload::{PayloadLoad, ReportPayload};
pub use transport::{
    HttpTransport, ReportRequest, ReportTransport, TransportError, ACCEPT_CONTENT_TYPE,
    CLIENT_TIMEOUT,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Delay before the first report, so the host can finish starting up.
pub const INITIAL_DELAY: Duration = Duration::from_secs(10);

/// Periodically reports host load to a Vigil endpoint.
///
/// Cloning is cheap and shares the transport and metrics probe.
#[derive(Clone)]
pub struct Reporter {
    config: Arc<ReporterConfig>,
    transport: Arc<dyn ReportTransport>,
    probe: Arc<dyn SystemProbe>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reporter {
    pub fn builder(url: impl Into<String>, token: impl Into<String>) -> ReporterBuilder {
        ReporterBuilder::new(url, token)
    }

    pub(crate) fn from_parts(
        config: ReporterConfig,
        transport: Arc<dyn ReportTransport>,
        probe: Arc<dyn SystemProbe>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            probe,
        }
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Start reporting in the background and return immediately.
    ///
    /// Must be called from within a tokio runtime. Each call spawns another
    /// independent loop, so call it once per reporter.
    pub fn run(&self) -> ReporterHandle {
        let cancellation = CancellationToken::new();
        let task = self.run_until(cancellation.clone());

        ReporterHandle { cancellation, task }
    }

    /// Like [`Reporter::run`], stopping once `cancellation` fires.
    pub fn run_until(&self, cancellation: CancellationToken) -> JoinHandle<()> {
        let reporter = self.clone();
        tokio::spawn(async move { reporter.manage(cancellation).await })
    }

    async fn manage(self, cancellation: CancellationToken) {
        info!(
            target: "vigil_reporter",
            "Reporter started for {} every {:?}",
            self.config.report_url(),
            self.config.interval()
        );

        if pause(INITIAL_DELAY, &cancellation).await {
            loop {
                if !self.report().await {
                    // Retry once after half the interval; its outcome is not checked.
                    if !pause(self.config.interval() / 2, &cancellation).await {
                        break;
                    }
                    self.report().await;
                }

                if !pause(self.config.interval(), &cancellation).await {
                    break;
                }
            }
        }

        info!(target: "vigil_reporter", "Reporter stopped");
    }

    /// Sample load and deliver a single report. Returns `true` on HTTP 200.
    pub async fn report(&self) -> bool {
        let sample = LoadSample::collect(self.probe.as_ref());
        let payload = ReportPayload::new(&self.config, sample);

        let request = match ReportRequest::json(&self.config, &payload) {
            Ok(request) => request,
            Err(e) => {
                debug!(target: "vigil_reporter", "Failed to encode report: {}", e);
                return false;
            }
        };

        match self.transport.send(request).await {
            Ok(200) => {
                debug!(
                    target: "vigil_reporter",
                    "Report delivered (cpu={:.3}, ram={:.3})",
                    sample.cpu,
                    sample.ram
                );
                true
            }
            Ok(status) => {
                debug!(target: "vigil_reporter", "Report rejected with status {}", status);
                false
            }
            Err(e) => {
                debug!(target: "vigil_reporter", "Report not delivered: {}", e);
                false
            }
        }
    }
}

/// Sleep for `duration`; `false` if cancelled first.
async fn pause(duration: Duration, cancellation: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Handle to a running reporter loop.
///
/// Dropping the handle leaves the loop running.
#[derive(Debug)]
pub struct ReporterHandle {
    cancellation: CancellationToken,
    task: JoinHandle<()>,
}

impl ReporterHandle {
    /// Ask the loop to stop at its next suspension point.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit without cancelling it.
    pub async fn stopped(self) -> Result<(), JoinError> {
        self.task.await
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.cancel();
        self.stopped().await
    }
}
