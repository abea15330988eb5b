use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use vigil_reporter::reporter::ReporterSettings;

/// Report this host's load to a Vigil server until interrupted.
#[derive(Debug, Parser)]
#[command(name = "vigil-reporter", version)]
struct Args {
    /// JSON file with reporter settings; flags override its values
    #[arg(long, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the Vigil server
    #[arg(long, env = "VIGIL_URL")]
    url: Option<String>,

    /// Reporter token, sent as the basic-auth password
    #[arg(long, env = "VIGIL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, env = "VIGIL_PROBE_ID")]
    probe_id: Option<String>,

    #[arg(long, env = "VIGIL_NODE_ID")]
    node_id: Option<String>,

    #[arg(long, env = "VIGIL_REPLICA_ID")]
    replica_id: Option<String>,

    /// Reporting interval in seconds
    #[arg(long, env = "VIGIL_INTERVAL")]
    interval: Option<u64>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    duration: Option<u64>,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn settings(self) -> Result<ReporterSettings, Box<dyn Error>> {
        let mut settings = match &self.config {
            Some(path) => ReporterSettings::from_file(path)?,
            None => ReporterSettings::default(),
        };

        if let Some(url) = self.url {
            settings.url = url;
        }
        if let Some(token) = self.token {
            settings.token = token;
        }
        settings.probe_id = self.probe_id.or(settings.probe_id);
        settings.node_id = self.node_id.or(settings.node_id);
        settings.replica_id = self.replica_id.or(settings.replica_id);
        settings.interval = self.interval.or(settings.interval);

        if settings.url.is_empty() {
            return Err("missing Vigil URL (--url or VIGIL_URL)".into());
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    // Setup logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let duration = args.duration.map(Duration::from_secs);
    let reporter = args.settings()?.into_builder().build()?;

    println!("🌟 Reporting to {}", reporter.config().report_url());
    let handle = reporter.run();

    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => tokio::signal::ctrl_c().await?,
    }

    handle.shutdown().await?;
    println!("✅ Reporter stopped");

    Ok(())
}
