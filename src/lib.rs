// src/lib.rs
//! Background load reporter for Vigil monitoring endpoints.
//!
//! ```no_run
//! use std::time::Duration;
//! use vigil_reporter::Reporter;
//!
//! # async fn start() -> Result<(), vigil_reporter::reporter::ConfigError> {
//! let reporter = Reporter::builder("http://[::1]:8080", "REPLACE_THIS_WITH_A_SECRET_KEY")
//!     .probe_id("relay")
//!     .node_id("socket-client")
//!     .replica_id("192.168.1.10")
//!     .interval(Duration::from_secs(30))
//!     .build()?;
//!
//! let handle = reporter.run();
//! // ...
//! handle.shutdown().await.ok();
//! # Ok(())
//! # }
//! ```
pub mod reporter;

// Re-export the entry points at crate root
pub use crate::reporter::{Reporter, ReporterBuilder, ReporterHandle};
