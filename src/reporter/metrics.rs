// src/reporter/metrics.rs
use std::sync::Mutex;
use sysinfo::System;
use tracing::debug;

/// Memory counters in bytes, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub total: u64,
    pub available: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    Unsupported,
    Unavailable(String),
}

impl std::fmt::Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "System metrics are not supported on this platform"),
            Self::Unavailable(what) => write!(f, "System metric unavailable: {}", what),
        }
    }
}

impl std::error::Error for MetricsError {}

/// Source of raw host load figures.
///
/// Every query may fail; callers go through [`load_cpu`] and [`load_ram`],
/// which turn failures into a zero reading.
pub trait SystemProbe: Send + Sync {
    /// 1-minute system load average.
    fn load_average(&self) -> Result<f64, MetricsError>;

    /// Number of logical CPU cores.
    fn logical_cores(&self) -> Result<usize, MetricsError>;

    fn memory(&self) -> Result<MemoryStats, MetricsError>;
}

/// Load figures sampled for one report cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadSample {
    pub cpu: f32,
    pub ram: f32,
}

impl LoadSample {
    pub fn collect(probe: &dyn SystemProbe) -> Self {
        Self {
            cpu: load_cpu(probe),
            ram: load_ram(probe),
        }
    }
}

/// CPU load fraction: 1-minute load average divided by the logical core count.
///
/// The divisor never drops below 1.0. Any failed query yields 0.0.
pub fn load_cpu(probe: &dyn SystemProbe) -> f32 {
    match (probe.load_average(), probe.logical_cores()) {
        (Ok(load), Ok(cores)) => (load / (cores as f64).max(1.0)) as f32,
        (Err(e), _) | (_, Err(e)) => {
            debug!(target: "vigil_reporter", "CPU load unavailable: {}", e);
            0.0
        }
    }
}

/// RAM usage fraction: `1 - available / total`, kept within `[0, 1]`.
/// A failed query yields 0.0.
pub fn load_ram(probe: &dyn SystemProbe) -> f32 {
    match probe.memory() {
        Ok(memory) if memory.total > 0 => {
            (1.0 - (memory.available as f32 / memory.total as f32)).clamp(0.0, 1.0)
        }
        Ok(_) => {
            debug!(target: "vigil_reporter", "RAM load unavailable: total memory reported as 0");
            0.0
        }
        Err(e) => {
            debug!(target: "vigil_reporter", "RAM load unavailable: {}", e);
            0.0
        }
    }
}

/// [`SystemProbe`] backed by the `sysinfo` crate.
pub struct SysinfoProbe {
    system: Mutex<System>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn with_system<T>(&self, read: impl FnOnce(&mut System) -> T) -> Result<T, MetricsError> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| MetricsError::Unavailable("system handle poisoned".into()))?;
        Ok(read(&mut system))
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoProbe").finish_non_exhaustive()
    }
}

impl SystemProbe for SysinfoProbe {
    fn load_average(&self) -> Result<f64, MetricsError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(MetricsError::Unsupported);
        }
        Ok(System::load_average().one)
    }

    fn logical_cores(&self) -> Result<usize, MetricsError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(MetricsError::Unsupported);
        }
        self.with_system(|system| {
            system.refresh_cpu();
            system.cpus().len()
        })
    }

    fn memory(&self) -> Result<MemoryStats, MetricsError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(MetricsError::Unsupported);
        }
        let memory = self.with_system(|system| {
            system.refresh_memory();
            MemoryStats {
                total: system.total_memory(),
                available: system.available_memory(),
            }
        })?;

        if memory.total == 0 {
            return Err(MetricsError::Unavailable("total memory".into()));
        }
        Ok(memory)
    }
}
