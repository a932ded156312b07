//! Snapshot data model
//!
//! One [`Snapshot`] is assembled per sync cycle from the nine metric endpoints.
//! Every section is tagged independently: a failing endpoint only marks its own
//! section as [`Section::Failed`] and leaves the others intact.
//!
//! ## Validity
//!
//! A snapshot is *valid* iff the `system`, `cpu` and `memory` sections are all
//! [`Section::Ok`]. Empty payloads never reach `Ok` (the source rejects them with
//! [`EndpointFailure::Empty`]), so "ok" already implies "non-empty".

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::error::EndpointFailure;

/// The statically known set of metric endpoints polled every cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    System,
    Cpu,
    Memory,
    Pools,
    Gpu,
    Network,
    DiskIo,
    Temperatures,
    Processes,
}

impl Endpoint {
    /// All endpoints in fetch order
    pub const ALL: [Endpoint; 9] = [
        Endpoint::System,
        Endpoint::Cpu,
        Endpoint::Memory,
        Endpoint::Pools,
        Endpoint::Gpu,
        Endpoint::Network,
        Endpoint::DiskIo,
        Endpoint::Temperatures,
        Endpoint::Processes,
    ];

    /// Sections that must succeed for a snapshot to be applied
    pub const REQUIRED: [Endpoint; 3] = [Endpoint::System, Endpoint::Cpu, Endpoint::Memory];

    /// HTTP path of the endpoint, relative to the backend base URL
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::System => "/api/system-info",
            Endpoint::Cpu => "/api/cpu-info",
            Endpoint::Memory => "/api/memory-info",
            Endpoint::Pools => "/api/pools",
            Endpoint::Gpu => "/api/gpu-info",
            Endpoint::Network => "/api/network",
            Endpoint::DiskIo => "/api/disk-io",
            Endpoint::Temperatures => "/api/temperatures",
            Endpoint::Processes => "/api/top-processes",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::System => "system",
            Endpoint::Cpu => "cpu",
            Endpoint::Memory => "memory",
            Endpoint::Pools => "pools",
            Endpoint::Gpu => "gpu",
            Endpoint::Network => "network",
            Endpoint::DiskIo => "disk_io",
            Endpoint::Temperatures => "temperatures",
            Endpoint::Processes => "processes",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One metric domain within a snapshot, tagged as success or failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Ok(T),
    Failed(EndpointFailure),
}

impl<T> Section<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Section::Ok(_))
    }

    pub fn ok(&self) -> Option<&T> {
        match self {
            Section::Ok(payload) => Some(payload),
            Section::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&EndpointFailure> {
        match self {
            Section::Ok(_) => None,
            Section::Failed(reason) => Some(reason),
        }
    }
}

impl<T> From<Result<T, EndpointFailure>> for Section<T> {
    fn from(result: Result<T, EndpointFailure>) -> Self {
        match result {
            Ok(payload) => Section::Ok(payload),
            Err(reason) => Section::Failed(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub kernel: Option<String>,
    #[serde(default)]
    pub architecture: Option<String>,
    /// ISO-8601 boot time as reported by the backend
    #[serde(default)]
    pub boot_time: Option<String>,
    /// Human readable uptime (e.g. `3d 4h 12m`)
    #[serde(default)]
    pub uptime: Option<String>,
    #[serde(default)]
    pub load_avg: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    /// Overall usage in percent (0-100)
    pub usage: f64,
    pub cores: u32,
    pub threads: u32,
    /// Current frequency in MHz
    #[serde(default)]
    pub frequency: Option<f64>,
    /// Package temperature in °C
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub per_cpu_usage: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    /// Used memory in percent (0-100)
    pub percent: f64,
    #[serde(default)]
    pub system: Option<f64>,
    #[serde(default)]
    pub vm: Option<f64>,
    #[serde(default)]
    pub docker: Option<f64>,
    #[serde(default)]
    pub swap_total: u64,
    #[serde(default)]
    pub swap_used: u64,
    #[serde(default)]
    pub swap_free: u64,
    #[serde(default)]
    pub swap_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub name: String,
    pub temperature: f64,
    pub utilization: f64,
    /// Memory figures are in MB
    pub memory_total: f64,
    pub memory_used: f64,
    #[serde(default)]
    pub memory_free: Option<f64>,
    #[serde(default)]
    pub memory_utilization: Option<f64>,
    #[serde(default)]
    pub driver_version: Option<String>,
    #[serde(default)]
    pub pci_bus: Option<String>,
    #[serde(default)]
    pub clock_graphics: Option<f64>,
    #[serde(default)]
    pub clock_memory: Option<f64>,
    #[serde(default)]
    pub power_draw: Option<f64>,
    #[serde(default)]
    pub power_limit: Option<f64>,
    #[serde(default)]
    pub process_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    #[serde(default)]
    pub ipv4: Option<String>,
    /// Link speed in Mbps (0 when unknown)
    #[serde(default)]
    pub speed: u64,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default)]
    pub is_up: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Cumulative byte counters since boot
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    #[serde(default)]
    pub packets_sent: u64,
    #[serde(default)]
    pub packets_recv: u64,
    #[serde(default)]
    pub errors_in: u64,
    #[serde(default)]
    pub errors_out: u64,
    #[serde(default)]
    pub drops_in: u64,
    #[serde(default)]
    pub drops_out: u64,
    #[serde(default)]
    pub active_interface: Option<NetworkInterface>,
    /// Instantaneous send rate in bytes/sec, if the backend computes it
    #[serde(default)]
    pub current_sent: Option<f64>,
    /// Instantaneous receive rate in bytes/sec, if the backend computes it
    #[serde(default)]
    pub current_recv: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskIoInfo {
    pub read_bytes: u64,
    pub write_bytes: u64,
    #[serde(default)]
    pub read_count: u64,
    #[serde(default)]
    pub write_count: u64,
    #[serde(default)]
    pub read_time: u64,
    #[serde(default)]
    pub write_time: u64,
    /// bytes/sec
    #[serde(default)]
    pub read_speed: f64,
    /// bytes/sec
    #[serde(default)]
    pub write_speed: f64,
    #[serde(default)]
    pub read_speed_formatted: Option<String>,
    #[serde(default)]
    pub write_speed_formatted: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Display name (may change between backend versions)
    pub name: String,
    /// Mount path; the stable identity of the pool when present
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub fstype: Option<String>,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    /// Used space in percent (0-100)
    pub percent: f64,
}

impl PoolInfo {
    /// Stable key used to identify the pool across cycles
    pub fn key(&self) -> &str {
        match self.mountpoint.as_deref() {
            Some(mountpoint) if !mountpoint.is_empty() => mountpoint,
            _ => &self.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    #[serde(default)]
    pub cpu_percent: f64,
    #[serde(default)]
    pub memory_percent: f64,
    #[serde(default)]
    pub memory_mb: Option<f64>,
}

/// Sensor name → temperature in °C
pub type Temperatures = BTreeMap<String, f64>;

/// One cycle's aggregated, partially-fallible readout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the fan-in completed
    pub taken_at: DateTime<Utc>,
    pub system: Section<SystemInfo>,
    pub cpu: Section<CpuInfo>,
    pub memory: Section<MemoryInfo>,
    pub gpu: Section<Vec<GpuInfo>>,
    pub network: Section<NetworkInfo>,
    pub disk_io: Section<DiskIoInfo>,
    pub pools: Section<Vec<PoolInfo>>,
    pub temperatures: Section<Temperatures>,
    pub processes: Section<Vec<ProcessInfo>>,
}

impl Snapshot {
    /// Whether the snapshot may be applied to history, alerts and renderers
    pub fn is_valid(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Required sections that failed this cycle
    pub fn missing_required(&self) -> Vec<Endpoint> {
        Endpoint::REQUIRED
            .into_iter()
            .filter(|endpoint| self.failure(*endpoint).is_some())
            .collect()
    }

    /// Failure reason of the given section, if it failed
    pub fn failure(&self, endpoint: Endpoint) -> Option<&EndpointFailure> {
        match endpoint {
            Endpoint::System => self.system.failure(),
            Endpoint::Cpu => self.cpu.failure(),
            Endpoint::Memory => self.memory.failure(),
            Endpoint::Pools => self.pools.failure(),
            Endpoint::Gpu => self.gpu.failure(),
            Endpoint::Network => self.network.failure(),
            Endpoint::DiskIo => self.disk_io.failure(),
            Endpoint::Temperatures => self.temperatures.failure(),
            Endpoint::Processes => self.processes.failure(),
        }
    }

    /// All failed sections with their reasons, in fetch order
    pub fn failures(&self) -> Vec<(Endpoint, &EndpointFailure)> {
        Endpoint::ALL
            .into_iter()
            .filter_map(|endpoint| self.failure(endpoint).map(|reason| (endpoint, reason)))
            .collect()
    }
}
