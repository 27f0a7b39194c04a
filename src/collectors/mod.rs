pub mod system;

use std::fmt;
use thiserror::Error;

/// Group of fields that fail together when the underlying query fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricGroup {
    Hostname,
    Cpu,
    Memory,
    Disk,
    Uptime,
}

impl MetricGroup {
    pub const ALL: [MetricGroup; 5] = [
        MetricGroup::Hostname,
        MetricGroup::Cpu,
        MetricGroup::Memory,
        MetricGroup::Disk,
        MetricGroup::Uptime,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricGroup::Hostname => "hostname",
            MetricGroup::Cpu => "cpu",
            MetricGroup::Memory => "memory",
            MetricGroup::Disk => "disk",
            MetricGroup::Uptime => "uptime",
        }
    }
}

impl fmt::Display for MetricGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} metric unavailable")]
pub struct Unavailable(pub MetricGroup);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuDescriptor {
    pub model_name: String,
    pub physical_cores: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageStats {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: f64,
}

/// Source of host facts. Every fallible call fails on its own; callers
/// only see whether a value is present.
pub trait FactsProvider {
    /// Called once at the start of every tick.
    fn refresh(&mut self) {}

    fn host_name(&self) -> Result<String, Unavailable>;

    fn cpus(&self) -> Result<Vec<CpuDescriptor>, Unavailable>;

    fn virtual_memory(&self) -> Result<MemoryStats, Unavailable>;

    /// Mounted partitions in enumeration order, pseudo and optical devices excluded.
    fn partitions(&self) -> Result<Vec<Partition>, Unavailable>;

    fn disk_usage(&self, mount_point: &str) -> Result<UsageStats, Unavailable>;

    fn uptime(&self) -> Result<u64, Unavailable>;

    fn logical_cpu_count(&self) -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

pub(crate) fn percent_of(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
