use crate::collectors::{FactsProvider, MetricGroup, Unavailable, UsageStats};
use crate::format::{format_gb, format_gb_with_percent, format_timestamp, format_uptime};
use crate::snapshot::{Field, Snapshot, SnapshotBuilder, FAILED_PLACEHOLDER, UNKNOWN_USER};
use chrono::Local;
use std::time::Duration;
use tracing::debug;

/// Environment variables tried in order for the session user.
const USER_ENV_VARS: [&str; 2] = ["USERNAME", "USER"];

pub struct MetricsSnapshotter<P> {
    provider: P,
}

impl<P: FactsProvider> MetricsSnapshotter<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Builds a complete snapshot. Failed queries turn into placeholders
    /// and never reach the caller.
    pub fn collect(&mut self) -> Snapshot {
        self.provider.refresh();

        let mut b = Snapshot::builder();
        let host = self.provider.host_name();
        b.set_group(MetricGroup::Hostname, &[Field::Hostname], host, |h| vec![h]);
        b.set(Field::Os, std::env::consts::OS);
        b.set(Field::Arch, std::env::consts::ARCH);
        self.collect_cpu(&mut b);
        self.collect_memory(&mut b);
        self.collect_disk(&mut b);
        b.set(Field::User, self.current_user());
        let uptime = self.provider.uptime();
        b.set_group(MetricGroup::Uptime, &[Field::Uptime], uptime, |secs| {
            vec![format_uptime(Duration::from_secs(secs))]
        });
        b.set(Field::Timestamp, format_timestamp(Local::now()));

        let snapshot = b.build();
        for group in snapshot.unavailable() {
            debug!(group = %group, "metric unavailable, placeholder shown");
        }
        snapshot
    }

    fn collect_cpu(&self, b: &mut SnapshotBuilder) {
        let logical = self.provider.logical_cpu_count();
        match self.provider.cpus() {
            Ok(cpus) if !cpus.is_empty() => {
                let first = &cpus[0];
                b.set(Field::CpuName, first.model_name.clone());
                let cores = match first.physical_cores {
                    Some(physical) => format!("{physical} (logical: {logical})"),
                    None => logical.to_string(),
                };
                b.set(Field::CpuCores, cores);
            }
            _ => {
                b.set(Field::CpuName, FAILED_PLACEHOLDER);
                b.set(Field::CpuCores, logical.to_string());
                b.mark_unavailable(MetricGroup::Cpu);
            }
        }
    }

    fn collect_memory(&self, b: &mut SnapshotBuilder) {
        b.set_group(
            MetricGroup::Memory,
            &[Field::MemTotal, Field::MemUsed, Field::MemFree],
            self.provider.virtual_memory(),
            |m| {
                vec![
                    format_gb(m.total_bytes),
                    format_gb_with_percent(m.used_bytes, m.used_percent),
                    format_gb(m.free_bytes),
                ]
            },
        );
    }

    fn collect_disk(&self, b: &mut SnapshotBuilder) {
        b.set_group(
            MetricGroup::Disk,
            &[Field::DiskTotal, Field::DiskUsed, Field::DiskFree],
            self.first_partition_usage(),
            |u| {
                vec![
                    format_gb(u.total_bytes),
                    format_gb_with_percent(u.used_bytes, u.used_percent),
                    format_gb(u.free_bytes),
                ]
            },
        );
    }

    /// Only the first enumerated partition is read.
    fn first_partition_usage(&self) -> Result<UsageStats, Unavailable> {
        let partitions = self.provider.partitions()?;
        let first = partitions.first().ok_or(Unavailable(MetricGroup::Disk))?;
        debug!(device = %first.device, mount = %first.mount_point, "reading first partition");
        self.provider.disk_usage(&first.mount_point)
    }

    fn current_user(&self) -> String {
        USER_ENV_VARS
            .iter()
            .filter_map(|name| self.provider.env_var(name))
            .find(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string())
    }
}
