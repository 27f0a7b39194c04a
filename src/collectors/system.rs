use crate::collectors::{
    percent_of, CpuDescriptor, FactsProvider, MemoryStats, MetricGroup, Partition, Unavailable,
    UsageStats,
};
use std::path::Path;
use sysinfo::{CpuExt, DiskExt, System, SystemExt};
use tracing::debug;

const OPTICAL_FILESYSTEMS: [&str; 2] = ["iso9660", "udf"];

pub struct SysinfoProvider {
    system: System,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FactsProvider for SysinfoProvider {
    fn refresh(&mut self) {
        self.system.refresh_cpu();
        self.system.refresh_memory();
        self.system.refresh_disks_list();
        self.system.refresh_disks();
        debug!(
            cpus = self.system.cpus().len(),
            disks = self.system.disks().len(),
            "system facts refreshed"
        );
    }

    fn host_name(&self) -> Result<String, Unavailable> {
        self.system
            .host_name()
            .filter(|name| !name.trim().is_empty())
            .ok_or(Unavailable(MetricGroup::Hostname))
    }

    fn cpus(&self) -> Result<Vec<CpuDescriptor>, Unavailable> {
        let physical_cores = self
            .system
            .physical_core_count()
            .and_then(|n| u32::try_from(n).ok());
        Ok(self
            .system
            .cpus()
            .iter()
            .map(|c| CpuDescriptor {
                model_name: c.brand().trim().to_string(),
                physical_cores,
            })
            .collect())
    }

    fn virtual_memory(&self) -> Result<MemoryStats, Unavailable> {
        let total_bytes = self.system.total_memory();
        if total_bytes == 0 {
            return Err(Unavailable(MetricGroup::Memory));
        }
        let used_bytes = self.system.used_memory();
        Ok(MemoryStats {
            total_bytes,
            used_bytes,
            free_bytes: self.system.free_memory(),
            used_percent: percent_of(used_bytes, total_bytes),
        })
    }

    fn partitions(&self) -> Result<Vec<Partition>, Unavailable> {
        Ok(self
            .system
            .disks()
            .iter()
            .filter(|d| d.total_space() > 0)
            .map(|d| Partition {
                device: d.name().to_string_lossy().to_string(),
                mount_point: d.mount_point().to_string_lossy().to_string(),
                fs_type: String::from_utf8_lossy(d.file_system()).to_string(),
            })
            .filter(|p| !is_optical(&p.fs_type))
            .collect())
    }

    fn disk_usage(&self, mount_point: &str) -> Result<UsageStats, Unavailable> {
        let disk = self
            .system
            .disks()
            .iter()
            .find(|d| d.mount_point() == Path::new(mount_point))
            .ok_or(Unavailable(MetricGroup::Disk))?;
        let total_bytes = disk.total_space();
        if total_bytes == 0 {
            return Err(Unavailable(MetricGroup::Disk));
        }
        let free_bytes = disk.available_space();
        let used_bytes = total_bytes.saturating_sub(free_bytes);
        Ok(UsageStats {
            total_bytes,
            used_bytes,
            free_bytes,
            used_percent: percent_of(used_bytes, total_bytes),
        })
    }

    fn uptime(&self) -> Result<u64, Unavailable> {
        // sysinfo reports 0 when the boot clock cannot be read.
        match self.system.uptime() {
            0 => Err(Unavailable(MetricGroup::Uptime)),
            secs => Ok(secs),
        }
    }
}

fn is_optical(fs_type: &str) -> bool {
    OPTICAL_FILESYSTEMS
        .iter()
        .any(|fs| fs.eq_ignore_ascii_case(fs_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optical_filesystems_are_excluded() {
        assert!(is_optical("iso9660"));
        assert!(is_optical("UDF"));
        assert!(!is_optical("ext4"));
        assert!(!is_optical("ntfs"));
    }

    #[test]
    fn unknown_mount_point_is_unavailable() {
        let mut provider = SysinfoProvider::new();
        provider.refresh();
        let err = provider
            .disk_usage("/definitely/not/a/mount/point")
            .unwrap_err();
        assert_eq!(err, Unavailable(MetricGroup::Disk));
    }

    #[test]
    fn partitions_have_usage() {
        let mut provider = SysinfoProvider::new();
        provider.refresh();
        let partitions = provider.partitions().expect("partitions never fail");
        if let Some(first) = partitions.first() {
            let usage = provider.disk_usage(&first.mount_point).expect("usage");
            assert!(usage.total_bytes > 0);
            assert!(usage.used_bytes <= usage.total_bytes);
        }
    }
}
