use crate::collectors::MetricGroup;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

pub const FAILED_PLACEHOLDER: &str = "failed to retrieve";
pub const UNKNOWN_USER: &str = "unknown";

pub const FIELD_COUNT: usize = 14;

/// Snapshot fields in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Hostname,
    Os,
    Arch,
    CpuName,
    CpuCores,
    MemTotal,
    MemUsed,
    MemFree,
    DiskTotal,
    DiskUsed,
    DiskFree,
    User,
    Uptime,
    Timestamp,
}

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Hostname,
        Field::Os,
        Field::Arch,
        Field::CpuName,
        Field::CpuCores,
        Field::MemTotal,
        Field::MemUsed,
        Field::MemFree,
        Field::DiskTotal,
        Field::DiskUsed,
        Field::DiskFree,
        Field::User,
        Field::Uptime,
        Field::Timestamp,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::Hostname => "hostname",
            Field::Os => "os",
            Field::Arch => "arch",
            Field::CpuName => "cpu_name",
            Field::CpuCores => "cpu_cores",
            Field::MemTotal => "mem_total",
            Field::MemUsed => "mem_used",
            Field::MemFree => "mem_free",
            Field::DiskTotal => "disk_total",
            Field::DiskUsed => "disk_used",
            Field::DiskFree => "disk_free",
            Field::User => "user",
            Field::Uptime => "uptime",
            Field::Timestamp => "timestamp",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Hostname => "Hostname",
            Field::Os => "Operating system",
            Field::Arch => "Architecture",
            Field::CpuName => "CPU",
            Field::CpuCores => "CPU cores",
            Field::MemTotal => "Total memory",
            Field::MemUsed => "Used memory",
            Field::MemFree => "Free memory",
            Field::DiskTotal => "Total disk",
            Field::DiskUsed => "Used disk",
            Field::DiskFree => "Free disk",
            Field::User => "Current user",
            Field::Uptime => "System uptime",
            Field::Timestamp => "Current time",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One tick's worth of formatted fields. Every field is always set.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    values: [String; FIELD_COUNT],
    unavailable: Vec<MetricGroup>,
}

impl Snapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    pub fn get(&self, field: Field) -> &str {
        &self.values[field.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL.iter().map(move |f| (*f, self.get(*f)))
    }

    /// Groups whose query failed on this tick.
    pub fn unavailable(&self) -> &[MetricGroup] {
        &self.unavailable
    }
}

/// Unset fields resolve to the failure placeholder on `build`.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    values: [Option<String>; FIELD_COUNT],
    unavailable: Vec<MetricGroup>,
}

impl SnapshotBuilder {
    pub fn set(&mut self, field: Field, value: impl Into<String>) -> &mut Self {
        self.values[field.index()] = Some(value.into());
        self
    }

    pub fn set_group<T>(
        &mut self,
        group: MetricGroup,
        fields: &[Field],
        values: Result<T, crate::collectors::Unavailable>,
        render: impl FnOnce(T) -> Vec<String>,
    ) -> &mut Self {
        match values {
            Ok(v) => {
                for (field, text) in fields.iter().zip(render(v)) {
                    self.set(*field, text);
                }
            }
            Err(_) => {
                for field in fields {
                    self.set(*field, FAILED_PLACEHOLDER);
                }
                self.mark_unavailable(group);
            }
        }
        self
    }

    pub fn mark_unavailable(&mut self, group: MetricGroup) -> &mut Self {
        if !self.unavailable.contains(&group) {
            self.unavailable.push(group);
        }
        self
    }

    pub fn build(self) -> Snapshot {
        Snapshot {
            values: self
                .values
                .map(|v| v.unwrap_or_else(|| FAILED_PLACEHOLDER.to_string())),
            unavailable: self.unavailable,
        }
    }
}

struct Fields<'a>(&'a Snapshot);

impl Serialize for Fields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FIELD_COUNT))?;
        for (field, value) in self.0.iter() {
            map.serialize_entry(field.key(), value)?;
        }
        map.end()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Snapshot", 2)?;
        s.serialize_field("fields", &Fields(self))?;
        s.serialize_field("unavailable", &self.unavailable)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_order_matches_declaration() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
        assert_eq!(Field::ALL.first(), Some(&Field::Hostname));
        assert_eq!(Field::ALL.last(), Some(&Field::Timestamp));
    }

    #[test]
    fn unset_fields_become_placeholder() {
        let mut b = Snapshot::builder();
        b.set(Field::Os, "linux");
        let snap = b.build();
        assert_eq!(snap.get(Field::Os), "linux");
        assert_eq!(snap.get(Field::Hostname), FAILED_PLACEHOLDER);
        assert_eq!(snap.iter().count(), FIELD_COUNT);
    }

    #[test]
    fn failed_group_fills_every_field() {
        let mut b = Snapshot::builder();
        b.set_group(
            MetricGroup::Memory,
            &[Field::MemTotal, Field::MemUsed, Field::MemFree],
            Err::<u64, _>(crate::collectors::Unavailable(MetricGroup::Memory)),
            |_| Vec::new(),
        );
        let snap = b.build();
        assert_eq!(snap.get(Field::MemTotal), FAILED_PLACEHOLDER);
        assert_eq!(snap.get(Field::MemUsed), FAILED_PLACEHOLDER);
        assert_eq!(snap.get(Field::MemFree), FAILED_PLACEHOLDER);
        assert_eq!(snap.unavailable(), &[MetricGroup::Memory]);
    }

    #[test]
    fn json_keeps_display_order() {
        let mut b = Snapshot::builder();
        for field in Field::ALL {
            b.set(field, field.label());
        }
        let json = serde_json::to_string(&b.build()).expect("serialize");
        let host = json.find("\"hostname\"").expect("hostname key");
        let user = json.find("\"user\"").expect("user key");
        let time = json.find("\"timestamp\"").expect("timestamp key");
        assert!(host < user && user < time);
        assert!(json.contains("\"unavailable\":[]"));
    }
}
