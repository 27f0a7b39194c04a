use crate::collectors::MetricGroup;
use crate::snapshot::Snapshot;
use prometheus::core::Collector;
use prometheus::{opts, Counter, CounterVec, Encoder, Gauge, Registry, TextEncoder};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Process self-metrics, served only by the local web view.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    started_at_unix: i64,
    pub sysview_ticks_total: Counter,
    pub sysview_collect_errors_total: CounterVec,
    pub sysview_last_collect_timestamp_seconds: Gauge,
    pub sysview_uptime_seconds: Gauge,
    pub sysview_scrape_count_total: Counter,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let sysview_ticks_total = Counter::with_opts(opts!(
            "sysview_ticks_total",
            "Number of snapshots collected"
        ))?;
        let sysview_collect_errors_total = CounterVec::new(
            opts!(
                "sysview_collect_errors_total",
                "Number of ticks on which a metric group was unavailable"
            ),
            &["group"],
        )?;
        let sysview_last_collect_timestamp_seconds = Gauge::with_opts(opts!(
            "sysview_last_collect_timestamp_seconds",
            "Unix time of the latest snapshot"
        ))?;
        let sysview_uptime_seconds = Gauge::with_opts(opts!(
            "sysview_uptime_seconds",
            "Seconds since sysview started"
        ))?;
        let sysview_scrape_count_total = Counter::with_opts(opts!(
            "sysview_scrape_count_total",
            "Number of /metrics scrapes"
        ))?;

        for group in MetricGroup::ALL {
            sysview_collect_errors_total.with_label_values(&[group.as_str()]);
        }

        register(&registry, &sysview_ticks_total)?;
        register(&registry, &sysview_collect_errors_total)?;
        register(&registry, &sysview_last_collect_timestamp_seconds)?;
        register(&registry, &sysview_uptime_seconds)?;
        register(&registry, &sysview_scrape_count_total)?;

        Ok(Arc::new(Self {
            registry,
            started_at_unix: now_unix(),
            sysview_ticks_total,
            sysview_collect_errors_total,
            sysview_last_collect_timestamp_seconds,
            sysview_uptime_seconds,
            sysview_scrape_count_total,
        }))
    }

    pub fn record_snapshot(&self, snapshot: &Snapshot) {
        self.sysview_ticks_total.inc();
        for group in snapshot.unavailable() {
            self.sysview_collect_errors_total
                .with_label_values(&[group.as_str()])
                .inc();
        }
        let now = now_unix();
        self.sysview_last_collect_timestamp_seconds.set(now as f64);
        self.sysview_uptime_seconds
            .set(now.saturating_sub(self.started_at_unix) as f64);
    }

    pub fn inc_scrape_count(&self) {
        self.sysview_scrape_count_total.inc();
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
