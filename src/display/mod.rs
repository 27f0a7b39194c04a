pub mod terminal;

use crate::snapshot::Snapshot;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("failed to write view: {0}")]
    Io(#[from] std::io::Error),
    #[error("view lock poisoned")]
    Poisoned,
}

/// A surface that shows the latest snapshot. `apply` replaces every
/// field at once.
pub trait DisplaySink {
    fn name(&self) -> &'static str;

    fn apply(&mut self, snapshot: &Snapshot) -> Result<(), DisplayError>;
}

/// The only place views are mutated. Runs until shutdown or until the
/// collector side of the channel is gone.
pub async fn run_display(
    mut snapshots: watch::Receiver<Option<Arc<Snapshot>>>,
    mut sinks: Vec<Box<dyn DisplaySink + Send>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("display loop received shutdown signal");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    debug!("snapshot channel closed");
                    break;
                }
                let latest = snapshots.borrow_and_update().clone();
                if let Some(snapshot) = latest {
                    apply_all(&mut sinks, &snapshot);
                }
            }
        }
    }
}

fn apply_all(sinks: &mut [Box<dyn DisplaySink + Send>], snapshot: &Snapshot) {
    for sink in sinks.iter_mut() {
        if let Err(err) = sink.apply(snapshot) {
            warn!(error = %err, view = sink.name(), "failed to apply snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Field;
    use std::sync::Mutex;

    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl DisplaySink for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn apply(&mut self, snapshot: &Snapshot) -> Result<(), DisplayError> {
            self.seen
                .lock()
                .map_err(|_| DisplayError::Poisoned)?
                .push(snapshot.get(Field::Hostname).to_string());
            Ok(())
        }
    }

    struct Failing;

    impl DisplaySink for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn apply(&mut self, _: &Snapshot) -> Result<(), DisplayError> {
            Err(DisplayError::Poisoned)
        }
    }

    fn snapshot(host: &str) -> Arc<Snapshot> {
        let mut b = Snapshot::builder();
        b.set(Field::Hostname, host);
        Arc::new(b.build())
    }

    #[tokio::test]
    async fn applies_snapshots_until_channel_closes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = watch::channel(None);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let sinks: Vec<Box<dyn DisplaySink + Send>> = vec![
            Box::new(Failing),
            Box::new(Recorder { seen: seen.clone() }),
        ];
        let task = tokio::spawn(run_display(rx, sinks, shutdown_rx));

        tx.send(Some(snapshot("first"))).expect("receiver alive");
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        tx.send(Some(snapshot("second"))).expect("receiver alive");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(tx);
        task.await.expect("display task");

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.last().map(String::as_str), Some("second"));
        assert!(seen.iter().all(|h| h == "first" || h == "second"));
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let (_tx, rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_display(rx, Vec::new(), shutdown_rx));
        shutdown_tx.send(true).expect("receiver alive");
        task.await.expect("display task");
    }
}
