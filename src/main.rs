mod collectors;
mod config;
mod display;
mod format;
mod http;
mod metrics;
mod snapshot;
mod snapshotter;

use axum::serve;
use clap::Parser;
use collectors::system::SysinfoProvider;
use config::Config;
use display::terminal::TerminalView;
use display::{run_display, DisplaySink};
use http::WebView;
use metrics::Metrics;
use snapshot::Snapshot;
use snapshotter::MetricsSnapshotter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const COLLECT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "sysview")]
#[command(version)]
struct Cli {
    /// Optional YAML file; built-in defaults are used without it.
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    print_default_config: bool,
    /// Serve the web view regardless of the config file.
    #[arg(long)]
    web: bool,
    /// Do not draw the form in this terminal.
    #[arg(long)]
    no_terminal: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let mut cfg = match &cli.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to load configuration");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if cli.web {
        cfg.web.enabled = true;
    }
    if cli.no_terminal {
        cfg.terminal.enabled = false;
    }
    if let Err(err) = cfg.validate() {
        error!(error = %err, "invalid configuration");
        std::process::exit(1);
    }

    info!(
        interval_secs = COLLECT_INTERVAL.as_secs(),
        terminal = cfg.terminal.enabled,
        web = cfg.web.enabled,
        "starting sysview"
    );

    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "failed to initialise metrics");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (snapshot_tx, snapshot_rx) = watch::channel::<Option<Arc<Snapshot>>>(None);

    let mut sinks: Vec<Box<dyn DisplaySink + Send>> = Vec::new();
    if cfg.terminal.enabled {
        sinks.push(Box::new(TerminalView::stdout(cfg.terminal.title.clone())));
    }

    let http_task = if cfg.web.enabled {
        let listener = match http::bind_listener(&cfg.web.listen).await {
            Ok(l) => l,
            Err(err) => {
                error!(error = %err, "failed to start HTTP server");
                std::process::exit(1);
            }
        };
        match listener.local_addr() {
            Ok(addr) => info!(listen = %addr, "web view listening"),
            Err(err) => debug!(error = %err, "listener has no local address"),
        }
        let view = WebView::new();
        sinks.push(Box::new(view.clone()));
        let app = http::build_router(metrics.clone(), view, &cfg.terminal.title);
        let mut shutdown_rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });

            if let Err(err) = server.await {
                error!(error = %err, "HTTP server error");
            }
        }))
    } else {
        None
    };

    let display_task = tokio::spawn(run_display(snapshot_rx, sinks, shutdown_rx.clone()));

    let collector_task = {
        let metrics = metrics.clone();
        let mut shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut snapshotter = MetricsSnapshotter::new(SysinfoProvider::new());
            let mut ticker = tokio::time::interval(COLLECT_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        info!("collector received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let snapshot = snapshotter.collect();
                        metrics.record_snapshot(&snapshot);
                        debug!(unavailable = snapshot.unavailable().len(), "snapshot collected");
                        if snapshot_tx.send(Some(Arc::new(snapshot))).is_err() {
                            debug!("display loop gone, stopping collector");
                            break;
                        }
                    }
                }
            }
        })
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to wait for Ctrl+C");
    }
    info!("Ctrl+C received, shutting down");

    let _ = shutdown_tx.send(true);

    let _ = collector_task.await;
    let _ = display_task.await;
    if let Some(task) = http_task {
        let _ = task.await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
