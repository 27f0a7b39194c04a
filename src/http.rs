use crate::display::{DisplayError, DisplaySink};
use crate::metrics::Metrics;
use crate::snapshot::Snapshot;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::net::TcpListener;

type Latest = Arc<RwLock<Option<Arc<Snapshot>>>>;

/// Holds the snapshot the web page serves. Written only through
/// `DisplaySink::apply`; handlers read it.
#[derive(Clone, Default)]
pub struct WebView {
    latest: Latest,
}

impl WebView {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self) -> Option<Arc<Snapshot>> {
        match self.latest.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DisplaySink for WebView {
    fn name(&self) -> &'static str {
        "web"
    }

    fn apply(&mut self, snapshot: &Snapshot) -> Result<(), DisplayError> {
        let mut guard = self.latest.write().map_err(|_| DisplayError::Poisoned)?;
        *guard = Some(Arc::new(snapshot.clone()));
        Ok(())
    }
}

#[derive(Clone)]
pub struct HttpAppState {
    pub metrics: Arc<Metrics>,
    pub view: WebView,
    pub title: Arc<str>,
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("invalid listen address '{listen}': {source}")]
    Address {
        listen: String,
        source: std::net::AddrParseError,
    },
    #[error("failed to bind {addr}: {source}")]
    Io {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

/// Binds the web view listener up front so startup can fail fast.
pub async fn bind_listener(listen: &str) -> Result<TcpListener, BindError> {
    let addr: SocketAddr = listen.parse().map_err(|source| BindError::Address {
        listen: listen.to_string(),
        source,
    })?;
    TcpListener::bind(addr)
        .await
        .map_err(|source| BindError::Io { addr, source })
}

pub fn build_router(metrics: Arc<Metrics>, view: WebView, title: &str) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .with_state(HttpAppState {
            metrics,
            view,
            title: Arc::from(title),
        })
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_handler(State(state): State<HttpAppState>) -> Response {
    state.metrics.inc_scrape_count();
    match state.metrics.encode_metrics() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {err}"),
        )
            .into_response(),
    }
}

async fn snapshot_handler(State(state): State<HttpAppState>) -> Response {
    match state.view.current() {
        Some(snapshot) => Json(&*snapshot).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no snapshot collected yet").into_response(),
    }
}

async fn page_handler(State(state): State<HttpAppState>) -> Html<String> {
    Html(render_page(&state.title, state.view.current().as_deref()))
}

fn render_page(title: &str, snapshot: Option<&Snapshot>) -> String {
    let title = escape_html(title);
    let mut rows = String::new();
    match snapshot {
        Some(snapshot) => {
            for (field, value) in snapshot.iter() {
                rows.push_str(&format!(
                    "<tr><th>{}</th><td id=\"{}\">{}</td></tr>\n",
                    field.label(),
                    field.key(),
                    escape_html(value)
                ));
            }
        }
        None => rows.push_str("<tr><td>collecting...</td></tr>\n"),
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"5\">\n<title>{title}</title>\n\
         <style>th {{ text-align: right; padding-right: 1em; }}</style>\n</head>\n\
         <body>\n<h1>{title}</h1>\n<table>\n{rows}</table>\n</body>\n</html>\n"
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Field;
    use axum::body::to_bytes;
    use axum::http::Request;
    use tower::ServiceExt;

    fn sample() -> Snapshot {
        let mut b = Snapshot::builder();
        for field in Field::ALL {
            b.set(field, format!("v-{}", field.key()));
        }
        b.set(Field::Hostname, "<host>");
        b.build()
    }

    async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn bind_rejects_taken_address() {
        let held = bind_listener("127.0.0.1:0").await.expect("ephemeral bind");
        let addr = held.local_addr().expect("local addr");

        let err = bind_listener(&addr.to_string()).await.unwrap_err();
        assert!(matches!(err, BindError::Io { .. }), "{err}");
    }

    #[tokio::test]
    async fn bind_rejects_malformed_address() {
        let err = bind_listener("not-an-address").await.unwrap_err();
        assert!(matches!(err, BindError::Address { .. }), "{err}");
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let metrics = Metrics::new().expect("metrics init");
        let app = build_router(metrics, WebView::new(), "T");

        let (status, body) = get_text(app, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn metrics_contains_collect_counters() {
        let metrics = Metrics::new().expect("metrics init");
        metrics.record_snapshot(&sample());
        let app = build_router(metrics, WebView::new(), "T");

        let (status, body) = get_text(app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("sysview_ticks_total 1"));
        assert!(body.contains("sysview_collect_errors_total"));
    }

    #[tokio::test]
    async fn snapshot_unavailable_before_first_tick() {
        let metrics = Metrics::new().expect("metrics init");
        let app = build_router(metrics, WebView::new(), "T");

        let (status, _) = get_text(app, "/api/snapshot").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn snapshot_served_after_apply() {
        let metrics = Metrics::new().expect("metrics init");
        let mut view = WebView::new();
        let app = build_router(metrics, view.clone(), "T");
        view.apply(&sample()).expect("apply");

        let (status, body) = get_text(app, "/api/snapshot").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).expect("json");
        assert_eq!(json["fields"]["hostname"], "<host>");
        assert_eq!(json["fields"]["timestamp"], "v-timestamp");
        assert!(json["unavailable"].as_array().expect("array").is_empty());
    }

    #[tokio::test]
    async fn page_lists_every_label_escaped() {
        let metrics = Metrics::new().expect("metrics init");
        let mut view = WebView::new();
        view.apply(&sample()).expect("apply");
        let app = build_router(metrics, view, "System Info Viewer");

        let (status, body) = get_text(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<h1>System Info Viewer</h1>"));
        for field in Field::ALL {
            assert!(body.contains(field.label()), "{}", field.label());
        }
        assert!(body.contains("&lt;host&gt;"));
        assert!(!body.contains("<host>"));
    }
}
