use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::report::{self, ReportReceiver};
use crate::scanner::{self, SharedProgress};
use crate::types::{ReportEvent, ScanRequest};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<ServerState>>, // shared mutable state for progress/events
}

#[derive(Debug)]
struct ServerState {
    status: Status,
    events: Option<ReportReceiver>,
    progress: Option<SharedProgress>,
    cancel: Option<CancellationToken>,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct Status {
    pub total: u64,
    pub completed: u64,
    pub percentage: f64,
    pub state: String, // "idle" | "running" | "done"
}

/// JSON start command from the front-end. Mirrors what the input fields of
/// a GUI would hold: raw strings, validated server-side.
#[derive(Debug, Deserialize)]
pub struct StartScan {
    pub start: String,
    pub end: String,
    pub ports: String,
    pub protocol: String,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

pub async fn spawn_server(bind: &str) -> Result<()> {
    let state = AppState {
        inner: Arc::new(RwLock::new(ServerState {
            status: Status {
                total: 0,
                completed: 0,
                percentage: 0.0,
                state: "idle".into(),
            },
            events: None,
            progress: None,
            cancel: None,
        })),
    };

    let api = Router::new()
        .route("/status", get(get_status))
        .route("/events", get(get_events))
        .route("/scan", post(post_scan))
        .route("/stop", post(post_stop))
        .with_state(state.clone());

    let app = Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http());

    info!("serving scan API on http://{bind}");
    axum::serve(tokio::net::TcpListener::bind(bind).await?, app).await?;
    Ok(())
}

async fn get_status(State(app): State<AppState>) -> impl IntoResponse {
    let s = app.inner.read().await;
    let mut out = s.status.clone();
    // While a scan runs, read the engine's live counters rather than the
    // snapshot written at scan end.
    if let Some(p) = s.progress.as_ref() {
        out.completed = p.completed();
        if out.total > 0 {
            out.percentage = out.completed as f64 / out.total as f64 * 100.0;
        }
    }
    (StatusCode::OK, Json(out))
}

/// Drain everything currently queued on the report channel and hand it to
/// the polling consumer as wire-format lines.
async fn get_events(State(app): State<AppState>) -> impl IntoResponse {
    let mut s = app.inner.write().await;
    let drained = match s.events.as_mut() {
        Some(rx) => rx.drain(),
        None => Vec::new(),
    };
    let mut lines: Vec<String> = Vec::with_capacity(drained.len());
    for event in drained {
        match &event {
            ReportEvent::Progress(pct) => s.status.percentage = *pct,
            ReportEvent::Complete => s.status.state = "done".into(),
            _ => {}
        }
        lines.push(event.to_string());
    }
    (StatusCode::OK, Json(lines))
}

async fn post_scan(State(app): State<AppState>, Json(req): Json<StartScan>) -> impl IntoResponse {
    // Validate synchronously; a bad request never dispatches a task.
    let mut request = match ScanRequest::parse(&req.start, &req.end, &req.ports, &req.protocol) {
        Ok(r) => r,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    if let Some(c) = req.concurrency {
        request = request.with_concurrency(c);
    }
    if let Some(ms) = req.timeout_ms {
        request = request.with_timeout(Duration::from_millis(ms));
    }

    let total = request.total_tasks();
    let (reporter, receiver) = report::channel();
    let progress = SharedProgress::new();
    let cancel = CancellationToken::new();

    {
        let mut s = app.inner.write().await;
        // Cancel any existing scan; its events die with the old receiver.
        if let Some(c) = s.cancel.take() {
            c.cancel();
        }
        s.status = Status {
            total,
            completed: 0,
            percentage: 0.0,
            state: "running".into(),
        };
        s.events = Some(receiver);
        s.progress = Some(progress.clone());
        s.cancel = Some(cancel.clone());
    }

    let app2 = app.clone();
    tokio::spawn(async move {
        match scanner::scan_range_with_shared(&request, reporter, cancel, progress).await {
            Ok(summary) => {
                let mut s = app2.inner.write().await;
                s.status.completed = summary.completed;
                if summary.total > 0 {
                    s.status.percentage =
                        summary.completed as f64 / summary.total as f64 * 100.0;
                }
                s.status.state = "done".into();
                s.progress = None;
                s.cancel = None;
            }
            Err(e) => {
                let mut s = app2.inner.write().await;
                s.status.state = "idle".into();
                s.events = None;
                s.progress = None;
                s.cancel = None;
                error!("scan error: {e}");
            }
        }
    });

    let s = app.inner.read().await;
    (StatusCode::ACCEPTED, Json(s.status.clone())).into_response()
}

/// Idempotent stop: cancels the running scan if there is one, does nothing
/// otherwise.
async fn post_stop(State(app): State<AppState>) -> impl IntoResponse {
    let mut s = app.inner.write().await;
    if let Some(c) = s.cancel.take() {
        c.cancel();
        (StatusCode::OK, "stopping")
    } else {
        (StatusCode::OK, "idle")
    }
}
