use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::probe;
use crate::range;
use crate::report::Reporter;
use crate::types::{PortStatus, Protocol, ReportEvent, ScanRequest, ScanSummary};

/// Jitter bounds for the pause between successive ports on one host.
const PORT_JITTER_MS: std::ops::RangeInclusive<u64> = 10..=100;

/// Run a scan to completion, emitting report events to `reporter`.
///
/// Concurrency is two-level: distinct hosts run in parallel under a
/// semaphore-bounded pool, while each host's ports are probed sequentially
/// with a small randomized delay so no single target gets burst traffic.
/// Both the address list and each host's port order are shuffled.
pub async fn scan_range(request: &ScanRequest, reporter: Reporter) -> Result<ScanSummary> {
    scan_range_with_cancel(request, reporter, CancellationToken::new()).await
}

/// Variant that accepts a `CancellationToken` for cooperative mid-scan stop.
///
/// Cancellation is checked before each host unit is dispatched and before
/// each port within a unit; probes already in flight run to their own
/// timeout. Exactly one `Complete` event is emitted, always last, whether
/// the scan ran out of work or was stopped early.
pub async fn scan_range_with_cancel(
    request: &ScanRequest,
    reporter: Reporter,
    cancel: CancellationToken,
) -> Result<ScanSummary> {
    scan_range_with_shared(request, reporter, cancel, SharedProgress::new()).await
}

/// Live counters shared between the engine and an observing front-end, so a
/// status poll can read progress without touching the event stream.
#[derive(Clone, Debug, Default)]
pub struct SharedProgress {
    completed: Arc<Mutex<u64>>,
    open_count: Arc<AtomicU64>,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> u64 {
        *self.completed.lock().expect("completed lock")
    }

    pub fn open(&self) -> u64 {
        self.open_count.load(Ordering::Relaxed)
    }
}

/// Variant that additionally publishes its counters through `shared`.
pub async fn scan_range_with_shared(
    request: &ScanRequest,
    reporter: Reporter,
    cancel: CancellationToken,
    shared: SharedProgress,
) -> Result<ScanSummary> {
    let addrs = match range::expand_range_shuffled(request.start, request.end) {
        Ok(addrs) => addrs,
        Err(e) => {
            // Orchestration failed before dispatch; the consumer still gets
            // its terminal sentinel instead of waiting forever.
            reporter.send(ReportEvent::Complete);
            return Err(e.into());
        }
    };
    let total = addrs.len() as u64 * request.ports.len() as u64;

    let session = ScanSession {
        protocol: request.protocol,
        ports: Arc::new(request.ports.clone()),
        timeout: request.timeout,
        total,
        shared: shared.clone(),
        cancel: cancel.clone(),
        reporter: reporter.clone(),
    };

    let sem = Arc::new(Semaphore::new(request.concurrency.clamp(1, 1024)));
    let mut set = JoinSet::new();

    for addr in addrs {
        if cancel.is_cancelled() {
            break;
        }
        let permit = sem
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore in scope");
        let session = session.clone();

        set.spawn(async move {
            let _permit = permit; // keep permit until the host unit completes
            session.scan_host(addr).await;
        });
    }

    // A panicked host unit must not take its siblings down with it.
    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            error!("host scan unit failed: {e}");
        }
    }

    let cancelled = cancel.is_cancelled();
    if !cancelled {
        reporter.send(ReportEvent::Progress(100.0));
    }
    reporter.send(ReportEvent::Complete);

    let completed = shared.completed();
    debug!(total, completed, cancelled, "scan finished");
    Ok(ScanSummary {
        total,
        completed,
        open: shared.open(),
        cancelled,
    })
}

/// Per-scan shared state, constructed at scan start and dropped at scan
/// end. One clone lives inside every host unit.
#[derive(Clone)]
struct ScanSession {
    protocol: Protocol,
    ports: Arc<Vec<u16>>,
    timeout: Duration,
    total: u64,
    shared: SharedProgress,
    cancel: CancellationToken,
    reporter: Reporter,
}

impl ScanSession {
    /// Probe every port of one host sequentially, in per-host shuffled
    /// order, with jitter between successive ports.
    async fn scan_host(&self, addr: Ipv4Addr) {
        let mut ports = self.ports.as_ref().clone();
        ports.shuffle(&mut rand::thread_rng());

        let mut remaining = ports.len();
        for port in ports {
            if self.cancel.is_cancelled() {
                break;
            }

            self.reporter.send(ReportEvent::Scanning { addr, port });
            let outcome = probe::probe(self.protocol, addr, port, self.timeout).await;
            if outcome.status == PortStatus::Open {
                self.shared.open_count.fetch_add(1, Ordering::Relaxed);
            }
            self.reporter.send(ReportEvent::Result {
                addr,
                port,
                protocol: self.protocol,
                outcome,
            });
            self.bump_progress();

            remaining -= 1;
            if remaining > 0 {
                let jitter = rand::thread_rng().gen_range(PORT_JITTER_MS);
                time::sleep(Duration::from_millis(jitter)).await;
            }
        }
    }

    /// Incrementing the counter and emitting the matching `Progress` event
    /// happen under one lock so the percentages any single consumer
    /// observes never regress.
    fn bump_progress(&self) {
        let mut completed = self.shared.completed.lock().expect("completed lock");
        *completed += 1;
        let pct = *completed as f64 / self.total as f64 * 100.0;
        self.reporter.send(ReportEvent::Progress(pct));
    }
}
