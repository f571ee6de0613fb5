use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use range_scan_rs::types::{
    PortStatus, Protocol, ReportEvent, ScanRequest, ScanSummary, DEFAULT_CONCURRENCY,
};
use range_scan_rs::{ports, report, scanner, server};

/// range-scan-rs — Async IPv4-range TCP/UDP port scanner with live progress reporting.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "range-scan-rs",
    version,
    about = "Async IPv4-range TCP/UDP port scanner with live progress reporting and a tiny embedded web UI.",
    long_about = None
)]
struct Cli {
    /// First address of the IPv4 range (inclusive).
    #[arg(long, required_unless_present = "serve_ui")]
    start: Option<String>,

    /// Last address of the IPv4 range (inclusive).
    #[arg(long, required_unless_present = "serve_ui")]
    end: Option<String>,

    /// Port spec: comma-separated ports and low-high ranges (e.g. 22,80,8000-8010).
    #[arg(long, default_value = ports::DEFAULT_PORT_SPEC)]
    ports: String,

    /// Probe protocol: tcp or udp.
    #[arg(long, default_value = "tcp")]
    protocol: String,

    /// Max concurrently scanned hosts.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Per-probe socket timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 1000)]
    timeout_ms: u64,

    /// Write the summary and all probe results as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Serve the HTTP scan API instead of scanning directly.
    #[arg(long = "serve-ui", default_value_t = false)]
    serve_ui: bool,

    /// Bind address for the HTTP scan API.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.serve_ui {
        println!("Scan API starting at http://{} (Ctrl+C to stop)", cli.bind);
        server::spawn_server(&cli.bind).await?;
        return Ok(());
    }

    // clap guarantees these are present when --serve-ui is absent.
    let start = cli.start.as_deref().unwrap_or_default();
    let end = cli.end.as_deref().unwrap_or_default();
    let request = ScanRequest::parse(start, end, &cli.ports, &cli.protocol)
        .context("invalid scan request")?
        .with_concurrency(cli.concurrency)
        .with_timeout(Duration::from_millis(cli.timeout_ms));

    println!("range-scan-rs configuration:");
    println!("  range        : {} - {}", request.start, request.end);
    println!("  ports        : {} port(s)", request.ports.len());
    println!("  protocol     : {}", request.protocol);
    println!("  concurrency  : {}", request.concurrency);
    println!("  timeout_ms   : {}", cli.timeout_ms);
    println!(
        "  output       : {}",
        cli.output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );
    println!("  total tasks  : {}", request.total_tasks());

    let (reporter, mut receiver) = report::channel();
    let cancel = CancellationToken::new();

    // Ctrl-C requests a cooperative stop; in-flight probes finish naturally.
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        cancel_ctrlc.cancel();
    });

    let scan = tokio::spawn(async move {
        scanner::scan_range_with_cancel(&request, reporter, cancel).await
    });

    // Poll the report channel the way a GUI would: drain on a fixed cadence
    // until the terminal sentinel arrives.
    let mut results: Vec<ResultEntry> = Vec::new();
    let mut ticker = time::interval(Duration::from_millis(100));
    'drain: loop {
        ticker.tick().await;
        for event in receiver.drain() {
            if let Some(entry) = ResultEntry::from_event(&event) {
                results.push(entry);
            }
            let done = event == ReportEvent::Complete;
            println!("{event}");
            if done {
                break 'drain;
            }
        }
    }

    let summary = scan.await.context("scan task panicked")??;
    println!(
        "\nScanned {}/{} task(s), {} open{}",
        summary.completed,
        summary.total,
        summary.open,
        if summary.cancelled { " (cancelled)" } else { "" }
    );

    if let Some(path) = cli.output.as_deref() {
        let scan_report = ScanReport { summary, results };
        if let Err(e) = write_report_json(path, &scan_report) {
            eprintln!("Failed to write JSON to {}: {}", path.display(), e);
        } else {
            println!("Wrote JSON results to {}", path.display());
        }
    }
    Ok(())
}

/// One probe result as it lands in the JSON report.
#[derive(Debug, Clone, Serialize)]
struct ResultEntry {
    addr: String,
    port: u16,
    protocol: Protocol,
    status: PortStatus,
    service: Option<String>,
    detail: Option<String>,
}

impl ResultEntry {
    fn from_event(event: &ReportEvent) -> Option<Self> {
        match event {
            ReportEvent::Result {
                addr,
                port,
                protocol,
                outcome,
            } => Some(Self {
                addr: addr.to_string(),
                port: *port,
                protocol: *protocol,
                status: outcome.status,
                service: outcome.service.clone(),
                detail: outcome.detail.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ScanReport {
    summary: ScanSummary,
    results: Vec<ResultEntry>,
}

fn write_report_json(path: &std::path::Path, scan_report: &ScanReport) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, scan_report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use range_scan_rs::types::ProbeOutcome;
    use std::net::Ipv4Addr;

    #[test]
    fn json_report_carries_results_and_summary() {
        let event = ReportEvent::Result {
            addr: Ipv4Addr::new(10, 0, 0, 1),
            port: 22,
            protocol: Protocol::Tcp,
            outcome: ProbeOutcome::open("ssh"),
        };
        let entry = ResultEntry::from_event(&event).expect("result event");
        let scan_report = ScanReport {
            summary: ScanSummary {
                total: 4,
                completed: 4,
                open: 1,
                cancelled: false,
            },
            results: vec![entry],
        };

        let json = serde_json::to_value(&scan_report).expect("serialize");
        assert_eq!(json["summary"]["total"], 4);
        assert_eq!(json["results"][0]["addr"], "10.0.0.1");
        assert_eq!(json["results"][0]["protocol"], "TCP");
        assert_eq!(json["results"][0]["status"], "OPEN");
        assert_eq!(json["results"][0]["service"], "ssh");
    }

    #[test]
    fn non_result_events_do_not_become_entries() {
        assert!(ResultEntry::from_event(&ReportEvent::Progress(50.0)).is_none());
        assert!(ResultEntry::from_event(&ReportEvent::Complete).is_none());
    }
}

