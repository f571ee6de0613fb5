use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::{ports, range};

/// Default cap on concurrently scanned hosts.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Default per-probe socket timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Transport protocol a scan probes with.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("TCP"),
            Protocol::Udp => f.write_str("UDP"),
        }
    }
}

impl FromStr for Protocol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            other => Err(ValidationError::InvalidProtocol(other.to_string())),
        }
    }
}

/// Classification of a single (address, port) probe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortStatus {
    Open,
    Closed,
    Filtered,
    Error,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Open => f.write_str("OPEN"),
            PortStatus::Closed => f.write_str("CLOSED"),
            PortStatus::Filtered => f.write_str("FILTERED"),
            PortStatus::Error => f.write_str("ERROR"),
        }
    }
}

/// Outcome of one probe: a status plus a service name (open ports only)
/// or an error detail (error outcomes only).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: PortStatus,
    pub service: Option<String>,
    pub detail: Option<String>,
}

impl ProbeOutcome {
    pub fn open(service: impl Into<String>) -> Self {
        Self {
            status: PortStatus::Open,
            service: Some(service.into()),
            detail: None,
        }
    }

    pub fn closed() -> Self {
        Self {
            status: PortStatus::Closed,
            service: None,
            detail: None,
        }
    }

    pub fn filtered() -> Self {
        Self {
            status: PortStatus::Filtered,
            service: None,
            detail: None,
        }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: PortStatus::Error,
            service: None,
            detail: Some(detail.into()),
        }
    }
}

/// A validated, immutable description of one scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
    pub ports: Vec<u16>,
    pub protocol: Protocol,
    pub concurrency: usize,
    pub timeout: Duration,
}

impl ScanRequest {
    /// Validate raw front-end input (dotted-quad strings, a port spec string
    /// and a protocol name) into a request. Any failure here means the scan
    /// never starts and zero tasks are dispatched.
    pub fn parse(
        start: &str,
        end: &str,
        port_spec: &str,
        protocol: &str,
    ) -> Result<Self, ValidationError> {
        let start_ip = range::parse_ipv4(start)?;
        let end_ip = range::parse_ipv4(end)?;
        if u32::from(start_ip) > u32::from(end_ip) {
            return Err(ValidationError::InvalidRange {
                start: start_ip,
                end: end_ip,
            });
        }
        let ports = ports::parse_port_spec(port_spec)?;
        let protocol = protocol.parse()?;
        Ok(Self {
            start: start_ip,
            end: end_ip,
            ports,
            protocol,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total number of (address, port) tasks this request expands to.
    pub fn total_tasks(&self) -> u64 {
        let hosts = u64::from(u32::from(self.end)) - u64::from(u32::from(self.start)) + 1;
        hosts * self.ports.len() as u64
    }
}

/// One event on the report stream from the engine to its consumer.
///
/// Kept structured internally; `Display` produces the line-oriented wire
/// format the front-end consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    /// Overall completion percentage in [0, 100].
    Progress(f64),
    /// The (address, port) pair a worker is about to probe.
    Scanning { addr: Ipv4Addr, port: u16 },
    /// Classified outcome for one probe.
    Result {
        addr: Ipv4Addr,
        port: u16,
        protocol: Protocol,
        outcome: ProbeOutcome,
    },
    /// Terminal sentinel, emitted exactly once per scan, always last.
    Complete,
}

/// Terminal sentinel line marking the end of a scan's report stream.
pub const COMPLETE_SENTINEL: &str = "<<<SCAN COMPLETE>>>";

impl fmt::Display for ReportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportEvent::Progress(pct) => write!(f, "PROGRESS:{pct:.1}"),
            ReportEvent::Scanning { addr, port } => write!(f, "SCANNING:{addr}:{port}"),
            ReportEvent::Result {
                addr,
                port,
                protocol,
                outcome,
            } => match outcome.status {
                PortStatus::Open => {
                    let service = outcome.service.as_deref().unwrap_or("unknown");
                    write!(f, "[+] {addr}:{port} {protocol} OPEN ({service})")
                }
                PortStatus::Error => {
                    let detail = outcome.detail.as_deref().unwrap_or("unknown error");
                    write!(f, "[-] {addr}:{port} {protocol} ERROR ({detail})")
                }
                status => write!(f, "[-] {addr}:{port} {protocol} {status}"),
            },
            ReportEvent::Complete => f.write_str(COMPLETE_SENTINEL),
        }
    }
}

/// Aggregate counters returned once a scan finishes.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: u64,
    pub completed: u64,
    pub open: u64,
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_parses_case_insensitively() {
        assert_eq!("tcp".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert_eq!("UDP".parse::<Protocol>().unwrap(), Protocol::Udp);
        assert!("icmp".parse::<Protocol>().is_err());
    }

    #[test]
    fn request_parse_validates_everything() {
        let req = ScanRequest::parse("10.0.0.1", "10.0.0.4", "80,443", "TCP").unwrap();
        assert_eq!(req.total_tasks(), 8);

        assert!(ScanRequest::parse("10.0.0.9", "10.0.0.1", "80", "TCP").is_err());
        assert!(ScanRequest::parse("not-an-ip", "10.0.0.1", "80", "TCP").is_err());
        assert!(ScanRequest::parse("10.0.0.1", "10.0.0.2", "80,abc", "TCP").is_err());
        assert!(ScanRequest::parse("10.0.0.1", "10.0.0.2", "80", "SCTP").is_err());
    }

    #[test]
    fn wire_format_matches_consumer_contract() {
        let addr = Ipv4Addr::new(192, 168, 1, 7);
        assert_eq!(ReportEvent::Progress(42.0).to_string(), "PROGRESS:42.0");
        assert_eq!(
            ReportEvent::Scanning { addr, port: 22 }.to_string(),
            "SCANNING:192.168.1.7:22"
        );
        assert_eq!(
            ReportEvent::Result {
                addr,
                port: 22,
                protocol: Protocol::Tcp,
                outcome: ProbeOutcome::open("ssh"),
            }
            .to_string(),
            "[+] 192.168.1.7:22 TCP OPEN (ssh)"
        );
        assert_eq!(
            ReportEvent::Result {
                addr,
                port: 81,
                protocol: Protocol::Udp,
                outcome: ProbeOutcome::filtered(),
            }
            .to_string(),
            "[-] 192.168.1.7:81 UDP FILTERED"
        );
        assert_eq!(
            ReportEvent::Result {
                addr,
                port: 81,
                protocol: Protocol::Tcp,
                outcome: ProbeOutcome::error("no route to host"),
            }
            .to_string(),
            "[-] 192.168.1.7:81 TCP ERROR (no route to host)"
        );
        assert_eq!(ReportEvent::Complete.to_string(), COMPLETE_SENTINEL);
    }
}
