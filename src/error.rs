use std::net::Ipv4Addr;

use thiserror::Error;

/// Errors surfaced synchronously when a start command is validated.
///
/// Any of these means the scan is rejected before a single task is
/// dispatched; probe-level failures during a scan are reported inline as
/// `ERROR` outcomes instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),

    #[error("invalid address range: start {start} is greater than end {end}")]
    InvalidRange { start: Ipv4Addr, end: Ipv4Addr },

    #[error("invalid port spec token: {0}")]
    InvalidPortSpec(String),

    #[error("port out of range (1-65535): {0}")]
    PortOutOfRange(u32),

    #[error("invalid port range {low}-{high} (low > high)")]
    InvalidPortRange { low: u16, high: u16 },

    #[error("port spec is empty")]
    EmptyPorts,

    #[error("unknown protocol: {0} (expected TCP or UDP)")]
    InvalidProtocol(String),
}
