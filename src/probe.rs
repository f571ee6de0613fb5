use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use tokio::net::{TcpStream, UdpSocket};
use tokio::time;

use crate::services;
use crate::types::{ProbeOutcome, Protocol};

/// Probe one (address, port) pair under the given protocol and classify the
/// socket outcome.
pub async fn probe(
    protocol: Protocol,
    addr: Ipv4Addr,
    port: u16,
    timeout: Duration,
) -> ProbeOutcome {
    match protocol {
        Protocol::Tcp => probe_tcp(addr, port, timeout).await,
        Protocol::Udp => probe_udp(addr, port, timeout).await,
    }
}

/// Single TCP connect probe.
///
/// - connect succeeds: OPEN with the service name for the port.
/// - connection actively refused: CLOSED.
/// - connect timed out: FILTERED. A dropped-packet firewall and a slow host
///   are indistinguishable here, so timeout maps to FILTERED.
/// - any other socket error: ERROR with the message.
pub async fn probe_tcp(addr: Ipv4Addr, port: u16, timeout: Duration) -> ProbeOutcome {
    let target = SocketAddr::V4(SocketAddrV4::new(addr, port));
    match time::timeout(timeout, TcpStream::connect(target)).await {
        Ok(Ok(_stream)) => ProbeOutcome::open(services::service_name(port)),
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => ProbeOutcome::closed(),
        Ok(Err(e)) => ProbeOutcome::error(e.to_string()),
        Err(_elapsed) => ProbeOutcome::filtered(),
    }
}

/// Single UDP probe: send one empty datagram and wait for any response.
///
/// Silence is the common case for both open and filtered UDP ports, so the
/// timeout path conservatively reports FILTERED. A connection-reset style
/// error means the OS saw an ICMP port-unreachable, which is the one signal
/// that the port is CLOSED.
pub async fn probe_udp(addr: Ipv4Addr, port: u16, timeout: Duration) -> ProbeOutcome {
    match udp_exchange(addr, port, timeout).await {
        Ok(Some(_len)) => ProbeOutcome::open(services::service_name(port)),
        Ok(None) => ProbeOutcome::filtered(),
        Err(e)
            if e.kind() == io::ErrorKind::ConnectionRefused
                || e.kind() == io::ErrorKind::ConnectionReset =>
        {
            ProbeOutcome::closed()
        }
        Err(e) => ProbeOutcome::error(e.to_string()),
    }
}

/// Returns `Ok(Some(n))` on a response of `n` bytes, `Ok(None)` on timeout.
async fn udp_exchange(addr: Ipv4Addr, port: u16, timeout: Duration) -> io::Result<Option<usize>> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket
        .connect(SocketAddr::V4(SocketAddrV4::new(addr, port)))
        .await?;
    socket.send(&[]).await?;

    let mut buf = [0u8; 1024];
    match time::timeout(timeout, socket.recv(&mut buf)).await {
        Ok(Ok(n)) => Ok(Some(n)),
        Ok(Err(e)) => Err(e),
        Err(_elapsed) => Ok(None),
    }
}
