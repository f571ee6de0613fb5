use std::net::Ipv4Addr;

use rand::seq::SliceRandom;

use crate::error::ValidationError;

/// Parse a dotted-quad string into an `Ipv4Addr`.
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr, ValidationError> {
    s.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| ValidationError::InvalidAddress(s.trim().to_string()))
}

/// Expand an inclusive `[start, end]` IPv4 range into every address it
/// covers, in numeric order, via the 32-bit integer representation.
///
/// Errors if `start > end` as unsigned 32-bit integers.
pub fn expand_range(start: Ipv4Addr, end: Ipv4Addr) -> Result<Vec<Ipv4Addr>, ValidationError> {
    let lo = u32::from(start);
    let hi = u32::from(end);
    if lo > hi {
        return Err(ValidationError::InvalidRange { start, end });
    }
    Ok((lo..=hi).map(Ipv4Addr::from).collect())
}

/// `expand_range`, then a uniform shuffle. The engine scans addresses in
/// this randomized order so probe load spreads across the range instead of
/// walking neighboring hosts sequentially.
pub fn expand_range_shuffled(
    start: Ipv4Addr,
    end: Ipv4Addr,
) -> Result<Vec<Ipv4Addr>, ValidationError> {
    let mut addrs = expand_range(start, end)?;
    addrs.shuffle(&mut rand::thread_rng());
    Ok(addrs)
}
