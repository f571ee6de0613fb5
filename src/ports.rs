use crate::error::ValidationError;

/// Parse a port specification string into a deduplicated list of ports
/// (1..=65535).
///
/// Supported comma-separated tokens:
/// - single port number: `80`
/// - inclusive range: `8000-8010`
/// - whitespace around tokens is ignored
pub fn parse_port_spec(spec: &str) -> Result<Vec<u16>, ValidationError> {
    let mut out: Vec<u16> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for raw_token in spec.split(',') {
        let token = raw_token.trim();
        if token.is_empty() {
            continue;
        }

        // Range `low-high`
        if let Some((a, b)) = token.split_once('-') {
            let low = parse_port_str(a.trim())?;
            let high = parse_port_str(b.trim())?;
            if low > high {
                return Err(ValidationError::InvalidPortRange { low, high });
            }
            for p in low..=high {
                if seen.insert(p) {
                    out.push(p);
                }
            }
            continue;
        }

        // Single number
        let p = parse_port_str(token)?;
        if seen.insert(p) {
            out.push(p);
        }
    }

    if out.is_empty() {
        return Err(ValidationError::EmptyPorts);
    }
    Ok(out)
}

/// The default port spec offered by the front-ends.
pub const DEFAULT_PORT_SPEC: &str = "21,22,23,25,53,80,161,443,3389";

fn parse_port_str(s: &str) -> Result<u16, ValidationError> {
    let val: u32 = s
        .parse::<u32>()
        .map_err(|_| ValidationError::InvalidPortSpec(s.to_string()))?;
    if val == 0 || val > 65535 {
        return Err(ValidationError::PortOutOfRange(val));
    }
    Ok(val as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_singles() {
        assert_eq!(parse_port_spec("80,443").unwrap(), vec![80, 443]);
        assert_eq!(parse_port_spec(" 22 , 80 ").unwrap(), vec![22, 80]);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_port_spec("20-22").unwrap(), vec![20, 21, 22]);
        assert_eq!(parse_port_spec("20-22,443").unwrap(), vec![20, 21, 22, 443]);
    }

    #[test]
    fn overlapping_tokens_dedup() {
        assert_eq!(parse_port_spec("20-22,21,22,23").unwrap(), vec![20, 21, 22, 23]);
    }

    #[test]
    fn invalid_tokens_error() {
        assert!(matches!(
            parse_port_spec("80,abc"),
            Err(ValidationError::InvalidPortSpec(_))
        ));
        assert!(matches!(
            parse_port_spec("100-50"),
            Err(ValidationError::InvalidPortRange { low: 100, high: 50 })
        ));
        assert!(matches!(
            parse_port_spec("0-70000"),
            Err(ValidationError::PortOutOfRange(0))
        ));
        assert!(matches!(
            parse_port_spec("65536"),
            Err(ValidationError::PortOutOfRange(65536))
        ));
        assert!(matches!(parse_port_spec(""), Err(ValidationError::EmptyPorts)));
        assert!(matches!(parse_port_spec(" , "), Err(ValidationError::EmptyPorts)));
    }

    #[test]
    fn default_spec_parses() {
        let ports = parse_port_spec(DEFAULT_PORT_SPEC).unwrap();
        assert!(ports.contains(&22) && ports.contains(&443) && ports.contains(&3389));
    }
}
