use range_scan_rs::error::ValidationError;
use range_scan_rs::ports::parse_port_spec;

#[test]
fn parse_singles_ranges_and_overlaps() {
    assert_eq!(parse_port_spec("80,443").expect("parse ok"), vec![80, 443]);
    assert_eq!(parse_port_spec("20-22").expect("parse ok"), vec![20, 21, 22]);
    assert_eq!(
        parse_port_spec("20-22,443").expect("parse ok"),
        vec![20, 21, 22, 443]
    );
    // Overlapping tokens dedup, first appearance wins.
    assert_eq!(
        parse_port_spec("22,20-23,80").expect("parse ok"),
        vec![22, 20, 21, 23, 80]
    );
}

#[test]
fn invalid_specs_rejected() {
    assert!(matches!(
        parse_port_spec("80,abc"),
        Err(ValidationError::InvalidPortSpec(_))
    ));
    assert!(matches!(
        parse_port_spec("100-50"),
        Err(ValidationError::InvalidPortRange { .. })
    ));
    assert!(matches!(
        parse_port_spec("0-70000"),
        Err(ValidationError::PortOutOfRange(_))
    ));
}
