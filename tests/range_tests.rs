use std::collections::HashSet;
use std::net::Ipv4Addr;

use range_scan_rs::error::ValidationError;
use range_scan_rs::range::{expand_range, expand_range_shuffled};

#[test]
fn expansion_covers_exactly_the_closed_interval() {
    let start = Ipv4Addr::new(10, 0, 0, 250);
    let end = Ipv4Addr::new(10, 0, 1, 5);
    let addrs = expand_range(start, end).expect("valid range");

    // end_int - start_int + 1 elements, in numeric order.
    assert_eq!(addrs.len(), 12);
    assert_eq!(addrs.first(), Some(&start));
    assert_eq!(addrs.last(), Some(&end));
}

#[test]
fn shuffled_expansion_is_a_permutation_of_the_canonical_range() {
    let start = Ipv4Addr::new(172, 16, 0, 0);
    let end = Ipv4Addr::new(172, 16, 1, 255);
    let canonical: HashSet<Ipv4Addr> =
        expand_range(start, end).expect("valid range").into_iter().collect();
    let shuffled = expand_range_shuffled(start, end).expect("valid range");

    assert_eq!(shuffled.len(), 512);
    let unique: HashSet<Ipv4Addr> = shuffled.iter().copied().collect();
    assert_eq!(unique, canonical);
}

#[test]
fn reversed_range_is_rejected() {
    let err = expand_range(Ipv4Addr::new(192, 168, 1, 10), Ipv4Addr::new(192, 168, 1, 1));
    assert!(matches!(err, Err(ValidationError::InvalidRange { .. })));
}
