//! Library crate for range-scan-rs exposing reusable modules.
pub mod error;
pub mod ports;
pub mod probe;
pub mod range;
pub mod report;
pub mod scanner;
pub mod server;
pub mod services;
pub mod types;
