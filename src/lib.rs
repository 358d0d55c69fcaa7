//! Library crate for camscan: a streaming TCP connect scanner for network camera ports.
pub mod config;
pub mod engine;
pub mod logging;
pub mod pages;
pub mod ports;
pub mod probe;
pub mod report;
pub mod server;
pub mod targets;
pub mod types;
