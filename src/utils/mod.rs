//! Utility modules for common functionality.
//!
//! - backoff: Exponential backoff for failing rounds
//! - encoding: Transaction id and address encoding
//! - http: Retrying HTTP client construction
//! - logging: Logging utilities
//! - tests: Builders for test fixtures

pub mod backoff;
pub mod encoding;
pub mod http;
pub mod logging;

pub use backoff::{BackoffConfig, ExpoBackoff};
pub use encoding::{AlgorandCodec, TransactionCodec};
