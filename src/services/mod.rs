//! Core services of the event engine.
//!
//! - `algod`: Node client for blocks and status
//! - `blockfetcher`: Fetching a round, waiting for it when it is not produced yet
//! - `filter`: Rule compilation and transaction matching
//! - `actions`: Sinks receiving the actions rule callbacks emit
//! - `engine`: Round processing, scheduling and lifecycle

pub mod actions;
pub mod algod;
pub mod blockfetcher;
pub mod engine;
pub mod filter;
