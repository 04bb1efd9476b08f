//! Algorand event ingestion engine.
//!
//! Reads blocks from an algod node, matches their transactions (including inner
//! transactions) against declarative rules and hands the actions produced by each rule's
//! callback to an [`ActionSink`](services::actions::ActionSink).
//!
//! # Flow
//! 1. Rules are compiled once when the engine starts
//! 2. Rounds are fetched one at a time, or concurrently from a fixed list
//! 3. Every outer transaction is matched against every rule
//! 4. The callback of each transaction's first matching rule runs, and the actions are
//!    ingested as one batch per round
//! 5. On stop, in-flight rounds finish and the sink is persisted

pub mod models;
pub mod services;
pub mod utils;
