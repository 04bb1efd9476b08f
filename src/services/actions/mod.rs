//! Destinations for the actions emitted by rule callbacks.
//!
//! The engine hands each round's actions to an [`ActionSink`] as one batch. Calls to
//! `ingest` are serialized by the engine, so implementations need no locking of their
//! own for ingestion.

use async_trait::async_trait;

mod error;
mod json_lines;

pub use error::SinkError;
pub use json_lines::JsonLinesSink;

#[async_trait]
pub trait ActionSink: Send + Sync {
	/// The action type rule callbacks produce
	type Action: Send + 'static;

	/// Accepts the actions of one round
	async fn ingest(&self, actions: Vec<Self::Action>) -> Result<(), SinkError>;

	/// Persists the current backlog
	async fn persist(&self) -> Result<(), SinkError>;

	/// Resolves once all pending work has completed
	async fn await_completion(&self) -> Result<(), SinkError>;

	/// Called after every processed round
	async fn round_processed(&self, _round: u64, _txn_count: usize, _match_count: usize) {}
}
