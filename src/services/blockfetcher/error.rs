use thiserror::Error;

use crate::services::algod::NodeError;

/// Errors returned by [`BlockFetcher`](super::BlockFetcher)
#[derive(Debug, Error)]
pub enum FetchError {
	#[error("Fetching round {round} timed out after {timeout_ms}ms")]
	Timeout { round: u64, timeout_ms: u64 },

	#[error(transparent)]
	Node(#[from] NodeError),

	/// The engine stopped while the fetcher was waiting for the round
	#[error("Stopped while waiting for round {0}")]
	Stopped(u64),
}
