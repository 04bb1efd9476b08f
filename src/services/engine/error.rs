use thiserror::Error;

use crate::services::{
	actions::SinkError, algod::NodeError, blockfetcher::FetchError, engine::EngineState,
};

/// Failure of a single round
#[derive(Debug, Error)]
pub enum RoundError {
	#[error(transparent)]
	Fetch(#[from] FetchError),

	#[error("Action sink rejected round {round}: {source}")]
	Sink {
		round: u64,
		#[source]
		source: SinkError,
	},
}

impl RoundError {
	/// Whether the round was interrupted by a stop request rather than failing
	pub fn is_stopped(&self) -> bool {
		matches!(self, Self::Fetch(FetchError::Stopped(_)))
	}
}

/// Errors returned by [`EventEngine`](super::EventEngine)
#[derive(Debug, Error)]
pub enum EngineError {
	/// The engine has already been started or stopped
	#[error("Engine cannot start from state {0:?}")]
	InvalidState(EngineState),

	#[error("No rules given and no rule supplier")]
	NoRules,

	#[error("Failed to load rules: {0}")]
	Rules(String),

	#[error("Failed to resolve starting round: {0}")]
	StartRound(#[source] NodeError),

	/// A round kept failing until the backoff budget ran out
	#[error("Round {round} failed {failures} times: {source}")]
	RetriesExhausted {
		round: u64,
		failures: u32,
		#[source]
		source: Box<RoundError>,
	},
}
