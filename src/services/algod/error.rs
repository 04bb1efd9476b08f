//! Node client error types.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
	/// Messages the node returns for rounds it has not produced yet
	static ref NOT_YET_PRODUCED: Regex =
		Regex::new(r"(?i)ledger does not have entry|failed to retrieve information from the ledger")
			.expect("static regex is valid");
}

/// Errors returned by a [`NodeClient`](super::NodeClient)
#[derive(Debug, Error)]
pub enum NodeError {
	/// The node answered with a non-success status
	#[error("Node request failed with status {status}: {message}")]
	Request {
		status: u16,
		message: String,
		/// Raw response body, when one was returned
		body: Option<String>,
	},

	/// The request did not reach the node or the connection failed
	#[error("Node transport error: {0}")]
	Transport(String),

	#[error("Failed to decode node response: {0}")]
	Decode(String),

	#[error("Node response for round {0} carries no block")]
	MissingBlock(u64),

	#[error("Could not get last round")]
	NoLastRound,
}

impl NodeError {
	/// Whether the error means the requested round does not exist yet
	///
	/// Checked against both the error message and the response body.
	pub fn is_not_yet_produced(&self) -> bool {
		if NOT_YET_PRODUCED.is_match(&self.to_string()) {
			return true;
		}
		match self {
			Self::Request {
				body: Some(body), ..
			} => NOT_YET_PRODUCED.is_match(body),
			_ => false,
		}
	}
}

impl From<reqwest_middleware::Error> for NodeError {
	fn from(err: reqwest_middleware::Error) -> Self {
		Self::Transport(err.to_string())
	}
}

impl From<reqwest::Error> for NodeError {
	fn from(err: reqwest::Error) -> Self {
		Self::Transport(err.to_string())
	}
}
