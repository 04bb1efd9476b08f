use thiserror::Error;

/// Errors raised by an [`ActionSink`](super::ActionSink)
#[derive(Debug, Error)]
pub enum SinkError {
	#[error("Failed to serialize action: {0}")]
	Serialize(#[from] serde_json::Error),

	#[error("Failed to write actions: {0}")]
	Io(#[from] std::io::Error),

	#[error("Action sink error: {0}")]
	Other(String),
}
