//! Node client interface.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::{models::Block, services::algod::error::NodeError};

/// Subset of the node status the engine relies on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
	#[serde(rename = "last-round")]
	pub last_round: u64,
}

/// Access to an Algorand node
///
/// Implementations must report rounds the node has not produced yet with an error for
/// which [`NodeError::is_not_yet_produced`] holds.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NodeClient: Send + Sync {
	/// Retrieves the block of a round
	async fn block(&self, round: u64) -> Result<Block, NodeError>;

	/// Retrieves the current node status
	async fn status(&self) -> Result<NodeStatus, NodeError>;

	/// Waits until the node has produced the round after `round`
	async fn status_after_block(&self, round: u64) -> Result<NodeStatus, NodeError>;
}
