//! Block retrieval by round.
//!
//! [`BlockFetcher`] wraps a [`NodeClient`] with the per-attempt timeout and the
//! wait-for-round handling rounds beyond the chain head need.

mod error;

pub use error::FetchError;

use std::{sync::Arc, time::Duration};
use tokio::sync::watch;

use crate::{models::Block, services::algod::NodeClient};

/// Fetches one block at a time from the node
#[derive(Clone)]
pub struct BlockFetcher {
	client: Arc<dyn NodeClient>,
	timeout: Duration,
	running: Option<watch::Receiver<bool>>,
}

impl BlockFetcher {
	pub fn new(client: Arc<dyn NodeClient>, timeout: Duration) -> Self {
		Self {
			client,
			timeout,
			running: None,
		}
	}

	/// Stops waiting for unproduced rounds once `running` turns false
	pub fn with_running(mut self, running: watch::Receiver<bool>) -> Self {
		self.running = Some(running);
		self
	}

	pub fn client(&self) -> &Arc<dyn NodeClient> {
		&self.client
	}

	/// Fetches the block of `round`
	///
	/// Each request to the node is bounded by the fetcher's timeout. When the node reports
	/// that the round does not exist yet, the fetcher waits for it to be produced and asks
	/// again. Waiting does not count as a failure. Any other node error is returned as is.
	#[tracing::instrument(skip(self), level = "debug")]
	pub async fn fetch(&self, round: u64) -> Result<Block, FetchError> {
		loop {
			if !self.is_running() {
				return Err(FetchError::Stopped(round));
			}

			let error = match tokio::time::timeout(self.timeout, self.client.block(round)).await {
				Err(_) => {
					return Err(FetchError::Timeout {
						round,
						timeout_ms: self.timeout.as_millis() as u64,
					})
				}
				Ok(Ok(block)) => return Ok(block),
				Ok(Err(e)) => e,
			};

			if !error.is_not_yet_produced() {
				return Err(error.into());
			}

			tracing::debug!(round, "Round not produced yet, waiting for it");
			self.client
				.status_after_block(round.saturating_sub(1))
				.await?;
		}
	}

	fn is_running(&self) -> bool {
		self.running.as_ref().map_or(true, |rx| *rx.borrow())
	}
}
