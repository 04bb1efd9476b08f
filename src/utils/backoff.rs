//! Exponential backoff for retrying failed units of work.
//!
//! The delay grows with the square of the consecutive failure count and is capped at a
//! configurable maximum. Once the failure budget is spent the caller is told to give up.
//! There is no jitter: the delay for a given failure count is deterministic.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for backoff behavior
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
	/// Base delay in milliseconds, multiplied by the squared failure count
	pub multiplier_ms: u64,

	/// Upper bound on a single delay in milliseconds
	pub max_wait_ms: u64,

	/// Number of consecutive failures tolerated before giving up
	pub max_failures: u32,
}

impl Default for BackoffConfig {
	/// Creates a default backoff configuration with:
	/// - 1 second multiplier
	/// - 60 seconds maximum wait
	/// - 10 maximum failures
	fn default() -> Self {
		Self {
			multiplier_ms: 1_000,
			max_wait_ms: 60_000,
			max_failures: 10,
		}
	}
}

/// Retry context tracking consecutive failures
///
/// Each instance is scoped to one retry context. Call [`ExpoBackoff::reset`] after every
/// successful unit of work so that transient failures do not eat into the budget of a
/// later, unrelated failure streak.
#[derive(Debug, Clone)]
pub struct ExpoBackoff {
	config: BackoffConfig,
	failures: u32,
}

impl ExpoBackoff {
	/// Creates a new backoff with custom configuration
	pub fn new(config: BackoffConfig) -> Self {
		Self {
			config,
			failures: 0,
		}
	}

	/// Creates a new backoff with default configuration
	pub fn with_default_config() -> Self {
		Self::new(BackoffConfig::default())
	}

	pub fn config(&self) -> &BackoffConfig {
		&self.config
	}

	/// Consecutive failures recorded since the last reset
	pub fn failures(&self) -> u32 {
		self.failures
	}

	/// Delay applied after the given number of consecutive failures
	///
	/// Computes `min(failures² × multiplier, max_wait)`, saturating on overflow.
	pub fn delay_for(&self, failures: u32) -> Duration {
		let squared = u64::from(failures).saturating_mul(u64::from(failures));
		let delay = squared.saturating_mul(self.config.multiplier_ms);
		Duration::from_millis(delay.min(self.config.max_wait_ms))
	}

	/// Records a failure and waits before the next attempt
	///
	/// # Returns
	/// * `true` - after sleeping; the caller may retry
	/// * `false` - immediately, once the failure budget is exhausted
	pub async fn should_retry(&mut self) -> bool {
		self.failures = self.failures.saturating_add(1);
		if self.failures > self.config.max_failures {
			return false;
		}

		let delay = self.delay_for(self.failures);
		tracing::debug!(
			failures = self.failures,
			delay_ms = delay.as_millis() as u64,
			"Backing off before retry"
		);
		tokio::time::sleep(delay).await;
		true
	}

	/// Clears the failure counter
	pub fn reset(&mut self) {
		self.failures = 0;
	}
}

impl Default for ExpoBackoff {
	fn default() -> Self {
		Self::with_default_config()
	}
}
