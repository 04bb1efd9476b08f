//! Application configuration.
//!
//! Loaded from a single JSON file:
//!
//! ```json
//! {
//!   "node": { "url": "http://localhost:4001", "token": "..." },
//!   "engine": { "threads": 4, "direction": "forward", "backoff": { "max_failures": 5 } },
//!   "rules_path": "config/rules.json",
//!   "actions_path": "actions.jsonl"
//! }
//! ```
//!
//! `ALGOD_URL` and `ALGOD_TOKEN` override the node section when set.

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::{
	models::config::{error::ConfigError, ConfigLoader},
	utils::backoff::BackoffConfig,
};

/// Direction of a sequential scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	#[default]
	Forward,
	Backward,
}

/// Connection settings for the Algorand node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
	pub url: String,
	pub token: Option<String>,
	/// Timeout of a single HTTP request; must outlast the node's wait-for-block poll
	pub request_timeout_ms: u64,
	/// Retries for transient HTTP failures, below the engine's own backoff
	pub max_retries: u32,
}

impl Default for NodeConfig {
	fn default() -> Self {
		Self {
			url: "http://localhost:4001".to_string(),
			token: None,
			request_timeout_ms: 70_000,
			max_retries: 2,
		}
	}
}

impl NodeConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	/// Applies `ALGOD_URL` / `ALGOD_TOKEN` from the environment
	pub fn apply_env(&mut self) {
		if let Ok(url) = std::env::var("ALGOD_URL") {
			self.url = url;
		}
		if let Ok(token) = std::env::var("ALGOD_TOKEN") {
			self.token = Some(token);
		}
	}
}

/// Scheduling settings of the event engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	/// Concurrent workers when scanning a fixed list of rounds
	pub threads: usize,
	pub direction: Direction,
	/// Timeout of a single block fetch
	pub fetch_timeout_ms: u64,
	pub backoff: BackoffConfig,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			threads: 1,
			direction: Direction::Forward,
			fetch_timeout_ms: 20_000,
			backoff: BackoffConfig::default(),
		}
	}
}

impl EngineConfig {
	pub fn fetch_timeout(&self) -> Duration {
		Duration::from_millis(self.fetch_timeout_ms)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.threads == 0 {
			return Err(ConfigError::validation_error(
				"engine.threads must be at least 1",
			));
		}
		if self.fetch_timeout_ms == 0 {
			return Err(ConfigError::validation_error(
				"engine.fetch_timeout_ms must be greater than 0",
			));
		}
		if self.backoff.max_wait_ms < self.backoff.multiplier_ms {
			return Err(ConfigError::validation_error(format!(
				"engine.backoff.max_wait_ms ({}) is below multiplier_ms ({})",
				self.backoff.max_wait_ms, self.backoff.multiplier_ms
			)));
		}
		Ok(())
	}
}

/// Top-level configuration of the binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
	pub node: NodeConfig,
	pub engine: EngineConfig,
	pub rules_path: Option<PathBuf>,
	/// Output file for emitted actions; stdout when unset
	pub actions_path: Option<PathBuf>,
}

impl ConfigLoader for AppConfig {
	fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
		if !Self::is_json_file(path) {
			return Err(ConfigError::file_error(format!(
				"expected a .json config file, got {}",
				path.display()
			)));
		}
		let file = std::fs::File::open(path)?;
		let config: AppConfig = serde_json::from_reader(file)?;

		config.validate()?;

		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		Url::parse(&self.node.url).map_err(|e| {
			ConfigError::validation_error(format!("invalid node url {}: {}", self.node.url, e))
		})?;
		if self.node.request_timeout_ms == 0 {
			return Err(ConfigError::validation_error(
				"node.request_timeout_ms must be greater than 0",
			));
		}
		self.engine.validate()
	}
}
