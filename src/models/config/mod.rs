//! Configuration loading and validation.
//!
//! Configuration files are JSON. Each loadable type implements [`ConfigLoader`], which
//! parses a file and validates the result before handing it out.

use std::path::Path;

mod app_config;
mod error;
mod rule_config;

pub use app_config::{AppConfig, Direction, EngineConfig, NodeConfig};
pub use error::ConfigError;
pub use rule_config::RuleSet;

/// Common interface for loading configuration files
pub trait ConfigLoader: Sized {
	/// Load and validate a configuration from a specific file
	fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	/// Validate the loaded configuration
	fn validate(&self) -> Result<(), ConfigError>;

	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}
}
