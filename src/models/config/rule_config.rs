//! Rule file loading.
//!
//! A rule file is a JSON array of rule specs. Each entry is validated for shape only;
//! whether a rule can be compiled is decided by the matcher, which drops and logs
//! entries it cannot use.

use std::path::Path;

use crate::models::{
	config::{error::ConfigError, ConfigLoader},
	RuleSpec,
};

/// Ordered list of rule specs read from a file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet(pub Vec<RuleSpec>);

impl RuleSet {
	pub fn into_inner(self) -> Vec<RuleSpec> {
		self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl ConfigLoader for RuleSet {
	fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		if !Self::is_json_file(path) {
			return Err(ConfigError::file_error(format!(
				"expected a .json rule file, got {}",
				path.display()
			)));
		}
		let file = std::fs::File::open(path)?;
		let specs: Vec<RuleSpec> = serde_json::from_reader(file)?;
		let rules = RuleSet(specs);

		rules.validate()?;

		tracing::debug!(count = rules.len(), path = %path.display(), "Loaded rules");
		Ok(rules)
	}

	/// Rule files are checked for shape only
	///
	/// A spec the matcher cannot compile, such as a non-numeric `assetId`, is dropped and
	/// logged when the engine starts, so one bad entry never keeps the others from loading.
	/// `chain` is descriptive and not checked.
	fn validate(&self) -> Result<(), ConfigError> {
		Ok(())
	}
}
