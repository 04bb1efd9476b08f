use thiserror::Error;

/// Errors raised while compiling rules
#[derive(Debug, Error)]
pub enum FilterError {
	/// A rule field could not be compiled; the rule is dropped
	#[error("Rule {rule} has invalid {field}: {reason}")]
	InvalidField {
		rule: usize,
		field: &'static str,
		reason: String,
	},
}

impl FilterError {
	pub fn invalid_field(rule: usize, field: &'static str, reason: impl Into<String>) -> Self {
		Self::InvalidField {
			rule,
			field,
			reason: reason.into(),
		}
	}
}
