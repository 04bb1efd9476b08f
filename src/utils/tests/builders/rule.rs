//! Test helper utilities for rules
//!
//! - `RuleSpecBuilder`: Builder for creating test RuleSpec instances

use crate::models::{AddressList, NoteEncoding, NoteRuleSpec, NumericId, RuleSpec};

/// Builder for creating test RuleSpec instances
#[derive(Default)]
pub struct RuleSpecBuilder {
	spec: RuleSpec,
}

impl RuleSpecBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn label(mut self, label: &str) -> Self {
		self.spec.label = Some(label.to_string());
		self
	}

	pub fn kind(mut self, kind: &str) -> Self {
		self.spec.kind = Some(kind.to_string());
		self
	}

	pub fn sender(mut self, address: &str) -> Self {
		self.spec.sender = Some(AddressList::One(address.to_string()));
		self
	}

	pub fn senders(mut self, addresses: &[&str]) -> Self {
		self.spec.sender = Some(AddressList::Many(
			addresses.iter().map(|a| a.to_string()).collect(),
		));
		self
	}

	pub fn receiver(mut self, address: &str) -> Self {
		self.spec.receiver = Some(AddressList::One(address.to_string()));
		self
	}

	pub fn asset_id(mut self, asset_id: u64) -> Self {
		self.spec.asset_id = Some(NumericId::Number(asset_id));
		self
	}

	pub fn asset_id_text(mut self, asset_id: &str) -> Self {
		self.spec.asset_id = Some(NumericId::Text(asset_id.to_string()));
		self
	}

	pub fn app_id(mut self, app_id: u64) -> Self {
		self.spec.app_id = Some(NumericId::Number(app_id));
		self
	}

	pub fn args_contains(mut self, arg: &str) -> Self {
		self.spec.args_contains = Some(arg.to_string());
		self
	}

	pub fn amount_equals(mut self, amount: u64) -> Self {
		self.spec.amount_equals = Some(amount);
		self
	}

	pub fn amount_gte(mut self, amount: u64) -> Self {
		self.spec.amount_gte = Some(amount);
		self
	}

	pub fn amount_lte(mut self, amount: u64) -> Self {
		self.spec.amount_lte = Some(amount);
		self
	}

	pub fn has_field(mut self, path: &str) -> Self {
		self.spec.has_field = Some(path.to_string());
		self
	}

	pub fn note(mut self, note: NoteRuleSpec) -> Self {
		self.spec.note = Some(note);
		self
	}

	pub fn note_exact(self, encoding: NoteEncoding, exact: &str) -> Self {
		self.note(NoteRuleSpec {
			encoding: Some(encoding),
			exact: Some(exact.to_string()),
			..Default::default()
		})
	}

	pub fn inner(mut self, inner: bool) -> Self {
		self.spec.inner = inner;
		self
	}

	pub fn unrecognized(mut self, key: &str, value: serde_json::Value) -> Self {
		self.spec.unrecognized.insert(key.to_string(), value);
		self
	}

	pub fn build(self) -> RuleSpec {
		self.spec
	}
}
