//! Field predicates.
//!
//! Each recognized rule field compiles into one [`FieldPredicate`] variant. A rule
//! matches a transaction when all of its predicates hold.

use crate::{
	models::{AddressList, RuleSpec, Transaction},
	services::filter::{error::FilterError, note::NotePredicate},
	utils::encoding::TransactionCodec,
};

#[derive(Debug, Clone)]
pub enum FieldPredicate {
	/// Transaction type equals the value
	Kind(String),
	/// Encoded sender is one of the addresses
	Sender(Vec<String>),
	/// Encoded receiver, or asset receiver, is one of the addresses
	Receiver(Vec<String>),
	/// Asset transfer target or any referenced asset equals the id
	AssetId(u64),
	AppId(u64),
	/// Any application argument equals the bytes
	ArgsContains(Vec<u8>),
	AmountEquals(u64),
	AmountGte(u64),
	AmountLte(u64),
	/// Dotted path exists in the raw transaction
	HasField(String),
	Note(NotePredicate),
	/// Rule key with no known meaning; always satisfied
	Unrecognized(String),
}

impl FieldPredicate {
	/// Compiles the criteria of a rule spec, in a fixed field order
	pub fn compile_all(index: usize, spec: &RuleSpec) -> Result<Vec<Self>, FilterError> {
		let mut predicates = Vec::new();

		if let Some(kind) = &spec.kind {
			predicates.push(Self::Kind(kind.clone()));
		}
		if let Some(sender) = &spec.sender {
			predicates.push(Self::Sender(addresses(sender)));
		}
		if let Some(receiver) = &spec.receiver {
			predicates.push(Self::Receiver(addresses(receiver)));
		}
		if let Some(asset_id) = &spec.asset_id {
			let id = asset_id
				.resolve()
				.map_err(|reason| FilterError::invalid_field(index, "assetId", reason))?;
			predicates.push(Self::AssetId(id));
		}
		if let Some(app_id) = &spec.app_id {
			let id = app_id
				.resolve()
				.map_err(|reason| FilterError::invalid_field(index, "appId", reason))?;
			predicates.push(Self::AppId(id));
		}
		if let Some(arg) = &spec.args_contains {
			predicates.push(Self::ArgsContains(arg.as_bytes().to_vec()));
		}
		if let Some(amount) = spec.amount_equals {
			predicates.push(Self::AmountEquals(amount));
		}
		if let Some(amount) = spec.amount_gte {
			predicates.push(Self::AmountGte(amount));
		}
		if let Some(amount) = spec.amount_lte {
			predicates.push(Self::AmountLte(amount));
		}
		if let Some(path) = &spec.has_field {
			predicates.push(Self::HasField(path.clone()));
		}
		if let Some(note) = &spec.note {
			let note = NotePredicate::compile(note);
			if let Some(reason) = note.unmatchable_reason() {
				tracing::warn!(rule = index, reason, "Note criteria can never match");
			}
			predicates.push(Self::Note(note));
		}
		for key in spec.unrecognized.keys() {
			tracing::warn!(rule = index, field = %key, "Unrecognized rule field, treating as satisfied");
			predicates.push(Self::Unrecognized(key.clone()));
		}

		Ok(predicates)
	}

	pub fn evaluate(&self, txn: &Transaction, codec: &dyn TransactionCodec) -> bool {
		match self {
			Self::Kind(kind) => txn.kind() == Some(kind.as_str()),
			Self::Sender(allowed) => address_in(txn.sender(), allowed, codec),
			Self::Receiver(allowed) => address_in(txn.receiver(), allowed, codec),
			Self::AssetId(id) => {
				txn.asset_id() == Some(*id) || txn.foreign_assets().contains(id)
			}
			Self::AppId(id) => txn.app_id() == Some(*id),
			Self::ArgsContains(arg) => txn.app_args().iter().any(|a| *a == arg.as_slice()),
			Self::AmountEquals(amount) => txn.amount() == *amount,
			Self::AmountGte(amount) => txn.amount() >= *amount,
			Self::AmountLte(amount) => txn.amount() <= *amount,
			Self::HasField(path) => txn.has_path(path),
			Self::Note(note) => note.evaluate(txn.note()),
			Self::Unrecognized(_) => true,
		}
	}
}

fn addresses(list: &AddressList) -> Vec<String> {
	match list {
		AddressList::One(address) => vec![address.clone()],
		AddressList::Many(addresses) => addresses.clone(),
	}
}

fn address_in(raw: Option<&[u8]>, allowed: &[String], codec: &dyn TransactionCodec) -> bool {
	raw.and_then(|raw| codec.encode_address(raw))
		.is_some_and(|address| allowed.iter().any(|a| *a == address))
}
