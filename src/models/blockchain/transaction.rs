//! Algorand transaction record.
//!
//! Transactions are kept as the raw field map delivered by the node so that generic
//! field-presence checks and transaction-ID hashing see every field, including the ones
//! this crate has no typed accessor for.

use rmpv::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw transaction fields plus the transaction ID once it has been computed
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
	fields: Value,
	id: Option<String>,
}

impl Default for Transaction {
	fn default() -> Self {
		Self {
			fields: Value::Map(Vec::new()),
			id: None,
		}
	}
}

impl Transaction {
	/// Wraps a raw field map. Non-map values are treated as an empty transaction.
	pub fn from_value(value: Value) -> Self {
		let fields = match value {
			Value::Map(_) => value,
			_ => Value::Map(Vec::new()),
		};
		Self { fields, id: None }
	}

	/// The raw field map
	pub fn fields(&self) -> &Value {
		&self.fields
	}

	/// Looks up a top-level field by its wire name
	pub fn get(&self, key: &str) -> Option<&Value> {
		lookup(&self.fields, key)
	}

	/// Sets or replaces a top-level field
	pub fn set(&mut self, key: &str, value: Value) {
		if let Value::Map(entries) = &mut self.fields {
			match entries.iter_mut().find(|(k, _)| k.as_str() == Some(key)) {
				Some((_, existing)) => *existing = value,
				None => entries.push((Value::from(key), value)),
			}
		}
	}

	/// Transaction ID stamped by the engine before dispatch
	pub fn id(&self) -> Option<&str> {
		self.id.as_deref()
	}

	pub fn set_id(&mut self, id: Option<String>) {
		self.id = id;
	}

	/// Transaction kind (`pay`, `axfer`, `appl`, ...)
	pub fn kind(&self) -> Option<&str> {
		self.get("type").and_then(Value::as_str)
	}

	/// Raw sender address bytes
	pub fn sender(&self) -> Option<&[u8]> {
		self.bytes("snd")
	}

	/// Raw receiver address bytes, preferring the payment receiver over the asset receiver
	pub fn receiver(&self) -> Option<&[u8]> {
		self.bytes("rcv").or_else(|| self.bytes("arcv"))
	}

	/// Asset transferred by an asset transfer
	pub fn asset_id(&self) -> Option<u64> {
		self.get("xaid").and_then(Value::as_u64)
	}

	/// Assets referenced by an application call
	pub fn foreign_assets(&self) -> Vec<u64> {
		self.get("apas")
			.and_then(Value::as_array)
			.map(|assets| assets.iter().filter_map(Value::as_u64).collect())
			.unwrap_or_default()
	}

	/// Application targeted by an application call
	pub fn app_id(&self) -> Option<u64> {
		self.get("apid").and_then(Value::as_u64)
	}

	/// Application call arguments
	pub fn app_args(&self) -> Vec<&[u8]> {
		self.get("apaa")
			.and_then(Value::as_array)
			.map(|args| args.iter().filter_map(Value::as_slice).collect())
			.unwrap_or_default()
	}

	/// Note bytes; an empty note counts as absent
	pub fn note(&self) -> Option<&[u8]> {
		self.bytes("note").filter(|note| !note.is_empty())
	}

	/// Group ID shared by transactions submitted atomically
	pub fn group(&self) -> Option<&[u8]> {
		self.bytes("grp")
	}

	/// Payment amount, falling back to the asset amount, defaulting to 0
	pub fn amount(&self) -> u64 {
		self.get("amt")
			.and_then(Value::as_u64)
			.or_else(|| self.get("aamt").and_then(Value::as_u64))
			.unwrap_or(0)
	}

	/// Checks whether a dotted path exists in the raw record
	///
	/// Segments address map keys; numeric segments also index into arrays, so
	/// `apaa.0` is the first application argument.
	pub fn has_path(&self, path: &str) -> bool {
		if path.is_empty() {
			return false;
		}
		let mut current = &self.fields;
		for segment in path.split('.') {
			let next = match current {
				Value::Map(_) => lookup(current, segment),
				Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
				_ => None,
			};
			match next {
				Some(value) => current = value,
				None => return false,
			}
		}
		true
	}

	fn bytes(&self, key: &str) -> Option<&[u8]> {
		match self.get(key)? {
			Value::Binary(bytes) => Some(bytes.as_slice()),
			_ => None,
		}
	}
}

fn lookup<'a>(map: &'a Value, key: &str) -> Option<&'a Value> {
	map.as_map()?
		.iter()
		.find(|(k, _)| k.as_str() == Some(key))
		.map(|(_, v)| v)
}

impl Serialize for Transaction {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.fields.serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for Transaction {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Value::deserialize(deserializer).map(Self::from_value)
	}
}
