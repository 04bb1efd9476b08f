//! Address encoding and transaction ID computation.
//!
//! Both are consumed through [`TransactionCodec`] so that the matcher and the engine do not
//! depend on a particular chain's encoding. [`AlgorandCodec`] implements the Algorand rules:
//! - addresses are base32 (no padding) of the public key followed by the last four bytes
//!   of its SHA-512/256 digest
//! - transaction IDs are base32 (no padding) of the SHA-512/256 digest of `"TX"` followed
//!   by the canonical msgpack encoding of the transaction

use data_encoding::BASE32_NOPAD;
use rmpv::Value;
use sha2::{Digest, Sha512_256};

use crate::models::{Block, Transaction};

const PUBLIC_KEY_LENGTH: usize = 32;
const CHECKSUM_LENGTH: usize = 4;
const TRANSACTION_DOMAIN: &[u8] = b"TX";

/// Chain-specific encodings used while matching and dispatching
pub trait TransactionCodec: Send + Sync {
	/// Encodes raw address bytes into their canonical text form
	///
	/// Returns `None` when the bytes are not a valid address.
	fn encode_address(&self, raw: &[u8]) -> Option<String>;

	/// Computes the ID of a transaction included in `block`
	fn transaction_id(&self, txn: &Transaction, block: &Block) -> Option<String>;
}

/// Algorand address and transaction ID encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct AlgorandCodec;

impl TransactionCodec for AlgorandCodec {
	fn encode_address(&self, raw: &[u8]) -> Option<String> {
		if raw.len() != PUBLIC_KEY_LENGTH {
			return None;
		}
		let digest = Sha512_256::digest(raw);
		let mut buf = Vec::with_capacity(PUBLIC_KEY_LENGTH + CHECKSUM_LENGTH);
		buf.extend_from_slice(raw);
		buf.extend_from_slice(&digest[digest.len() - CHECKSUM_LENGTH..]);
		Some(BASE32_NOPAD.encode(&buf))
	}

	fn transaction_id(&self, txn: &Transaction, block: &Block) -> Option<String> {
		// Block payloads omit the genesis fields; the signed form includes them.
		let mut stamped = txn.clone();
		stamped.set("gen", Value::from(block.genesis_id.as_str()));
		stamped.set("gh", Value::Binary(block.genesis_hash.clone()));

		let mut encoded = TRANSACTION_DOMAIN.to_vec();
		if let Err(e) = rmpv::encode::write_value(&mut encoded, &canonical(stamped.fields())) {
			tracing::warn!(error = %e, round = block.round, "Failed to encode transaction");
			return None;
		}
		Some(BASE32_NOPAD.encode(&Sha512_256::digest(&encoded)))
	}
}

/// Sorts map keys recursively, as canonical msgpack requires
fn canonical(value: &Value) -> Value {
	match value {
		Value::Map(entries) => {
			let mut sorted: Vec<(Value, Value)> = entries
				.iter()
				.map(|(k, v)| (k.clone(), canonical(v)))
				.collect();
			sorted.sort_by(|(a, _), (b, _)| a.as_slice().cmp(&b.as_slice()));
			Value::Map(sorted)
		}
		Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
		other => other.clone(),
	}
}
