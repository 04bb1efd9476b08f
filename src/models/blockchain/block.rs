//! Algorand block data structures.

use serde::{Deserialize, Serialize};

use crate::models::blockchain::transaction::Transaction;

/// A block as delivered by the node, with its ordered transaction list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
	/// Round number
	#[serde(rename = "rnd", default)]
	pub round: u64,

	/// Block timestamp in seconds since the epoch
	#[serde(rename = "ts", default)]
	pub timestamp: i64,

	/// Genesis ID of the chain
	#[serde(rename = "gen", default)]
	pub genesis_id: String,

	/// Genesis hash of the chain
	#[serde(rename = "gh", default, with = "serde_bytes")]
	pub genesis_hash: Vec<u8>,

	/// Outer transactions; `None` when the block carries no payset
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub txns: Option<Vec<SignedTxnInBlock>>,
}

impl Block {
	/// Outer transactions, empty when the block has none
	pub fn transactions(&self) -> &[SignedTxnInBlock] {
		self.txns.as_deref().unwrap_or_default()
	}

	/// Outer transactions sharing the given group ID
	pub fn group_members(&self, group: &[u8]) -> Vec<&SignedTxnInBlock> {
		self.transactions()
			.iter()
			.filter(|outer| outer.txn.group() == Some(group))
			.collect()
	}
}

/// Outer transaction envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignedTxnInBlock {
	pub txn: Transaction,

	/// Execution results, including inner transactions spawned by application calls
	#[serde(rename = "dt", default, skip_serializing_if = "Option::is_none")]
	pub apply_data: Option<ApplyData>,
}

impl SignedTxnInBlock {
	pub fn new(txn: Transaction) -> Self {
		Self {
			txn,
			apply_data: None,
		}
	}

	/// Attaches inner transactions
	pub fn with_inner(mut self, inner_txns: Vec<SignedTxnInBlock>) -> Self {
		self.apply_data = Some(ApplyData { inner_txns });
		self
	}

	/// Direct inner transactions, empty when none were produced
	pub fn inner_txns(&self) -> &[SignedTxnInBlock] {
		self.apply_data
			.as_ref()
			.map(|ad| ad.inner_txns.as_slice())
			.unwrap_or_default()
	}
}

/// Apply data of a transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplyData {
	#[serde(rename = "itx", default, skip_serializing_if = "Vec::is_empty")]
	pub inner_txns: Vec<SignedTxnInBlock>,
}
