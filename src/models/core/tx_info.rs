//! Transaction summary emitted by the built-in rule callback.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::{models::MatchContext, utils::encoding::TransactionCodec};

/// Summary of a matched transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInfo {
	pub id: Option<String>,
	pub label: Option<String>,
	/// Base64 group ID
	pub group: Option<String>,
	/// Number of outer transactions in the block sharing the group
	pub group_size: Option<usize>,
	pub round: u64,
	pub round_time: i64,
	pub sender: Option<String>,
	pub receiver: Option<String>,
	/// Base64 note
	pub note: Option<String>,
}

impl TxInfo {
	pub fn from_match(
		ctx: &MatchContext,
		label: Option<String>,
		codec: &dyn TransactionCodec,
	) -> Self {
		let txn = &ctx.txn;
		let group = txn.group();
		Self {
			id: txn.id().map(str::to_string),
			label,
			group: group.map(|g| STANDARD.encode(g)),
			group_size: group.map(|g| ctx.block.group_members(g).len()),
			round: ctx.block.round,
			round_time: ctx.block.timestamp,
			sender: txn.sender().and_then(|a| codec.encode_address(a)),
			receiver: txn.receiver().and_then(|a| codec.encode_address(a)),
			note: txn.note().map(|n| STANDARD.encode(n)),
		}
	}
}
