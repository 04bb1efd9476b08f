//! Declarative rule definitions.
//!
//! A [`RuleSpec`] is the data half of a rule: the field criteria a transaction must meet.
//! It is what rule files contain. A [`Rule`] pairs a spec with the callback invoked for
//! each matching transaction.

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, future::Future, sync::Arc};

use crate::models::{Block, SignedTxnInBlock, Transaction};

/// Numeric identifier that may be written as a number or a numeric string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericId {
	Number(u64),
	Text(String),
}

impl NumericId {
	/// Resolves the identifier, parsing string input as base-10
	pub fn resolve(&self) -> Result<u64, String> {
		match self {
			Self::Number(n) => Ok(*n),
			Self::Text(text) => text
				.trim()
				.parse::<u64>()
				.map_err(|_| format!("expected numeric id, found {:?}", text)),
		}
	}
}

impl From<u64> for NumericId {
	fn from(value: u64) -> Self {
		Self::Number(value)
	}
}

/// One address or a set of addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressList {
	One(String),
	Many(Vec<String>),
}

/// Decode step applied to a note before it is compared
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteEncoding {
	/// Note bytes are read as UTF-8 text
	#[default]
	Raw,
	/// Note bytes are base64 text decoding to ASCII
	Base64,
	/// Note bytes are a msgpack-encoded string
	Msgpack,
}

/// Note criteria as written in a rule
///
/// Only one comparison is applied. When several are set the first in this order wins:
/// `has`, `regex`, `includes`, `startsWith`, `endsWith`, `exact`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRuleSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub encoding: Option<NoteEncoding>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub has: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub regex: Option<String>,
	#[serde(default, alias = "substring", skip_serializing_if = "Option::is_none")]
	pub includes: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub starts_with: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ends_with: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exact: Option<String>,
}

/// Field criteria of a rule
///
/// Every field that is set must be satisfied for a transaction to match. `label` and
/// `chain` are descriptive only. Keys this crate does not know are kept in
/// `unrecognized` and do not restrict matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chain: Option<String>,
	#[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	#[serde(default, alias = "snd", skip_serializing_if = "Option::is_none")]
	pub sender: Option<AddressList>,
	#[serde(default, alias = "rcv", skip_serializing_if = "Option::is_none")]
	pub receiver: Option<AddressList>,
	#[serde(default, alias = "asaid", skip_serializing_if = "Option::is_none")]
	pub asset_id: Option<NumericId>,
	#[serde(default, alias = "appid", skip_serializing_if = "Option::is_none")]
	pub app_id: Option<NumericId>,
	#[serde(default, alias = "args", skip_serializing_if = "Option::is_none")]
	pub args_contains: Option<String>,
	#[serde(default, alias = "amt", skip_serializing_if = "Option::is_none")]
	pub amount_equals: Option<u64>,
	#[serde(default, alias = "amtgte", skip_serializing_if = "Option::is_none")]
	pub amount_gte: Option<u64>,
	#[serde(default, alias = "amtlte", skip_serializing_if = "Option::is_none")]
	pub amount_lte: Option<u64>,
	#[serde(default, alias = "has", skip_serializing_if = "Option::is_none")]
	pub has_field: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub note: Option<NoteRuleSpec>,
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub inner: bool,
	#[serde(flatten)]
	pub unrecognized: BTreeMap<String, serde_json::Value>,
}

/// Everything a callback gets to see about a match
#[derive(Debug, Clone)]
pub struct MatchContext {
	/// Index of the matched rule in the compiled rule set
	pub rule_index: usize,
	/// The matched transaction, with its ID stamped
	pub txn: Transaction,
	/// The outer envelope the transaction came from
	pub outer: SignedTxnInBlock,
	pub block: Arc<Block>,
}

/// Actions produced by a single callback invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Emitted<A> {
	Nothing,
	One(A),
	Many(Vec<A>),
}

impl<A> Emitted<A> {
	pub fn into_vec(self) -> Vec<A> {
		match self {
			Self::Nothing => Vec::new(),
			Self::One(action) => vec![action],
			Self::Many(actions) => actions,
		}
	}
}

impl<A> From<Option<A>> for Emitted<A> {
	fn from(value: Option<A>) -> Self {
		value.map_or(Self::Nothing, Self::One)
	}
}

impl<A> From<Vec<A>> for Emitted<A> {
	fn from(value: Vec<A>) -> Self {
		Self::Many(value)
	}
}

pub type CallbackFuture<A> = BoxFuture<'static, anyhow::Result<Emitted<A>>>;

/// Callback invoked for each transaction a rule matches
pub type RuleCallback<A> = Arc<dyn Fn(MatchContext) -> CallbackFuture<A> + Send + Sync>;

/// A rule spec together with its callback
pub struct Rule<A> {
	pub spec: RuleSpec,
	pub callback: RuleCallback<A>,
}

impl<A> Clone for Rule<A> {
	fn clone(&self) -> Self {
		Self {
			spec: self.spec.clone(),
			callback: self.callback.clone(),
		}
	}
}

impl<A> std::fmt::Debug for Rule<A> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Rule").field("spec", &self.spec).finish()
	}
}

impl<A: Send + 'static> Rule<A> {
	/// Creates a rule with an asynchronous callback
	pub fn new<F, Fut>(spec: RuleSpec, callback: F) -> Self
	where
		F: Fn(MatchContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = anyhow::Result<Emitted<A>>> + Send + 'static,
	{
		Self {
			spec,
			callback: Arc::new(move |ctx| callback(ctx).boxed()),
		}
	}

	/// Creates a rule with a synchronous callback
	pub fn sync<F>(spec: RuleSpec, callback: F) -> Self
	where
		F: Fn(&MatchContext) -> anyhow::Result<Emitted<A>> + Send + Sync + 'static,
	{
		Self {
			spec,
			callback: Arc::new(move |ctx| {
				let result = callback(&ctx);
				futures::future::ready(result).boxed()
			}),
		}
	}
}
