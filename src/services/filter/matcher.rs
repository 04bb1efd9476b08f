//! Rule matching over block transactions.
//!
//! [`RuleMatcher`] compiles rule specs once and evaluates them against the outer
//! transactions of a block. Rules marked `inner` are evaluated against the inner
//! transaction tree of each outer transaction instead of the outer transaction itself.

use std::sync::Arc;

use crate::{
	models::{RuleSpec, SignedTxnInBlock, Transaction},
	services::filter::predicate::FieldPredicate,
	utils::encoding::TransactionCodec,
};

/// Deepest inner transaction level that is searched
///
/// The chain itself nests far less deeply; the cap only bounds work on malformed input.
pub const MAX_INNER_DEPTH: usize = 64;

/// A rule spec compiled into predicates
#[derive(Debug, Clone)]
pub struct CompiledRule {
	origin: usize,
	label: Option<String>,
	inner: bool,
	predicates: Vec<FieldPredicate>,
}

impl CompiledRule {
	/// Position of the rule in the specs it was compiled from
	pub fn origin(&self) -> usize {
		self.origin
	}

	pub fn label(&self) -> Option<&str> {
		self.label.as_deref()
	}

	pub fn is_inner(&self) -> bool {
		self.inner
	}

	pub fn predicates(&self) -> &[FieldPredicate] {
		&self.predicates
	}

	/// Whether every predicate holds for `txn`
	pub fn matches(&self, txn: &Transaction, codec: &dyn TransactionCodec) -> bool {
		self.predicates.iter().all(|p| p.evaluate(txn, codec))
	}
}

/// Rules matched by one outer transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnMatch {
	/// Position of the transaction in the block
	pub index: usize,
	/// Indices of the matching compiled rules, ascending
	pub rules: Vec<usize>,
}

/// Compiled rule set
#[derive(Clone)]
pub struct RuleMatcher {
	rules: Vec<CompiledRule>,
	codec: Arc<dyn TransactionCodec>,
}

impl std::fmt::Debug for RuleMatcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RuleMatcher")
			.field("rules", &self.rules)
			.finish()
	}
}

impl RuleMatcher {
	/// Compiles rule specs, dropping those that cannot be compiled
	///
	/// Retained rules keep their relative order. Each compiled rule remembers the position
	/// of its spec, see [`CompiledRule::origin`].
	pub fn compile(specs: &[RuleSpec], codec: Arc<dyn TransactionCodec>) -> Self {
		let mut rules = Vec::with_capacity(specs.len());
		for (origin, spec) in specs.iter().enumerate() {
			match FieldPredicate::compile_all(origin, spec) {
				Ok(predicates) => rules.push(CompiledRule {
					origin,
					label: spec.label.clone(),
					inner: spec.inner,
					predicates,
				}),
				Err(e) => {
					tracing::error!(rule = origin, label = ?spec.label, error = %e, "Dropping rule");
				}
			}
		}

		tracing::debug!(
			loaded = rules.len(),
			dropped = specs.len() - rules.len(),
			"Compiled rules"
		);
		Self { rules, codec }
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	pub fn rules(&self) -> &[CompiledRule] {
		&self.rules
	}

	pub fn rule(&self, index: usize) -> Option<&CompiledRule> {
		self.rules.get(index)
	}

	pub fn codec(&self) -> &Arc<dyn TransactionCodec> {
		&self.codec
	}

	/// Matches every outer transaction, in block order
	///
	/// Transactions that match no rule are omitted.
	pub fn match_all(&self, txns: &[SignedTxnInBlock]) -> Vec<TxnMatch> {
		txns.iter()
			.enumerate()
			.filter_map(|(index, outer)| {
				let rules = self.match_txn(outer);
				(!rules.is_empty()).then_some(TxnMatch { index, rules })
			})
			.collect()
	}

	/// Indices of the rules matching one outer transaction
	pub fn match_txn(&self, outer: &SignedTxnInBlock) -> Vec<usize> {
		self.rules
			.iter()
			.enumerate()
			.filter(|(_, rule)| self.rule_matches(rule, outer))
			.map(|(index, _)| index)
			.collect()
	}

	fn rule_matches(&self, rule: &CompiledRule, outer: &SignedTxnInBlock) -> bool {
		if rule.inner {
			self.any_inner_matches(rule, outer)
		} else {
			rule.matches(&outer.txn, self.codec.as_ref())
		}
	}

	/// Depth-first search of the inner transaction tree below `outer`
	fn any_inner_matches(&self, rule: &CompiledRule, outer: &SignedTxnInBlock) -> bool {
		let mut stack: Vec<(&SignedTxnInBlock, usize)> =
			outer.inner_txns().iter().rev().map(|t| (t, 1)).collect();

		while let Some((node, depth)) = stack.pop() {
			if rule.matches(&node.txn, self.codec.as_ref()) {
				return true;
			}
			let children = node.inner_txns();
			if children.is_empty() {
				continue;
			}
			if depth >= MAX_INNER_DEPTH {
				tracing::warn!(depth, "Inner transactions nested too deep, not descending");
				continue;
			}
			stack.extend(children.iter().rev().map(|t| (t, depth + 1)));
		}
		false
	}

	/// Inner transactions at any depth below `outer` that satisfy a rule
	///
	/// Children are listed before their parent. The `inner` flag of the rule is ignored.
	pub fn matching_inner_txns<'a>(
		&self,
		rule: usize,
		outer: &'a SignedTxnInBlock,
	) -> Vec<&'a SignedTxnInBlock> {
		let mut found = Vec::new();
		if let Some(rule) = self.rules.get(rule) {
			self.collect_inner(rule, outer.inner_txns(), 1, &mut found);
		}
		found
	}

	fn collect_inner<'a>(
		&self,
		rule: &CompiledRule,
		txns: &'a [SignedTxnInBlock],
		depth: usize,
		found: &mut Vec<&'a SignedTxnInBlock>,
	) {
		for txn in txns {
			if depth < MAX_INNER_DEPTH {
				self.collect_inner(rule, txn.inner_txns(), depth + 1, found);
			}
			if rule.matches(&txn.txn, self.codec.as_ref()) {
				found.push(txn);
			}
		}
	}
}
