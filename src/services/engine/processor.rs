//! Processing of a single round: fetch, match, dispatch.

use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio::sync::{watch, Mutex};

use crate::{
	models::{Block, MatchContext, Rule, RuleCallback, RuleSpec},
	services::{
		actions::ActionSink,
		blockfetcher::BlockFetcher,
		engine::error::RoundError,
		filter::{RuleMatcher, TxnMatch},
	},
	utils::encoding::TransactionCodec,
};

/// Best-effort hook invoked with every fetched round; errors are logged and ignored
pub type RoundObserver = Arc<dyn Fn(u64) -> anyhow::Result<()> + Send + Sync>;

/// Counts of one processed round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundOutcome {
	pub round: u64,
	pub txn_count: usize,
	/// Outer transactions matched by at least one rule
	pub match_count: usize,
	pub action_count: usize,
}

/// Processes rounds independently of how they are scheduled
///
/// All state a round needs is owned here and is read-only, so one processor can be shared
/// by any number of concurrent workers. The only synchronization is the dispatch lock
/// that serializes calls to [`ActionSink::ingest`].
pub struct RoundProcessor<S: ActionSink> {
	fetcher: BlockFetcher,
	matcher: RuleMatcher,
	/// Callback of each compiled rule, by compiled index
	callbacks: Vec<RuleCallback<S::Action>>,
	observer: Option<RoundObserver>,
	sink: Arc<S>,
	dispatch: Mutex<()>,
	in_flight: Arc<watch::Sender<usize>>,
}

impl<S: ActionSink> RoundProcessor<S> {
	/// Compiles `rules` and pairs each retained rule with its callback
	pub fn new(
		fetcher: BlockFetcher,
		rules: Vec<Rule<S::Action>>,
		codec: Arc<dyn TransactionCodec>,
		sink: Arc<S>,
	) -> Self {
		let specs: Vec<RuleSpec> = rules.iter().map(|r| r.spec.clone()).collect();
		let matcher = RuleMatcher::compile(&specs, codec);
		let callbacks = matcher
			.rules()
			.iter()
			.map(|compiled| rules[compiled.origin()].callback.clone())
			.collect();

		Self {
			fetcher,
			matcher,
			callbacks,
			observer: None,
			sink,
			dispatch: Mutex::new(()),
			in_flight: Arc::new(watch::channel(0).0),
		}
	}

	pub fn with_observer(mut self, observer: Option<RoundObserver>) -> Self {
		self.observer = observer;
		self
	}

	/// Reports the number of rounds being processed through `in_flight`
	pub fn with_in_flight(mut self, in_flight: Arc<watch::Sender<usize>>) -> Self {
		self.in_flight = in_flight;
		self
	}

	pub fn matcher(&self) -> &RuleMatcher {
		&self.matcher
	}

	/// Fetches a round, runs one callback per matched transaction and hands the actions to
	/// the sink
	///
	/// The callback is the one of the first rule the transaction matched.
	///
	/// Callback failures only cost their own actions. The sink receives the round's actions
	/// in one `ingest` call, in match order; rounds without matches are not ingested.
	#[tracing::instrument(skip(self), level = "debug")]
	pub async fn process(&self, round: u64) -> Result<RoundOutcome, RoundError> {
		let _in_flight = InFlight::enter(&self.in_flight);

		let mut block = self.fetcher.fetch(round).await?;

		if let Some(observer) = &self.observer {
			if let Err(e) = observer(round) {
				tracing::warn!(round, error = %e, "Round observer failed");
			}
		}

		let txn_count = block.transactions().len();
		let matches = if txn_count == 0 {
			Vec::new()
		} else {
			self.matcher.match_all(block.transactions())
		};

		let mut outcome = RoundOutcome {
			round,
			txn_count,
			match_count: matches.len(),
			action_count: 0,
		};

		if matches.is_empty() {
			self.sink.round_processed(round, txn_count, 0).await;
			return Ok(outcome);
		}

		self.stamp_ids(&mut block, &matches);
		let block = Arc::new(block);

		let mut actions = Vec::new();
		for txn_match in &matches {
			// The first matching rule owns the transaction
			let Some(&rule_index) = txn_match.rules.first() else {
				continue;
			};
			let outer = &block.transactions()[txn_match.index];
			let ctx = MatchContext {
				rule_index,
				txn: outer.txn.clone(),
				outer: outer.clone(),
				block: block.clone(),
			};
			let callback = self.callbacks[rule_index].clone();

			match AssertUnwindSafe(async move { callback(ctx).await })
				.catch_unwind()
				.await
			{
				Ok(Ok(emitted)) => actions.extend(emitted.into_vec()),
				Ok(Err(e)) => {
					tracing::error!(
						round,
						txn = txn_match.index,
						rule = rule_index,
						error = %e,
						"Rule callback failed"
					);
				}
				Err(_) => {
					tracing::error!(
						round,
						txn = txn_match.index,
						rule = rule_index,
						"Rule callback panicked"
					);
				}
			}
		}

		outcome.action_count = actions.len();
		{
			let _dispatch = self.dispatch.lock().await;
			self.sink
				.ingest(actions)
				.await
				.map_err(|source| RoundError::Sink { round, source })?;
		}
		self.sink
			.round_processed(round, txn_count, outcome.match_count)
			.await;

		tracing::debug!(
			round,
			txns = txn_count,
			matches = outcome.match_count,
			actions = outcome.action_count,
			"Round dispatched"
		);
		Ok(outcome)
	}

	/// Stamps transaction IDs onto the matched outer transactions
	fn stamp_ids(&self, block: &mut Block, matches: &[TxnMatch]) {
		let codec = self.matcher.codec();
		let ids: Vec<(usize, Option<String>)> = matches
			.iter()
			.map(|m| {
				let id = codec.transaction_id(&block.transactions()[m.index].txn, block);
				if id.is_none() {
					tracing::warn!(round = block.round, txn = m.index, "Could not compute transaction id");
				}
				(m.index, id)
			})
			.collect();

		if let Some(txns) = block.txns.as_mut() {
			for (index, id) in ids {
				txns[index].txn.set_id(id);
			}
		}
	}
}

/// Counts a round as in flight for as long as it is alive
struct InFlight<'a>(&'a watch::Sender<usize>);

impl<'a> InFlight<'a> {
	fn enter(counter: &'a watch::Sender<usize>) -> Self {
		counter.send_modify(|n| *n += 1);
		Self(counter)
	}
}

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.send_modify(|n| *n = n.saturating_sub(1));
	}
}
