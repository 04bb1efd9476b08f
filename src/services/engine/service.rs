//! Event engine: scheduling and lifecycle.
//!
//! The engine runs in one of two modes:
//! - sequential ([`EventEngine::run`]): one round at a time from a start round, forward or
//!   backward, sharing a single backoff; exhausting it is fatal
//! - pooled ([`EventEngine::run_rounds`]): a fixed list of rounds spread over concurrent
//!   workers, each round with its own backoff; exhausting it abandons that round only

use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinSet};

use crate::{
	models::{Direction, EngineConfig, Rule},
	services::{
		actions::ActionSink,
		algod::NodeClient,
		blockfetcher::BlockFetcher,
		engine::{
			cursor::RoundCursor,
			error::EngineError,
			processor::{RoundObserver, RoundProcessor},
			state::EngineState,
		},
	},
	utils::{
		backoff::{BackoffConfig, ExpoBackoff},
		encoding::{AlgorandCodec, TransactionCodec},
	},
};

/// Produces the rule set when the engine starts
pub type RuleSupplier<A> =
	Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Vec<Rule<A>>>> + Send + Sync>;

/// Where the engine gets its rules from
pub enum RuleSource<A> {
	Static(Vec<Rule<A>>),
	/// Evaluated once while the engine is preparing
	Supplier(RuleSupplier<A>),
}

impl<A> RuleSource<A> {
	pub fn supplier<F, Fut>(supplier: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: std::future::Future<Output = anyhow::Result<Vec<Rule<A>>>> + Send + 'static,
	{
		Self::Supplier(Arc::new(move || Box::pin(supplier())))
	}

	async fn resolve(self) -> anyhow::Result<Vec<Rule<A>>> {
		match self {
			Self::Static(rules) => Ok(rules),
			Self::Supplier(supplier) => supplier().await,
		}
	}
}

impl<A> From<Vec<Rule<A>>> for RuleSource<A> {
	fn from(rules: Vec<Rule<A>>) -> Self {
		Self::Static(rules)
	}
}

/// Rounds handled by a pooled run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolSummary {
	pub processed: Vec<u64>,
	/// Rounds given up after exhausting their backoff
	pub abandoned: Vec<u64>,
}

impl PoolSummary {
	fn merge(&mut self, other: PoolSummary) {
		self.processed.extend(other.processed);
		self.abandoned.extend(other.abandoned);
	}
}

/// Fetches rounds, matches their transactions against rules and dispatches the resulting
/// actions to a sink
pub struct EventEngine<S: ActionSink> {
	client: Arc<dyn NodeClient>,
	sink: Arc<S>,
	codec: Arc<dyn TransactionCodec>,
	config: EngineConfig,
	rules: std::sync::Mutex<Option<RuleSource<S::Action>>>,
	observer: Option<RoundObserver>,
	running: watch::Sender<bool>,
	state: watch::Sender<EngineState>,
	last_round: Arc<watch::Sender<Option<u64>>>,
	in_flight: Arc<watch::Sender<usize>>,
}

impl<S: ActionSink + 'static> EventEngine<S> {
	/// Creates an idle engine
	///
	/// Fails with [`EngineError::NoRules`] when given an empty static rule list. A supplier
	/// is accepted as is and may return no rules.
	pub fn new(
		client: Arc<dyn NodeClient>,
		sink: Arc<S>,
		rules: impl Into<RuleSource<S::Action>>,
		config: EngineConfig,
	) -> Result<Self, EngineError> {
		let rules = rules.into();
		if matches!(&rules, RuleSource::Static(rules) if rules.is_empty()) {
			return Err(EngineError::NoRules);
		}

		Ok(Self {
			client,
			sink,
			codec: Arc::new(AlgorandCodec),
			config,
			rules: std::sync::Mutex::new(Some(rules)),
			observer: None,
			running: watch::channel(true).0,
			state: watch::channel(EngineState::Idle).0,
			last_round: Arc::new(watch::channel(None).0),
			in_flight: Arc::new(watch::channel(0).0),
		})
	}

	pub fn with_codec(mut self, codec: Arc<dyn TransactionCodec>) -> Self {
		self.codec = codec;
		self
	}

	pub fn with_observer(mut self, observer: RoundObserver) -> Self {
		self.observer = Some(observer);
		self
	}

	pub fn state(&self) -> EngineState {
		*self.state.borrow()
	}

	/// Subscribes to state transitions
	pub fn subscribe_state(&self) -> watch::Receiver<EngineState> {
		self.state.subscribe()
	}

	/// Last round the engine finished with
	pub fn last_round(&self) -> Option<u64> {
		*self.last_round.borrow()
	}

	pub fn is_running(&self) -> bool {
		*self.running.borrow()
	}

	pub fn sink(&self) -> &Arc<S> {
		&self.sink
	}

	/// Processes rounds one at a time starting at `since`
	///
	/// Without `since`, the run starts at the node's current round. Rounds advance in the
	/// configured direction until `until` has been processed or, going backward, round 0
	/// has been processed. Without `until` a forward run follows the chain indefinitely.
	///
	/// A failing round is retried after a backoff delay. Once the backoff budget is spent
	/// the engine stops and returns [`EngineError::RetriesExhausted`].
	pub async fn run(&self, since: Option<u64>, until: Option<u64>) -> Result<(), EngineError> {
		let processor = self.prepare().await?;

		let start = match since {
			Some(round) => round,
			None => match self.client.status().await {
				Ok(status) => status.last_round,
				Err(e) => {
					self.abort();
					return Err(EngineError::StartRound(e));
				}
			},
		};
		if !self.enter_running() {
			self.graceful_stop().await;
			return Ok(());
		}

		tracing::info!(
			since = start,
			until = ?until,
			direction = ?self.config.direction,
			rules = processor.matcher().len(),
			"Starting sequential run"
		);

		let mut backoff = ExpoBackoff::new(self.config.backoff);
		let mut round = start;
		while self.is_running() {
			match processor.process(round).await {
				Ok(outcome) => {
					backoff.reset();
					self.last_round.send_replace(Some(round));
					tracing::debug!(round, matches = outcome.match_count, "Round processed");
				}
				Err(e) if e.is_stopped() => break,
				Err(e) => {
					tracing::warn!(round, failures = backoff.failures() + 1, error = %e, "Round failed");
					if !backoff.should_retry().await {
						tracing::error!(round, error = %e, "Retries exhausted, stopping engine");
						self.abort();
						return Err(EngineError::RetriesExhausted {
							round,
							failures: backoff.failures(),
							source: Box::new(e),
						});
					}
					continue;
				}
			}

			match next_round(self.config.direction, round, until) {
				Some(next) => round = next,
				None => break,
			}
		}

		self.graceful_stop().await;
		Ok(())
	}

	/// Processes a fixed list of rounds with the configured number of workers
	///
	/// Workers claim rounds from a shared cursor, so each round is handed out once. A round
	/// that keeps failing is retried with its own backoff and abandoned once the backoff is
	/// spent; the other workers carry on.
	pub async fn run_rounds(&self, rounds: Vec<u64>) -> Result<PoolSummary, EngineError> {
		let processor = Arc::new(self.prepare().await?);
		if !self.enter_running() {
			self.graceful_stop().await;
			return Ok(PoolSummary::default());
		}

		let cursor = Arc::new(RoundCursor::new(rounds));
		let workers = self.config.threads.max(1).min(cursor.len().max(1));
		tracing::info!(
			rounds = cursor.len(),
			workers,
			rules = processor.matcher().len(),
			"Starting pooled run"
		);

		let mut set = JoinSet::new();
		for worker in 0..workers {
			set.spawn(run_worker(
				worker,
				processor.clone(),
				cursor.clone(),
				self.running.subscribe(),
				self.last_round.clone(),
				self.config.backoff,
			));
		}

		let mut summary = PoolSummary::default();
		while let Some(result) = set.join_next().await {
			match result {
				Ok(worker_summary) => summary.merge(worker_summary),
				Err(e) => tracing::error!(error = %e, "Worker task failed"),
			}
		}
		summary.processed.sort_unstable();
		summary.abandoned.sort_unstable();

		tracing::info!(
			processed = summary.processed.len(),
			abandoned = summary.abandoned.len(),
			"Pooled run finished"
		);
		self.graceful_stop().await;
		Ok(summary)
	}

	/// Stops the engine after in-flight rounds finish and drains the sink
	///
	/// The sink is persisted, awaited and persisted again. Sink errors are logged; the stop
	/// always completes. A second caller waits for the first one to finish; after
	/// [`force_stop`](Self::force_stop) it returns at once.
	pub async fn graceful_stop(&self) {
		self.running.send_replace(false);
		let began = self.state.send_if_modified(|state| {
			if state.is_stopping() {
				return false;
			}
			*state = EngineState::Draining;
			true
		});
		if !began {
			// Another caller is draining; finish together with it
			let mut state = self.state.subscribe();
			let _ = state.wait_for(|state| *state == EngineState::Stopped).await;
			return;
		}
		tracing::info!("Stopping engine");

		let mut in_flight = self.in_flight.subscribe();
		if in_flight.wait_for(|n| *n == 0).await.is_err() {
			tracing::warn!("Lost track of in-flight rounds");
		}

		if let Err(e) = self.sink.persist().await {
			tracing::error!(error = %e, "Failed to persist actions");
		}
		if let Err(e) = self.sink.await_completion().await {
			tracing::error!(error = %e, "Failed waiting for action sink");
		}
		if let Err(e) = self.sink.persist().await {
			tracing::error!(error = %e, "Failed to persist actions");
		}

		self.state.send_replace(EngineState::Stopped);
		tracing::info!(last_round = ?self.last_round(), "Engine stopped");
	}

	/// Stops the engine without waiting for in-flight rounds or the sink
	pub async fn force_stop(&self) {
		self.running.send_replace(false);
		let previous = self.state.send_replace(EngineState::Stopped);
		if previous == EngineState::Stopped {
			return;
		}
		tracing::warn!(last_round = ?self.last_round(), "Forcing engine stop");

		if let Err(e) = self.sink.persist().await {
			tracing::error!(error = %e, "Failed to persist actions");
		}
	}

	/// Moves from `Idle` to `Preparing` and builds the round processor
	async fn prepare(&self) -> Result<RoundProcessor<S>, EngineError> {
		let mut current = EngineState::Idle;
		let started = self.state.send_if_modified(|state| {
			current = *state;
			if *state != EngineState::Idle {
				return false;
			}
			*state = EngineState::Preparing;
			true
		});
		if !started {
			return Err(EngineError::InvalidState(current));
		}

		let source = self
			.rules
			.lock()
			.map_err(|_| EngineError::Rules("rule source lock poisoned".into()))?
			.take();
		let rules = match source {
			Some(source) => source.resolve().await,
			None => Err(anyhow::anyhow!("no rule source")),
		};
		let rules = match rules {
			Ok(rules) => rules,
			Err(e) => {
				self.abort();
				return Err(EngineError::Rules(e.to_string()));
			}
		};

		let fetcher = BlockFetcher::new(self.client.clone(), self.config.fetch_timeout())
			.with_running(self.running.subscribe());
		let processor = RoundProcessor::new(fetcher, rules, self.codec.clone(), self.sink.clone())
			.with_observer(self.observer.clone())
			.with_in_flight(self.in_flight.clone());

		if processor.matcher().is_empty() {
			tracing::warn!("No usable rules, nothing will match");
		}
		Ok(processor)
	}

	/// Moves from `Preparing` to `Running`, unless a stop arrived in between
	fn enter_running(&self) -> bool {
		self.state.send_if_modified(|state| {
			if *state != EngineState::Preparing || !*self.running.borrow() {
				return false;
			}
			*state = EngineState::Running;
			true
		})
	}

	/// Stops without draining
	fn abort(&self) {
		self.running.send_replace(false);
		self.state.send_replace(EngineState::Stopped);
	}
}

/// Next round of a sequential run, `None` once the run is complete
fn next_round(direction: Direction, round: u64, until: Option<u64>) -> Option<u64> {
	match direction {
		Direction::Forward => {
			if until.is_some_and(|until| round >= until) {
				return None;
			}
			round.checked_add(1)
		}
		Direction::Backward => {
			if until.is_some_and(|until| round <= until) {
				return None;
			}
			round.checked_sub(1)
		}
	}
}

async fn run_worker<S: ActionSink>(
	worker: usize,
	processor: Arc<RoundProcessor<S>>,
	cursor: Arc<RoundCursor>,
	running: watch::Receiver<bool>,
	last_round: Arc<watch::Sender<Option<u64>>>,
	backoff_config: BackoffConfig,
) -> PoolSummary {
	let mut summary = PoolSummary::default();

	while *running.borrow() {
		let Some(round) = cursor.claim() else {
			break;
		};

		let mut backoff = ExpoBackoff::new(backoff_config);
		loop {
			match processor.process(round).await {
				Ok(_) => {
					summary.processed.push(round);
					break;
				}
				Err(e) if e.is_stopped() => return summary,
				Err(e) => {
					tracing::warn!(worker, round, error = %e, "Round failed");
					if !backoff.should_retry().await {
						tracing::error!(worker, round, error = %e, "Retries exhausted, abandoning round");
						summary.abandoned.push(round);
						break;
					}
					if !*running.borrow() {
						return summary;
					}
				}
			}
		}
		last_round.send_replace(Some(round));
	}

	tracing::debug!(worker, processed = summary.processed.len(), "Worker finished");
	summary
}
