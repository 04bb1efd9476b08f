//! Property-based tests for pooled round scheduling.

use algo_events::{
	models::{Block, Emitted, EngineConfig, Rule},
	services::{
		actions::{ActionSink, SinkError},
		algod::{NodeClient, NodeError, NodeStatus},
		engine::EventEngine,
	},
	utils::tests::{BlockBuilder, RuleSpecBuilder, TransactionBuilder},
};
use async_trait::async_trait;
use proptest::{prelude::*, test_runner::Config};
use std::{
	collections::{BTreeSet, HashMap},
	sync::{Arc, Mutex},
};

/// Serves every round and counts how often each one was requested
#[derive(Default)]
struct CountingClient {
	fetched: Mutex<HashMap<u64, usize>>,
}

#[async_trait]
impl NodeClient for CountingClient {
	async fn block(&self, round: u64) -> Result<Block, NodeError> {
		*self.fetched.lock().unwrap().entry(round).or_default() += 1;
		tokio::task::yield_now().await;
		Ok(BlockBuilder::new()
			.round(round)
			.txn(TransactionBuilder::new().kind("pay").build())
			.build())
	}

	async fn status(&self) -> Result<NodeStatus, NodeError> {
		Ok(NodeStatus { last_round: 1 })
	}

	async fn status_after_block(&self, round: u64) -> Result<NodeStatus, NodeError> {
		Ok(NodeStatus {
			last_round: round + 1,
		})
	}
}

#[derive(Default)]
struct CollectingSink {
	actions: Mutex<Vec<u64>>,
}

#[async_trait]
impl ActionSink for CollectingSink {
	type Action = u64;

	async fn ingest(&self, actions: Vec<u64>) -> Result<(), SinkError> {
		self.actions.lock().unwrap().extend(actions);
		Ok(())
	}

	async fn persist(&self) -> Result<(), SinkError> {
		Ok(())
	}

	async fn await_completion(&self) -> Result<(), SinkError> {
		Ok(())
	}
}

proptest! {
	#![proptest_config(Config {
		cases: 32,
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_pooled_rounds_are_processed_exactly_once(
		rounds in prop::collection::btree_set(0u64..10_000, 0..64),
		threads in 1usize..8,
	) {
		let runtime = tokio::runtime::Builder::new_multi_thread()
			.worker_threads(4)
			.enable_all()
			.build()
			.unwrap();
		let rounds: Vec<u64> = rounds.into_iter().collect();
		let client = Arc::new(CountingClient::default());
		let sink = Arc::new(CollectingSink::default());
		let engine = EventEngine::new(
			client.clone(),
			sink.clone(),
			vec![Rule::sync(RuleSpecBuilder::new().kind("pay").build(), |ctx| {
				Ok(Emitted::One(ctx.block.round))
			})],
			EngineConfig {
				threads,
				..EngineConfig::default()
			},
		)
		.unwrap();

		let summary = runtime.block_on(engine.run_rounds(rounds.clone())).unwrap();

		prop_assert_eq!(&summary.processed, &rounds);
		prop_assert!(summary.abandoned.is_empty());
		let fetched = client.fetched.lock().unwrap();
		prop_assert_eq!(fetched.len(), rounds.len());
		prop_assert!(fetched.values().all(|count| *count == 1));
		let emitted: BTreeSet<u64> = sink.actions.lock().unwrap().iter().copied().collect();
		prop_assert_eq!(emitted.len(), rounds.len());
		prop_assert_eq!(emitted.into_iter().collect::<Vec<_>>(), rounds);
	}
}
