//! Integration tests for the event engine: scheduling, retries and shutdown.

use algo_events::{
	models::{Block, Direction, EngineConfig, Emitted, Rule},
	services::{
		algod::{NodeError, NodeStatus},
		engine::{EngineError, EngineState, EventEngine, RuleSource},
	},
	utils::{
		backoff::BackoffConfig,
		tests::{BlockBuilder, RuleSpecBuilder, TransactionBuilder},
	},
};
use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Mutex,
	},
};

use crate::integration::mocks::{MockNodeClient, RecordingSink};

fn block(round: u64) -> Block {
	BlockBuilder::new()
		.round(round)
		.txn(TransactionBuilder::new().kind("pay").amount(round).build())
		.txn(TransactionBuilder::new().kind("axfer").build())
		.build()
}

fn payment_rules() -> Vec<Rule<String>> {
	vec![Rule::sync(
		RuleSpecBuilder::new().label("payments").kind("pay").build(),
		|ctx| Ok(Emitted::One(format!("pay@{}", ctx.block.round))),
	)]
}

fn config(direction: Direction, threads: usize, max_failures: u32) -> EngineConfig {
	EngineConfig {
		threads,
		direction,
		backoff: BackoffConfig {
			multiplier_ms: 50,
			max_wait_ms: 500,
			max_failures,
		},
		..EngineConfig::default()
	}
}

fn serving_client() -> MockNodeClient {
	let mut client = MockNodeClient::new();
	client.expect_block().returning(|round| Ok(block(round)));
	client
		.expect_status()
		.returning(|| Ok(NodeStatus { last_round: 1_000 }));
	client
}

#[tokio::test]
async fn test_sequential_forward_scan() {
	let sink = Arc::new(RecordingSink::default());
	let engine = EventEngine::new(
		Arc::new(serving_client()),
		sink.clone(),
		payment_rules(),
		config(Direction::Forward, 1, 3),
	)
	.unwrap();

	engine.run(Some(100), Some(103)).await.unwrap();

	assert_eq!(
		sink.actions().await,
		vec!["pay@100", "pay@101", "pay@102", "pay@103"]
	);
	assert_eq!(*sink.rounds.lock().await, vec![100, 101, 102, 103]);
	assert_eq!(
		*sink.calls.lock().await,
		vec!["persist", "await_completion", "persist"]
	);
	assert_eq!(engine.last_round(), Some(103));
	assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn test_sequential_backward_scan() {
	let sink = Arc::new(RecordingSink::default());
	let engine = EventEngine::new(
		Arc::new(serving_client()),
		sink.clone(),
		payment_rules(),
		config(Direction::Backward, 1, 3),
	)
	.unwrap();

	engine.run(Some(103), Some(100)).await.unwrap();

	assert_eq!(
		sink.actions().await,
		vec!["pay@103", "pay@102", "pay@101", "pay@100"]
	);
	assert_eq!(engine.last_round(), Some(100));
}

#[tokio::test]
async fn test_round_without_matches_is_not_ingested() {
	let mut client = MockNodeClient::new();
	client.expect_block().returning(|round| {
		Ok(BlockBuilder::new()
			.round(round)
			.txn(TransactionBuilder::new().kind("appl").build())
			.build())
	});
	let sink = Arc::new(RecordingSink::default());
	let engine = EventEngine::new(
		Arc::new(client),
		sink.clone(),
		payment_rules(),
		config(Direction::Forward, 1, 3),
	)
	.unwrap();

	engine.run(Some(5), Some(6)).await.unwrap();

	assert!(sink.batches.lock().await.is_empty());
	assert_eq!(*sink.rounds.lock().await, vec![5, 6]);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried_in_order() {
	let attempts = Arc::new(AtomicUsize::new(0));
	let mut client = MockNodeClient::new();
	{
		let attempts = attempts.clone();
		client.expect_block().returning(move |round| {
			// Round 101 fails twice before it is served
			if round == 101 && attempts.fetch_add(1, Ordering::SeqCst) < 2 {
				return Err(NodeError::Transport("connection reset".into()));
			}
			Ok(block(round))
		});
	}
	let sink = Arc::new(RecordingSink::default());
	let engine = EventEngine::new(
		Arc::new(client),
		sink.clone(),
		payment_rules(),
		config(Direction::Forward, 1, 3),
	)
	.unwrap();

	engine.run(Some(100), Some(102)).await.unwrap();

	assert_eq!(sink.actions().await, vec!["pay@100", "pay@101", "pay@102"]);
	assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_sequential_exhaustion_is_fatal() {
	let mut client = MockNodeClient::new();
	client.expect_block().returning(|round| {
		if round >= 101 {
			Err(NodeError::Request {
				status: 500,
				message: "internal error".into(),
				body: None,
			})
		} else {
			Ok(block(round))
		}
	});
	let sink = Arc::new(RecordingSink::default());
	let engine = EventEngine::new(
		Arc::new(client),
		sink.clone(),
		payment_rules(),
		config(Direction::Forward, 1, 2),
	)
	.unwrap();

	let err = engine.run(Some(100), None).await.unwrap_err();

	assert!(matches!(
		err,
		EngineError::RetriesExhausted { round: 101, failures: 3, .. }
	));
	assert_eq!(engine.last_round(), Some(100));
	assert_eq!(engine.state(), EngineState::Stopped);
	assert!(sink.calls.lock().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_not_yet_produced_round_waits_for_the_node() {
	let produced = Arc::new(AtomicUsize::new(0));
	let mut client = MockNodeClient::new();
	{
		let produced = produced.clone();
		client.expect_block().returning(move |round| {
			if round == 201 && produced.load(Ordering::SeqCst) == 0 {
				return Err(NodeError::Request {
					status: 404,
					message: "ledger does not have entry 201".into(),
					body: None,
				});
			}
			Ok(block(round))
		});
	}
	{
		let produced = produced.clone();
		client
			.expect_status_after_block()
			.withf(|round| *round == 200)
			.times(1)
			.returning(move |_| {
				produced.store(1, Ordering::SeqCst);
				Ok(NodeStatus { last_round: 201 })
			});
	}
	let sink = Arc::new(RecordingSink::default());
	let engine = EventEngine::new(
		Arc::new(client),
		sink.clone(),
		payment_rules(),
		config(Direction::Forward, 1, 1),
	)
	.unwrap();

	engine.run(Some(200), Some(201)).await.unwrap();

	assert_eq!(sink.actions().await, vec!["pay@200", "pay@201"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pooled_scan_processes_each_round_once() {
	let fetched = Arc::new(Mutex::new(HashMap::<u64, usize>::new()));
	let mut client = MockNodeClient::new();
	{
		let fetched = fetched.clone();
		client.expect_block().returning(move |round| {
			*fetched.lock().unwrap().entry(round).or_default() += 1;
			Ok(block(round))
		});
	}
	let sink = Arc::new(RecordingSink::default());
	let engine = EventEngine::new(
		Arc::new(client),
		sink.clone(),
		payment_rules(),
		config(Direction::Forward, 3, 3),
	)
	.unwrap();

	let summary = engine.run_rounds(vec![10, 11, 12]).await.unwrap();

	assert_eq!(summary.processed, vec![10, 11, 12]);
	assert!(summary.abandoned.is_empty());
	let fetched = fetched.lock().unwrap();
	assert_eq!(fetched.len(), 3);
	assert!(fetched.values().all(|count| *count == 1));
	let mut actions = sink.actions().await;
	actions.sort();
	assert_eq!(actions, vec!["pay@10", "pay@11", "pay@12"]);
	assert_eq!(sink.batches.lock().await.len(), 3);
	assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_pooled_scan_abandons_only_the_failing_round() {
	let mut client = MockNodeClient::new();
	client.expect_block().returning(|round| {
		if round == 21 {
			Err(NodeError::Decode("truncated".into()))
		} else {
			Ok(block(round))
		}
	});
	let sink = Arc::new(RecordingSink::default());
	let engine = EventEngine::new(
		Arc::new(client),
		sink.clone(),
		payment_rules(),
		config(Direction::Forward, 2, 2),
	)
	.unwrap();

	let summary = engine.run_rounds(vec![20, 21, 22, 23]).await.unwrap();

	assert_eq!(summary.processed, vec![20, 22, 23]);
	assert_eq!(summary.abandoned, vec![21]);
	assert_eq!(
		*sink.calls.lock().await,
		vec!["persist", "await_completion", "persist"]
	);
}

#[tokio::test]
async fn test_pooled_scan_of_no_rounds() {
	let sink = Arc::new(RecordingSink::default());
	let engine = EventEngine::new(
		Arc::new(MockNodeClient::new()),
		sink.clone(),
		payment_rules(),
		config(Direction::Forward, 4, 3),
	)
	.unwrap();

	let summary = engine.run_rounds(Vec::new()).await.unwrap();

	assert!(summary.processed.is_empty());
	assert_eq!(engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn test_inner_rule_dispatches_outer_transaction() {
	let mut client = MockNodeClient::new();
	client.expect_block().returning(|round| {
		let outer = algo_events::models::SignedTxnInBlock::new(
			TransactionBuilder::new().kind("appl").app_id(7).build(),
		)
		.with_inner(vec![algo_events::models::SignedTxnInBlock::new(
			TransactionBuilder::new().kind("axfer").asset_id(31566704).build(),
		)]);
		Ok(BlockBuilder::new().round(round).outer(outer).build())
	});
	let sink = Arc::new(RecordingSink::default());
	let rules = vec![Rule::sync(
		RuleSpecBuilder::new().asset_id(31566704).inner(true).build(),
		|ctx| {
			Ok(Emitted::One(format!(
				"{}:{}",
				ctx.txn.kind().unwrap_or_default(),
				ctx.txn.app_id().unwrap_or_default()
			)))
		},
	)];
	let engine = EventEngine::new(
		Arc::new(client),
		sink.clone(),
		rules,
		config(Direction::Forward, 1, 1),
	)
	.unwrap();

	engine.run(Some(1), Some(1)).await.unwrap();

	assert_eq!(sink.actions().await, vec!["appl:7"]);
}

#[tokio::test]
async fn test_async_supplier_and_observer() {
	let observed = Arc::new(Mutex::new(Vec::new()));
	let source = RuleSource::supplier(|| async { Ok(payment_rules()) });
	let sink = Arc::new(RecordingSink::default());
	let engine = EventEngine::new(
		Arc::new(serving_client()),
		sink.clone(),
		source,
		config(Direction::Forward, 1, 1),
	)
	.unwrap()
	.with_observer({
		let observed = observed.clone();
		Arc::new(move |round| {
			observed.lock().unwrap().push(round);
			anyhow::ensure!(round != 2, "observer failure");
			Ok(())
		})
	});

	engine.run(Some(1), Some(3)).await.unwrap();

	assert_eq!(*observed.lock().unwrap(), vec![1, 2, 3]);
	assert_eq!(sink.actions().await, vec!["pay@1", "pay@2", "pay@3"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_graceful_stop_drains_before_persisting() {
	let sink = Arc::new(RecordingSink::default());
	let engine = Arc::new(EventEngine::new(
		Arc::new(serving_client()),
		sink.clone(),
		payment_rules(),
		config(Direction::Forward, 1, 3),
	).unwrap());
	let mut state = engine.subscribe_state();

	let runner = {
		let engine = engine.clone();
		tokio::spawn(async move { engine.run(None, None).await })
	};
	state
		.wait_for(|s| *s == EngineState::Running)
		.await
		.unwrap();
	engine.graceful_stop().await;
	runner.await.unwrap().unwrap();

	assert_eq!(engine.state(), EngineState::Stopped);
	let ingested = sink.batches.lock().await.len() as u64;
	match engine.last_round() {
		Some(last) => assert_eq!(last, 1_000 + ingested - 1),
		None => assert_eq!(ingested, 0),
	}
	assert_eq!(
		*sink.calls.lock().await,
		vec!["persist", "await_completion", "persist"]
	);
}
