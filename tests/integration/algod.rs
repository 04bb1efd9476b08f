//! Integration tests for the HTTP node client against a mock algod server.

use algo_events::{
	models::NodeConfig,
	services::algod::{AlgodClient, NodeClient, NodeError},
};
use mockito::{Matcher, Server};
use rmpv::Value;

fn config(url: &str) -> NodeConfig {
	NodeConfig {
		url: url.to_string(),
		token: Some("secret".to_string()),
		max_retries: 0,
		..NodeConfig::default()
	}
}

fn block_response(round: u64) -> Vec<u8> {
	let txn = Value::Map(vec![
		(Value::from("type"), Value::from("pay")),
		(Value::from("amt"), Value::from(5_000u64)),
		(Value::from("snd"), Value::Binary(vec![1u8; 32])),
	]);
	let inner = Value::Map(vec![(
		Value::from("txn"),
		Value::Map(vec![(Value::from("type"), Value::from("axfer"))]),
	)]);
	let outer = Value::Map(vec![
		(Value::from("txn"), txn),
		(
			Value::from("dt"),
			Value::Map(vec![(Value::from("itx"), Value::Array(vec![inner]))]),
		),
	]);
	let block = Value::Map(vec![
		(Value::from("rnd"), Value::from(round)),
		(Value::from("ts"), Value::from(1_700_000_000i64)),
		(Value::from("gen"), Value::from("testnet-v1.0")),
		(Value::from("gh"), Value::Binary(vec![9u8; 32])),
		(Value::from("txns"), Value::Array(vec![outer])),
	]);
	let response = Value::Map(vec![
		(Value::from("block"), block),
		(Value::from("cert"), Value::Map(Vec::new())),
	]);

	let mut bytes = Vec::new();
	rmpv::encode::write_value(&mut bytes, &response).unwrap();
	bytes
}

#[tokio::test]
async fn test_fetch_block() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/v2/blocks/42")
		.match_query(Matcher::UrlEncoded("format".into(), "msgpack".into()))
		.match_header("X-Algo-API-Token", "secret")
		.with_status(200)
		.with_header("content-type", "application/msgpack")
		.with_body(block_response(42))
		.create_async()
		.await;

	let client = AlgodClient::new(&config(&server.url())).unwrap();
	let block = client.block(42).await.unwrap();

	assert_eq!(block.round, 42);
	assert_eq!(block.genesis_id, "testnet-v1.0");
	assert_eq!(block.genesis_hash, vec![9u8; 32]);
	let txns = block.transactions();
	assert_eq!(txns.len(), 1);
	assert_eq!(txns[0].txn.kind(), Some("pay"));
	assert_eq!(txns[0].txn.amount(), 5_000);
	assert_eq!(txns[0].inner_txns().len(), 1);
	assert_eq!(txns[0].inner_txns()[0].txn.kind(), Some("axfer"));
	mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_round_is_not_yet_produced() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/v2/blocks/99999999")
		.match_query(Matcher::Any)
		.with_status(404)
		.with_body(r#"{"message":"failed to retrieve information from the ledger"}"#)
		.create_async()
		.await;

	let client = AlgodClient::new(&config(&server.url())).unwrap();
	let err = client.block(99_999_999).await.unwrap_err();

	match &err {
		NodeError::Request { status, message, .. } => {
			assert_eq!(*status, 404);
			assert_eq!(message, "failed to retrieve information from the ledger");
		}
		other => panic!("unexpected error: {:?}", other),
	}
	assert!(err.is_not_yet_produced());
	mock.assert_async().await;
}

#[tokio::test]
async fn test_other_errors_keep_their_body() {
	let mut server = Server::new_async().await;
	server
		.mock("GET", "/v2/blocks/7")
		.match_query(Matcher::Any)
		.with_status(401)
		.with_body("Invalid API Token")
		.create_async()
		.await;

	let client = AlgodClient::new(&config(&server.url())).unwrap();
	let err = client.block(7).await.unwrap_err();

	assert!(!err.is_not_yet_produced());
	match err {
		NodeError::Request { status, body, .. } => {
			assert_eq!(status, 401);
			assert_eq!(body.as_deref(), Some("Invalid API Token"));
		}
		other => panic!("unexpected error: {:?}", other),
	}
}

#[tokio::test]
async fn test_status_and_wait_for_block() {
	let mut server = Server::new_async().await;
	let status = server
		.mock("GET", "/v2/status")
		.with_status(200)
		.with_body(r#"{"last-round": 1234, "time-since-last-round": 100}"#)
		.create_async()
		.await;
	let wait = server
		.mock("GET", "/v2/status/wait-for-block-after/1234")
		.with_status(200)
		.with_body(r#"{"last-round": 1235}"#)
		.create_async()
		.await;

	let client = AlgodClient::new(&config(&server.url())).unwrap();

	assert_eq!(client.status().await.unwrap().last_round, 1234);
	assert_eq!(
		client.status_after_block(1234).await.unwrap().last_round,
		1235
	);
	status.assert_async().await;
	wait.assert_async().await;
}

#[tokio::test]
async fn test_zero_last_round_is_an_error() {
	let mut server = Server::new_async().await;
	server
		.mock("GET", "/v2/status")
		.with_status(200)
		.with_body(r#"{"last-round": 0}"#)
		.create_async()
		.await;

	let client = AlgodClient::new(&config(&server.url())).unwrap();

	assert!(matches!(
		client.status().await,
		Err(NodeError::NoLastRound)
	));
}

#[tokio::test]
async fn test_response_without_block() {
	let mut server = Server::new_async().await;
	let mut body = Vec::new();
	rmpv::encode::write_value(
		&mut body,
		&Value::Map(vec![(Value::from("cert"), Value::Map(Vec::new()))]),
	)
	.unwrap();
	server
		.mock("GET", "/v2/blocks/3")
		.match_query(Matcher::Any)
		.with_status(200)
		.with_body(body)
		.create_async()
		.await;

	let client = AlgodClient::new(&config(&server.url())).unwrap();

	assert!(matches!(
		client.block(3).await,
		Err(NodeError::MissingBlock(3))
	));
}

#[test]
fn test_invalid_url_is_rejected() {
	assert!(AlgodClient::new(&config("not a url")).is_err());
}
