//! HTTP implementation of [`NodeClient`] against the algod REST API.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use rmpv::Value;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use url::Url;

use crate::{
	models::{Block, NodeConfig},
	services::algod::{
		client::{NodeClient, NodeStatus},
		error::NodeError,
	},
	utils::http::{create_retryable_http_client, HttpRetryConfig},
};

const TOKEN_HEADER: &str = "X-Algo-API-Token";

/// Error payload returned by algod
#[derive(Debug, Deserialize)]
struct ErrorBody {
	message: String,
}

/// algod REST client
///
/// Blocks are requested in msgpack so that binary fields keep their exact bytes.
#[derive(Clone, Debug)]
pub struct AlgodClient {
	client: Arc<ClientWithMiddleware>,
	base_url: String,
	token: Option<String>,
}

impl AlgodClient {
	pub fn new(config: &NodeConfig) -> Result<Self, NodeError> {
		let url = Url::parse(&config.url)
			.map_err(|e| NodeError::Transport(format!("invalid node url {}: {}", config.url, e)))?;

		let base_client = reqwest::ClientBuilder::new()
			.pool_idle_timeout(Duration::from_secs(90))
			.connect_timeout(Duration::from_secs(10))
			.timeout(config.request_timeout())
			.build()?;

		let client = create_retryable_http_client(
			&HttpRetryConfig::with_max_retries(config.max_retries),
			base_client,
		);

		Ok(Self {
			client: Arc::new(client),
			base_url: url.as_str().trim_end_matches('/').to_string(),
			token: config.token.clone().filter(|t| !t.is_empty()),
		})
	}

	async fn get(&self, path: &str) -> Result<reqwest::Response, NodeError> {
		let mut request = self.client.get(format!("{}{}", self.base_url, path));
		if let Some(token) = &self.token {
			request = request.header(TOKEN_HEADER, token);
		}
		let response = request.send().await?;

		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.ok().filter(|b| !b.is_empty());
		let message = body
			.as_deref()
			.and_then(|b| serde_json::from_str::<ErrorBody>(b).ok())
			.map(|b| b.message)
			.unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

		Err(NodeError::Request {
			status: status.as_u16(),
			message,
			body,
		})
	}

	async fn get_status(&self, path: &str) -> Result<NodeStatus, NodeError> {
		let response = self.get(path).await?;
		let bytes = response.bytes().await?;
		let status: NodeStatus =
			serde_json::from_slice(&bytes).map_err(|e| NodeError::Decode(e.to_string()))?;

		if status.last_round == 0 {
			return Err(NodeError::NoLastRound);
		}
		Ok(status)
	}
}

#[async_trait]
impl NodeClient for AlgodClient {
	async fn block(&self, round: u64) -> Result<Block, NodeError> {
		let response = self
			.get(&format!("/v2/blocks/{}?format=msgpack", round))
			.await?;
		let bytes = response.bytes().await?;
		decode_block_response(round, &bytes)
	}

	async fn status(&self) -> Result<NodeStatus, NodeError> {
		self.get_status("/v2/status").await
	}

	async fn status_after_block(&self, round: u64) -> Result<NodeStatus, NodeError> {
		self.get_status(&format!("/v2/status/wait-for-block-after/{}", round))
			.await
	}
}

/// Extracts the block from a msgpack `{block, cert}` response
fn decode_block_response(round: u64, bytes: &[u8]) -> Result<Block, NodeError> {
	let mut reader = bytes;
	let value =
		rmpv::decode::read_value(&mut reader).map_err(|e| NodeError::Decode(e.to_string()))?;

	let block = match value {
		Value::Map(entries) => entries
			.into_iter()
			.find(|(k, _)| k.as_str() == Some("block"))
			.map(|(_, v)| v),
		_ => None,
	}
	.ok_or(NodeError::MissingBlock(round))?;

	rmpv::ext::from_value(block).map_err(|e| NodeError::Decode(e.to_string()))
}
