//! Algorand node access.
//!
//! - [`NodeClient`]: the node operations the engine consumes
//! - [`AlgodClient`]: HTTP implementation against algod's REST API
//! - [`NodeError`]: node failures, including detection of rounds not yet produced

mod client;
mod error;
mod http;

pub use client::{NodeClient, NodeStatus};
pub use error::NodeError;
pub use http::AlgodClient;

#[cfg(test)]
pub use client::MockNodeClient;
