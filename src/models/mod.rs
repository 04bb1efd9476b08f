//! Domain models and data structures for event ingestion.
//!
//! - `blockchain`: Blocks and transactions as delivered by the node
//! - `config`: Configuration loading and validation
//! - `core`: Rules, match contexts and transaction summaries

mod blockchain;
mod config;
mod core;

// Re-export blockchain types
pub use blockchain::{ApplyData, Block, SignedTxnInBlock, Transaction};

// Re-export core types
pub use core::{
	AddressList, CallbackFuture, Emitted, MatchContext, NoteEncoding, NoteRuleSpec, NumericId,
	Rule, RuleCallback, RuleSpec, TxInfo,
};

// Re-export config types
pub use config::{
	AppConfig, ConfigError, ConfigLoader, Direction, EngineConfig, NodeConfig, RuleSet,
};
