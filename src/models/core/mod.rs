//! Core domain models.
//!
//! - Rules: declarative match criteria plus the callback run on each match
//! - Transaction summaries emitted by the built-in callback

mod rule;
mod tx_info;

pub use rule::{
	AddressList, CallbackFuture, Emitted, MatchContext, NoteEncoding, NoteRuleSpec, NumericId,
	Rule, RuleCallback, RuleSpec,
};
pub use tx_info::TxInfo;
