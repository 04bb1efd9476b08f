//! Blockchain data model.
//!
//! Blocks and transactions as delivered by an Algorand node. Transactions keep their raw
//! field map; typed accessors cover the fields rule matching looks at.

mod block;
mod transaction;

pub use block::{ApplyData, Block, SignedTxnInBlock};
pub use transaction::Transaction;
