//! Transaction filtering.
//!
//! Implements rule matching for block transactions:
//! - Field predicates compiled from rule specs
//! - Note decoding and comparison
//! - Recursive search of inner transactions

mod error;
mod matcher;
mod note;
mod predicate;

pub use error::FilterError;
pub use matcher::{CompiledRule, RuleMatcher, TxnMatch, MAX_INNER_DEPTH};
pub use note::{decode as decode_note, NoteMatcher, NotePredicate};
pub use predicate::FieldPredicate;
