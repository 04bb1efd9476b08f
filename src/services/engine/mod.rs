//! Round scheduling, processing and engine lifecycle.
//!
//! - `processor`: Fetches one round, matches it and dispatches its actions
//! - `service`: Sequential and pooled scheduling plus start and stop
//! - `cursor`: Shared position in a fixed list of rounds
//! - `state`: Engine lifecycle states

mod cursor;
mod error;
mod processor;
mod service;
mod state;

pub use cursor::RoundCursor;
pub use error::{EngineError, RoundError};
pub use processor::{RoundObserver, RoundOutcome, RoundProcessor};
pub use service::{EventEngine, PoolSummary, RuleSource, RuleSupplier};
pub use state::EngineState;
