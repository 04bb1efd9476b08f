use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared position in a fixed list of rounds
///
/// Each call to [`claim`](Self::claim) hands out the next round exactly once, however
/// many workers claim concurrently.
#[derive(Debug)]
pub struct RoundCursor {
	rounds: Vec<u64>,
	next: AtomicUsize,
}

impl RoundCursor {
	pub fn new(rounds: Vec<u64>) -> Self {
		Self {
			rounds,
			next: AtomicUsize::new(0),
		}
	}

	/// Claims the next unclaimed round, `None` once the list is exhausted
	pub fn claim(&self) -> Option<u64> {
		let index = self.next.fetch_add(1, Ordering::SeqCst);
		self.rounds.get(index).copied()
	}

	pub fn len(&self) -> usize {
		self.rounds.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rounds.is_empty()
	}

	/// Number of rounds handed out so far
	pub fn claimed(&self) -> usize {
		self.next.load(Ordering::SeqCst).min(self.rounds.len())
	}
}
