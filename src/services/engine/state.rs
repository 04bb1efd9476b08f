/// Lifecycle of an [`EventEngine`](super::EventEngine)
///
/// `Idle → Preparing → Running → Draining → Stopped`. There is no way back from
/// `Stopped`; a stop requested before `Running` goes straight to `Draining`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineState {
	#[default]
	Idle,
	/// Resolving the starting round and the rule set
	Preparing,
	Running,
	/// Persisting the action sink after a stop request
	Draining,
	Stopped,
}

impl EngineState {
	/// Whether a stop has been requested or completed
	pub fn is_stopping(self) -> bool {
		matches!(self, Self::Draining | Self::Stopped)
	}
}
