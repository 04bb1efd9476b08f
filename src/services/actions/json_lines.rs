//! Action sink writing one JSON document per line.

use async_trait::async_trait;
use serde::Serialize;
use std::{
	marker::PhantomData,
	path::Path,
	sync::atomic::{AtomicU64, Ordering},
};
use tokio::{
	fs::OpenOptions,
	io::{AsyncWrite, AsyncWriteExt, BufWriter},
	sync::Mutex,
};

use crate::services::actions::{ActionSink, SinkError};

type Writer = BufWriter<Box<dyn AsyncWrite + Send + Unpin>>;

/// Lines kept in memory before they are written out
const DEFAULT_FLUSH_THRESHOLD: usize = 64;

/// Writes actions as JSON lines to a file or stdout
///
/// Ingested actions are serialized immediately and kept in a backlog until the backlog
/// reaches the flush threshold or [`ActionSink::persist`] is called.
pub struct JsonLinesSink<T> {
	writer: Mutex<Writer>,
	backlog: Mutex<Vec<String>>,
	flush_threshold: usize,
	written: AtomicU64,
	_action: PhantomData<fn(T)>,
}

impl<T> JsonLinesSink<T> {
	pub fn from_writer(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
		Self {
			writer: Mutex::new(BufWriter::new(Box::new(writer))),
			backlog: Mutex::new(Vec::new()),
			flush_threshold: DEFAULT_FLUSH_THRESHOLD,
			written: AtomicU64::new(0),
			_action: PhantomData,
		}
	}

	pub fn stdout() -> Self {
		Self::from_writer(tokio::io::stdout())
	}

	/// Appends to the file at `path`, creating it when missing
	pub async fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
		let file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(path.as_ref())
			.await?;
		Ok(Self::from_writer(file))
	}

	pub fn with_flush_threshold(mut self, lines: usize) -> Self {
		self.flush_threshold = lines.max(1);
		self
	}

	/// Number of lines written out so far
	pub fn written(&self) -> u64 {
		self.written.load(Ordering::Relaxed)
	}

	async fn write_lines(&self, lines: Vec<String>) -> Result<(), SinkError> {
		if lines.is_empty() {
			return Ok(());
		}
		let mut writer = self.writer.lock().await;
		for line in &lines {
			writer.write_all(line.as_bytes()).await?;
			writer.write_all(b"\n").await?;
		}
		self.written
			.fetch_add(lines.len() as u64, Ordering::Relaxed);
		Ok(())
	}
}

#[async_trait]
impl<T> ActionSink for JsonLinesSink<T>
where
	T: Serialize + Send + Sync + 'static,
{
	type Action = T;

	async fn ingest(&self, actions: Vec<T>) -> Result<(), SinkError> {
		let lines = actions
			.iter()
			.map(serde_json::to_string)
			.collect::<Result<Vec<_>, _>>()?;

		let ready = {
			let mut backlog = self.backlog.lock().await;
			backlog.extend(lines);
			if backlog.len() >= self.flush_threshold {
				std::mem::take(&mut *backlog)
			} else {
				Vec::new()
			}
		};
		self.write_lines(ready).await
	}

	async fn persist(&self) -> Result<(), SinkError> {
		let pending = std::mem::take(&mut *self.backlog.lock().await);
		self.write_lines(pending).await?;
		self.writer.lock().await.flush().await?;
		Ok(())
	}

	async fn await_completion(&self) -> Result<(), SinkError> {
		// Holding the writer lock means no write is in progress.
		self.writer.lock().await.flush().await?;
		Ok(())
	}

	async fn round_processed(&self, round: u64, txn_count: usize, match_count: usize) {
		tracing::trace!(round, txn_count, match_count, "Round processed");
	}
}
