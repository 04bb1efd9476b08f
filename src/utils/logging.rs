//! Logging utilities for the application
//!
//! Logs are written through `tracing_subscriber`. The filter comes from, in order:
//! an explicit level (the `--log-level` flag), `RUST_LOG`, `LOG_LEVEL`, and finally `info`.
//!
//! Output goes to stderr so that actions written to stdout stay machine readable.
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Environment variable holding a plain log level, consulted when `RUST_LOG` is unset
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

const DEFAULT_LEVEL: &str = "info";

/// Builds the log filter from the first usable directive
///
/// Invalid directives are skipped rather than rejected, so a typo in the environment
/// never prevents the engine from starting.
pub fn resolve_filter(
	explicit: Option<&str>,
	rust_log: Option<&str>,
	log_level: Option<&str>,
) -> EnvFilter {
	[explicit, rust_log, log_level]
		.into_iter()
		.flatten()
		.map(str::trim)
		.filter(|directive| !directive.is_empty())
		.find_map(|directive| EnvFilter::try_new(directive).ok())
		.unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL))
}

/// Setup logging for the application
///
/// Writes to stderr. `level` takes precedence over the environment.
pub fn setup_logging(
	level: Option<&str>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
	setup_logging_with_writer(level, std::io::stderr)?;
	Ok(())
}

/// Setup logging for the application with a custom writer
pub fn setup_logging_with_writer<W>(
	level: Option<&str>,
	writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>
where
	W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
	let rust_log = std::env::var("RUST_LOG").ok();
	let log_level = std::env::var(LOG_LEVEL_ENV).ok();
	let filter = resolve_filter(level, rust_log.as_deref(), log_level.as_deref());

	tracing_subscriber::registry()
		.with(filter)
		.with(
			fmt::layer()
				.with_writer(writer)
				.event_format(
					fmt::format()
						.with_level(true)
						.with_target(true)
						.with_thread_ids(false)
						.with_thread_names(false)
						.with_ansi(false)
						.compact(),
				)
				.fmt_fields(fmt::format::PrettyFields::new()),
		)
		.try_init()?;
	Ok(())
}
