//! Algorand event ingestion entry point.
//!
//! Loads the configuration and a JSON rule file, then scans rounds from an algod node and
//! writes a [`TxInfo`] line for every transaction a rule matches.
//!
//! # Modes
//! - `--rounds 10,11,12` (or `--rounds @file`) processes exactly those rounds with
//!   `--threads` concurrent workers
//! - otherwise rounds are scanned one at a time from `--since` (default: the node's current
//!   round) up to `--until`, backward with `--backwards`
//!
//! The first Ctrl+C drains in-flight rounds and flushes the actions; a second one stops
//! immediately.

use algo_events::{
	models::{AppConfig, ConfigLoader, Direction, Emitted, Rule, RuleSet, TxInfo},
	services::{
		actions::JsonLinesSink,
		algod::{AlgodClient, NodeClient},
		engine::EventEngine,
	},
	utils::{
		encoding::{AlgorandCodec, TransactionCodec},
		logging::setup_logging,
	},
};

use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use dotenvy::dotenv;
use std::{path::PathBuf, sync::Arc};
use tracing::{error, info, warn};

fn cli() -> Command {
	Command::new("algo-events")
		.version(env!("CARGO_PKG_VERSION"))
		.about(
			"Scans Algorand blocks and emits a line for every transaction matching the \
			 configured rules.",
		)
		.arg(
			Arg::new("config")
				.long("config")
				.help("Path to the JSON configuration file")
				.value_name("PATH"),
		)
		.arg(
			Arg::new("rules")
				.long("rules")
				.help("Path to the JSON rule file (overrides rules_path)")
				.value_name("PATH"),
		)
		.arg(
			Arg::new("since")
				.long("since")
				.help("First round to process (default: the node's current round)")
				.value_name("ROUND")
				.value_parser(clap::value_parser!(u64)),
		)
		.arg(
			Arg::new("until")
				.long("until")
				.help("Last round to process")
				.value_name("ROUND")
				.value_parser(clap::value_parser!(u64)),
		)
		.arg(
			Arg::new("backwards")
				.long("backwards")
				.help("Scan toward older rounds")
				.action(clap::ArgAction::SetTrue),
		)
		.arg(
			Arg::new("rounds")
				.long("rounds")
				.help("Fixed rounds to process, comma separated or @file")
				.value_name("ROUNDS")
				.conflicts_with_all(["since", "until", "backwards"]),
		)
		.arg(
			Arg::new("threads")
				.long("threads")
				.help("Concurrent workers for --rounds")
				.value_name("N")
				.value_parser(clap::value_parser!(usize)),
		)
		.arg(
			Arg::new("algod-url")
				.long("algod-url")
				.help("Algod node URL")
				.value_name("URL"),
		)
		.arg(
			Arg::new("algod-token")
				.long("algod-token")
				.help("Algod API token")
				.value_name("TOKEN"),
		)
		.arg(
			Arg::new("actions-out")
				.long("actions-out")
				.help("File receiving the emitted actions (default: stdout)")
				.value_name("PATH"),
		)
		.arg(
			Arg::new("log-level")
				.long("log-level")
				.help("Set log level (trace, debug, info, warn, error)")
				.value_name("LEVEL"),
		)
}

/// Loads the configuration file, then applies the environment and the command line
fn load_config(matches: &ArgMatches) -> anyhow::Result<AppConfig> {
	let mut config = match matches.get_one::<String>("config") {
		Some(path) => AppConfig::load_from_path(path.as_ref())
			.with_context(|| format!("Failed to load configuration from {}", path))?,
		None => AppConfig::default(),
	};
	config.node.apply_env();

	if let Some(url) = matches.get_one::<String>("algod-url") {
		config.node.url = url.clone();
	}
	if let Some(token) = matches.get_one::<String>("algod-token") {
		config.node.token = Some(token.clone());
	}
	if let Some(threads) = matches.get_one::<usize>("threads") {
		config.engine.threads = *threads;
	}
	if matches.get_flag("backwards") {
		config.engine.direction = Direction::Backward;
	}
	if let Some(path) = matches.get_one::<String>("rules") {
		config.rules_path = Some(PathBuf::from(path));
	}
	if let Some(path) = matches.get_one::<String>("actions-out") {
		config.actions_path = Some(PathBuf::from(path));
	}

	config.validate()?;
	Ok(config)
}

/// Parses `--rounds`: a comma separated list, or `@path` to a file of rounds separated by
/// commas or whitespace
fn parse_rounds(value: &str) -> anyhow::Result<Vec<u64>> {
	let text = match value.strip_prefix('@') {
		Some(path) => std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read rounds from {}", path))?,
		None => value.to_string(),
	};

	text.split(|c: char| c == ',' || c.is_whitespace())
		.filter(|part| !part.is_empty())
		.map(|part| {
			part.parse::<u64>()
				.with_context(|| format!("Invalid round number: {}", part))
		})
		.collect()
}

/// Attaches the [`TxInfo`] callback to every rule of the file
fn tx_info_rules(rule_set: RuleSet) -> Vec<Rule<TxInfo>> {
	let codec: Arc<dyn TransactionCodec> = Arc::new(AlgorandCodec);
	rule_set
		.into_inner()
		.into_iter()
		.map(|spec| {
			let label = spec.label.clone();
			let codec = codec.clone();
			Rule::sync(spec, move |ctx| {
				Ok(Emitted::One(TxInfo::from_match(
					ctx,
					label.clone(),
					codec.as_ref(),
				)))
			})
		})
		.collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let matches = cli().get_matches();

	// Load environment variables from .env file
	dotenv().ok();

	if let Err(e) = setup_logging(matches.get_one::<String>("log-level").map(String::as_str)) {
		eprintln!("Failed to setup logging: {}", e);
	}

	let config = load_config(&matches).inspect_err(|e| error!("{:#}", e))?;

	let rules_path = config
		.rules_path
		.clone()
		.context("No rule file given; use --rules or set rules_path")?;
	let rule_set = RuleSet::load_from_path(&rules_path)
		.with_context(|| format!("Failed to load rules from {}", rules_path.display()))?;
	info!(path = %rules_path.display(), rules = rule_set.len(), "Loaded rules");

	let rounds = matches
		.get_one::<String>("rounds")
		.map(|value| parse_rounds(value))
		.transpose()?;

	let client: Arc<dyn NodeClient> = Arc::new(AlgodClient::new(&config.node)?);
	let sink = Arc::new(match &config.actions_path {
		Some(path) => JsonLinesSink::<TxInfo>::create(path)
			.await
			.with_context(|| format!("Failed to open {}", path.display()))?,
		None => JsonLinesSink::stdout(),
	});

	let engine = Arc::new(EventEngine::new(
		client,
		sink,
		tx_info_rules(rule_set),
		config.engine.clone(),
	)?);

	// Resolves to true once a second signal forced the stop
	let mut signals = {
		let engine = engine.clone();
		tokio::spawn(async move {
			if let Err(e) = tokio::signal::ctrl_c().await {
				error!("Error waiting for Ctrl+C: {}", e);
				return false;
			}
			info!("Shutdown signal received, draining in-flight rounds...");

			let graceful = engine.graceful_stop();
			tokio::pin!(graceful);
			tokio::select! {
				_ = &mut graceful => false,
				_ = tokio::signal::ctrl_c() => {
					warn!("Second shutdown signal received, stopping now");
					engine.force_stop().await;
					true
				}
			}
		})
	};

	let run = async {
		match rounds {
			Some(rounds) => engine.run_rounds(rounds).await.map(|summary| {
				if !summary.abandoned.is_empty() {
					warn!(rounds = ?summary.abandoned, "Some rounds were abandoned");
				}
				info!(
					processed = summary.processed.len(),
					abandoned = summary.abandoned.len(),
					"Finished"
				);
			}),
			None => {
				let since = matches.get_one::<u64>("since").copied();
				let until = matches.get_one::<u64>("until").copied();
				engine.run(since, until).await
			}
		}
	};

	let result = tokio::select! {
		result = run => result,
		Ok(true) = &mut signals => {
			info!(last_round = ?engine.last_round(), "Stopped");
			return Ok(());
		}
	};
	signals.abort();

	if let Err(e) = &result {
		error!(error = %e, last_round = ?engine.last_round(), "Engine stopped with an error");
	}
	result.map_err(Into::into)
}
