use anyhow::{Context, Result};
use clap::Parser;
use intent_chain::implementations::evm::alloy::create_alloy_chain;
use intent_config::{Config, ConfigLoader};
use intent_core::{EngineBuilder, IntentEngine};
use intent_journal::implementations::{file::create_file_journal, memory::create_memory_journal};
use intent_router::implementations::openai::create_openai_parser;
use intent_router::Routed;
use intent_types::{Outcome, TradeIntent};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
	let cli = Cli::parse();

	// Initialize tracing
	setup_tracing(&cli.log_level)?;

	if let Commands::Validate = cli.command {
		validate_config(&cli).await?;
		return Ok(ExitCode::SUCCESS);
	}

	let config = load_config(&cli).await?;
	let engine = build_engine(config)?;
	let options = cli.options.route_options();

	let outcome = match (&cli.command, cli.options.dry_run) {
		(Commands::Ask { text }, true) => {
			return match engine.interpret(text).await {
				Ok(intent) => dry_run(&engine, &intent, &cli).await,
				Err(e) => print_rejection(&e),
			}
		}
		(Commands::Ask { text }, false) => engine.submit_text(text, &options).await,
		(Commands::CreatePool { token_a, token_b }, true) => {
			return match engine.plan_pool_creation(token_a, token_b).await {
				Ok(plan) => {
					print_json(&plan.summary())?;
					Ok(ExitCode::SUCCESS)
				}
				Err(e) => print_rejection(&e),
			}
		}
		(Commands::CreatePool { token_a, token_b }, false) => {
			engine.create_pool(token_a, token_b).await
		}
		(command, dry) => {
			let intent = command
				.trade_intent()
				.context("Command does not describe an intent")?;
			if dry {
				return dry_run(&engine, &intent, &cli).await;
			}
			engine.submit_intent(&intent, &options).await
		}
	};

	print_json(&outcome)?;
	Ok(exit_code(&outcome))
}

async fn load_config(cli: &Cli) -> Result<Config> {
	info!("Loading configuration from: {:?}", cli.config);
	ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.context("Failed to load configuration")
}

fn build_engine(config: Config) -> Result<IntentEngine> {
	EngineBuilder::new(config)
		.with_chain_factory("alloy", create_alloy_chain)
		.with_parser_factory("openai", create_openai_parser)
		.with_journal_factory("memory", create_memory_journal)
		.with_journal_factory("file", create_file_journal)
		.build()
		.context("Failed to build engine")
}

async fn dry_run(engine: &IntentEngine, intent: &TradeIntent, cli: &Cli) -> Result<ExitCode> {
	match engine.plan(intent, &cli.options.route_options()).await {
		Ok(Routed::Plan(plan)) => print_json(&plan.summary())?,
		Ok(Routed::Report(request)) => print_json(&request)?,
		Err(e) => return print_rejection(&e),
	}
	Ok(ExitCode::SUCCESS)
}

fn print_rejection(error: &intent_types::IntentError) -> Result<ExitCode> {
	let outcome = Outcome::rejected(None, error);
	print_json(&outcome)?;
	Ok(exit_code(&outcome))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
	let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
	println!("{}", json);
	Ok(())
}

fn exit_code(outcome: &Outcome) -> ExitCode {
	if outcome.is_success() {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	}
}

async fn validate_config(cli: &Cli) -> Result<()> {
	info!("Validating configuration file: {:?}", cli.config);

	let config = load_config(cli).await?;

	info!("Configuration is valid");
	info!("Engine name: {}", config.engine.name);
	info!("Chain provider: {}", config.chain.provider);
	info!("Router: {}", config.contracts.router);
	info!("Factory: {}", config.contracts.factory);
	info!("Extra tokens: {}", config.tokens.len());
	match &config.parser {
		Some(parser) => info!(
			"Parser: {} (confidence threshold {})",
			parser.provider, parser.confidence_threshold
		),
		None => info!("Parser: none, structured commands only"),
	}
	info!("Journal: {}", config.journal.backend);

	Ok(())
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	// stdout carries the JSON result
	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	Ok(())
}
