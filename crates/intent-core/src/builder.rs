use crate::{EngineError, IntentEngine};
use intent_chain::{ChainError, ChainInterface, ChainService};
use intent_config::Config;
use intent_execution::{
	BalanceRefresher, ChainBalanceRefresher, OrchestratorConfig, TransactionOrchestrator,
};
use intent_journal::{Journal, JournalError, JournalInterface};
use intent_pool::{PoolResolver, TokenRegistry};
use intent_router::{
	IntentParser, IntentRouter, ParserError, ParserService, QueryReporter, RouterConfig,
	TracingQueryReporter,
};
use intent_types::{EventBus, Token};
use std::collections::HashMap;
use std::sync::Arc;

type ChainFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn ChainInterface>, ChainError> + Send>;
type ParserFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn IntentParser>, ParserError> + Send>;
type JournalFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn JournalInterface>, JournalError> + Send>;

const EVENT_BUS_CAPACITY: usize = 1000;

// Factory pattern for creating services from config
pub struct EngineBuilder {
	config: Config,
	chain_factories: HashMap<String, ChainFactory>,
	parser_factories: HashMap<String, ParserFactory>,
	journal_factories: HashMap<String, JournalFactory>,
	reporter: Option<Box<dyn QueryReporter>>,
	refresher: Option<Arc<dyn BalanceRefresher>>,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			chain_factories: HashMap::new(),
			parser_factories: HashMap::new(),
			journal_factories: HashMap::new(),
			reporter: None,
			refresher: None,
		}
	}

	pub fn with_chain_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn ChainInterface>, ChainError> + Send + 'static,
	{
		self.chain_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_parser_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn IntentParser>, ParserError> + Send + 'static,
	{
		self.parser_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_journal_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn JournalInterface>, JournalError> + Send + 'static,
	{
		self.journal_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Replaces the default reporter, which only logs queries.
	pub fn with_query_reporter(mut self, reporter: Box<dyn QueryReporter>) -> Self {
		self.reporter = Some(reporter);
		self
	}

	/// Replaces the default post-confirmation refresher, which reads from chain.
	pub fn with_balance_refresher(mut self, refresher: Arc<dyn BalanceRefresher>) -> Self {
		self.refresher = Some(refresher);
		self
	}

	pub fn build(self) -> Result<IntentEngine, EngineError> {
		let config = self.config;

		// Chain client
		let chain_factory = self
			.chain_factories
			.get(&config.chain.provider)
			.ok_or_else(|| {
				EngineError::Config(format!(
					"No chain factory registered for provider '{}'",
					config.chain.provider
				))
			})?;
		let chain = Arc::new(
			ChainService::new(chain_factory(&config.chain.config)?, config.chain.confirmations)
				.with_confirmation_timeout(config.chain.confirmation_timeout()),
		);

		// Token table: built-in list plus configured extras
		let mut registry = TokenRegistry::with_defaults(config.contracts.wrapped_native);
		for entry in &config.tokens {
			if !registry.register(Token::erc20(entry.address, entry.symbol.clone(), entry.decimals)) {
				return Err(EngineError::Config(format!(
					"Token {} cannot be registered",
					entry.symbol
				)));
			}
		}
		let resolver = Arc::new(PoolResolver::new(
			chain.clone(),
			Arc::new(registry),
			config.contracts.factory,
		));

		let engine = &config.engine;
		let router = IntentRouter::new(
			chain.clone(),
			resolver,
			RouterConfig {
				router: config.contracts.router,
				default_slippage_bps: engine.default_slippage_bps,
				fee_bps: engine.fee_bps,
				max_price_impact_bps: engine.max_price_impact_bps,
				gas_reserve: engine.gas_reserve_wei().map_err(EngineError::Config)?,
				deadline_window: engine.deadline_window(),
			},
		);

		let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
		let refresher = self
			.refresher
			.unwrap_or_else(|| Arc::new(ChainBalanceRefresher::new(chain.clone())));
		let orchestrator = TransactionOrchestrator::new(
			chain.clone(),
			refresher,
			event_bus.clone(),
			OrchestratorConfig {
				approval_multiplier: engine.approval_multiplier,
				refresh_delay: engine.refresh_delay(),
			},
		);

		// Parser is optional; without one only structured intents are accepted
		let parser = match &config.parser {
			Some(parser_config) => {
				let factory = self
					.parser_factories
					.get(&parser_config.provider)
					.ok_or_else(|| {
						EngineError::Config(format!(
							"No parser factory registered for provider '{}'",
							parser_config.provider
						))
					})?;
				Some(ParserService::new(
					factory(&parser_config.config)?,
					parser_config.confidence_threshold,
				))
			}
			None => None,
		};

		let journal_factory = self
			.journal_factories
			.get(&config.journal.backend)
			.ok_or_else(|| {
				EngineError::Config(format!(
					"No journal factory registered for backend '{}'",
					config.journal.backend
				))
			})?;
		let journal = Journal::new(journal_factory(&config.journal.config)?);

		tracing::info!(
			name = %config.engine.name,
			account = %chain.account(),
			router = %config.contracts.router,
			parser = parser.is_some(),
			"Built intent engine"
		);

		Ok(IntentEngine {
			chain,
			parser,
			router,
			orchestrator,
			journal,
			reporter: self
				.reporter
				.unwrap_or_else(|| Box::new(TracingQueryReporter)),
			event_bus,
			config,
		})
	}
}
