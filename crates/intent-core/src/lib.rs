//! The AMM intent engine.
//!
//! [`IntentEngine`] ties the pieces together: free text goes through the
//! parser, intents through the router, plans through the orchestrator, and
//! every terminal outcome lands in the journal and on the event bus.
//! [`EngineBuilder`] assembles an engine from configuration and the factory
//! functions of the implementations in use.

use alloy::primitives::Address;
use intent_chain::{ChainError, ChainService};
use intent_config::Config;
use intent_execution::TransactionOrchestrator;
use intent_journal::{Journal, JournalEntry, JournalError};
use intent_router::{IntentRouter, ParserError, ParserService, QueryReporter, RouteOptions, Routed};
use intent_types::{
	EngineEvent, EventBus, ExecutionPlan, ExecutionState, IntentError, IntentEvent, Outcome,
	PlanId, PlanSummary, QueryRequest, Success, TradeIntent,
};
use std::sync::Arc;
use thiserror::Error;

pub mod builder;

pub use builder::EngineBuilder;

/// Errors that can occur while assembling the engine.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Error that occurs when the configuration cannot be turned into services.
	#[error("Configuration error: {0}")]
	Config(String),
	/// Error that occurs when the chain client cannot be created.
	#[error("Chain error: {0}")]
	Chain(#[from] ChainError),
	/// Error that occurs when the parser backend cannot be created.
	#[error("Parser error: {0}")]
	Parser(#[from] ParserError),
	/// Error that occurs when the journal backend cannot be created.
	#[error("Journal error: {0}")]
	Journal(#[from] JournalError),
}

pub struct IntentEngine {
	config: Config,
	chain: Arc<ChainService>,
	parser: Option<ParserService>,
	router: IntentRouter,
	orchestrator: TransactionOrchestrator,
	journal: Journal,
	reporter: Box<dyn QueryReporter>,
	event_bus: EventBus,
}

impl IntentEngine {
	/// Account plans are built for and sent from.
	pub fn owner(&self) -> Address {
		self.chain.account()
	}

	/// Interprets a natural-language command and carries it out.
	pub async fn submit_text(&self, text: &str, options: &RouteOptions) -> Outcome {
		match self.interpret(text).await {
			Ok(intent) => self.handle(&intent, text.to_string(), options).await,
			Err(e) => self.reject(text.to_string(), &e).await,
		}
	}

	/// Parses a natural-language command without acting on it.
	pub async fn interpret(&self, text: &str) -> Result<TradeIntent, IntentError> {
		match &self.parser {
			Some(parser) => parser.interpret(text).await,
			None => Err(IntentError::InvalidIntent(
				"no natural-language parser is configured".to_string(),
			)),
		}
	}

	/// Carries out an already structured intent, e.g. from a form.
	pub async fn submit_intent(&self, intent: &TradeIntent, options: &RouteOptions) -> Outcome {
		self.handle(intent, describe(intent), options).await
	}

	/// Routes an intent without executing it.
	pub async fn plan(
		&self,
		intent: &TradeIntent,
		options: &RouteOptions,
	) -> Result<Routed, IntentError> {
		self.router.route(intent, self.owner(), options).await
	}

	/// Builds the pool creation plan for two tokens without executing it.
	pub async fn plan_pool_creation(
		&self,
		token_a: &str,
		token_b: &str,
	) -> Result<ExecutionPlan, IntentError> {
		self.router
			.route_create_pool(token_a, token_b, self.owner())
			.await
	}

	/// Creates the pool for two tokens.
	pub async fn create_pool(&self, token_a: &str, token_b: &str) -> Outcome {
		let request = format!("create pool {} / {}", token_a, token_b);
		match self.plan_pool_creation(token_a, token_b).await {
			Ok(plan) => self.run(&plan, request).await,
			Err(e) => self.reject(request, &e).await,
		}
	}

	/// Executes a plan built earlier, e.g. by [`IntentEngine::plan`].
	pub async fn execute_plan(&self, plan: &ExecutionPlan) -> Outcome {
		self.run(plan, format!("execute plan {}", plan.id)).await
	}

	/// Current state of a plan that is executing right now.
	pub fn state(&self, plan_id: &PlanId) -> Option<ExecutionState> {
		self.orchestrator.state(plan_id)
	}

	pub fn journal(&self) -> &Journal {
		&self.journal
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	async fn handle(&self, intent: &TradeIntent, request: String, options: &RouteOptions) -> Outcome {
		match self.router.route(intent, self.owner(), options).await {
			Ok(Routed::Plan(plan)) => self.run(&plan, request).await,
			Ok(Routed::Report(query)) => self.report(query, request).await,
			Err(e) => self.reject(request, &e).await,
		}
	}

	async fn run(&self, plan: &ExecutionPlan, request: String) -> Outcome {
		let summary = plan.summary();
		tracing::info!(
			plan_id = %plan.id,
			function = %summary.function,
			approvals = summary.approvals.len(),
			"Accepted intent"
		);
		self.event_bus
			.publish(EngineEvent::Intent(IntentEvent::Accepted {
				plan: summary.clone(),
			}))
			.ok();

		let outcome = self.orchestrator.execute(plan).await;
		self.record(request, Some(summary), &outcome).await;
		outcome
	}

	async fn report(&self, query: QueryRequest, request: String) -> Outcome {
		if let Err(e) = self.reporter.report(&query).await {
			return self.reject(request, &e).await;
		}

		self.event_bus
			.publish(EngineEvent::Intent(IntentEvent::Reported {
				request: query.clone(),
			}))
			.ok();

		let outcome = Outcome::Success(Success::Reported(query));
		self.record(request, None, &outcome).await;
		outcome
	}

	async fn reject(&self, request: String, error: &IntentError) -> Outcome {
		tracing::warn!(kind = ?error.kind(), error = %error, "Rejected intent");
		self.event_bus
			.publish(EngineEvent::Intent(IntentEvent::Rejected {
				intent: request.clone(),
				reason: error.to_string(),
			}))
			.ok();

		let plan_id = match error {
			IntentError::AlreadyInFlight(id) => Some(*id),
			_ => None,
		};
		let outcome = Outcome::rejected(plan_id, error);
		self.record(request, None, &outcome).await;
		outcome
	}

	/// Journal failures are logged and never change the outcome.
	async fn record(&self, request: String, summary: Option<PlanSummary>, outcome: &Outcome) {
		let entry = JournalEntry::new(Some(request), summary, outcome.clone());
		if let Err(e) = self.journal.record(&entry).await {
			tracing::error!(id = %entry.id, error = %e, "Failed to journal outcome");
		}
	}
}

impl std::fmt::Debug for IntentEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IntentEngine")
			.field("name", &self.config.engine.name)
			.field("owner", &self.owner())
			.field("parser", &self.parser.is_some())
			.finish_non_exhaustive()
	}
}

fn describe(intent: &TradeIntent) -> String {
	match intent {
		TradeIntent::Swap(swap) => format!(
			"swap {} {} for {}",
			swap.amount_in, swap.token_in, swap.token_out
		),
		TradeIntent::AddLiquidity(add) => format!(
			"add liquidity {} {} + {} {}",
			add.amount_a, add.token_a, add.amount_b, add.token_b
		),
		TradeIntent::Query(query) => format!("query {:?}", query.kind),
	}
}
