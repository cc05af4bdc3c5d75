//! End-to-end runs through parser, router, orchestrator and journal against a
//! scripted chain.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use intent_chain::testing::{ChainCall, Fault, ScriptedChain};
use intent_config::Config;
use intent_core::{EngineBuilder, EngineError, IntentEngine};
use intent_journal::implementations::memory::create_memory_journal;
use intent_pool::registry::DEFAULT_WRAPPED_NATIVE;
use intent_pool::TokenRegistry;
use intent_router::{IntentParser, ParsedIntent, ParserError, QueryReporter, RouteOptions};
use intent_types::{
	EngineEvent, ErrorKind, ExecutionStep, FailureCause, IntentError, IntentEvent, Outcome,
	QueryKind, QueryRequest, SwapIntent, Success, TradeIntent,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

const OWNER: Address = Address::repeat_byte(0x0a);
const FACTORY: Address = Address::repeat_byte(0xfa);
const WETH_USDC: Address = Address::repeat_byte(0xab);
const DAI_USDC: Address = Address::repeat_byte(0xac);

const CONFIG: &str = r#"
[engine]
refresh_delay_ms = 10

[chain]
provider = "scripted"

[contracts]
router = "0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e"
factory = "0xfafafafafafafafafafafafafafafafafafafafa"

[[tokens]]
symbol = "MEME"
address = "0x4242424242424242424242424242424242424242"
decimals = 9
"#;

const PARSER: &str = r#"
[parser]
provider = "fixed"
confidence_threshold = 0.5
"#;

fn ether(n: u64) -> U256 {
	U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

fn usdc(n: u64) -> U256 {
	U256::from(n) * U256::from(1_000_000u64)
}

struct FixedParser(serde_json::Value);

#[async_trait]
impl IntentParser for FixedParser {
	async fn parse(&self, _text: &str) -> Result<ParsedIntent, ParserError> {
		serde_json::from_value(self.0.clone()).map_err(|e| ParserError::Response(e.to_string()))
	}
}

#[derive(Clone, Default)]
struct RecordingReporter(Arc<Mutex<Vec<QueryRequest>>>);

#[async_trait]
impl QueryReporter for RecordingReporter {
	async fn report(&self, request: &QueryRequest) -> Result<(), IntentError> {
		self.0.lock().unwrap().push(request.clone());
		Ok(())
	}
}

fn scripted_chain() -> ScriptedChain {
	let chain = ScriptedChain::new(OWNER);
	let registry = TokenRegistry::with_defaults(DEFAULT_WRAPPED_NATIVE);
	let usdc_token = registry.lookup("testUSDC").unwrap();
	let dai = registry.lookup("DAI").unwrap();

	chain.add_pair(
		FACTORY,
		WETH_USDC,
		DEFAULT_WRAPPED_NATIVE,
		usdc_token.address,
		ether(100),
		usdc(200_000),
	);
	chain.add_pair(
		FACTORY,
		DAI_USDC,
		dai.address,
		usdc_token.address,
		ether(500_000),
		usdc(500_000),
	);
	chain.set_native_balance(OWNER, ether(200));
	chain.set_balance(usdc_token.address, OWNER, usdc(1_000));
	chain
}

fn builder(chain: &ScriptedChain, parsed: Option<serde_json::Value>) -> EngineBuilder {
	let content = match parsed {
		Some(_) => format!("{}\n{}", CONFIG, PARSER),
		None => CONFIG.to_string(),
	};
	let config: Config = toml::from_str(&content).unwrap();

	let chain = chain.clone();
	let mut builder = EngineBuilder::new(config)
		.with_chain_factory("scripted", move |_| Ok(Box::new(chain.clone())))
		.with_journal_factory("memory", create_memory_journal);
	if let Some(value) = parsed {
		builder = builder.with_parser_factory("fixed", move |_| {
			Ok(Box::new(FixedParser(value.clone())))
		});
	}
	builder
}

fn engine(chain: &ScriptedChain, parsed: Option<serde_json::Value>) -> IntentEngine {
	builder(chain, parsed).build().unwrap()
}

fn swap(amount: &str, token_in: &str, token_out: &str) -> TradeIntent {
	TradeIntent::Swap(SwapIntent {
		amount_in: amount.into(),
		token_in: token_in.into(),
		token_out: token_out.into(),
		slippage: None,
	})
}

#[tokio::test]
async fn test_low_confidence_command_never_reaches_the_chain() {
	let chain = scripted_chain();
	let engine = engine(
		&chain,
		Some(json!({
			"type": "swap",
			"params": { "amount": "1", "fromToken": "ETH", "toToken": "testUSDC" },
			"confidence": 0.2,
			"explanation": "not sure what was meant"
		})),
	);
	let mut events = engine.event_bus().subscribe();

	let outcome = engine
		.submit_text("maybe swap something", &RouteOptions::default())
		.await;

	assert!(matches!(
		outcome,
		Outcome::Rejected {
			kind: ErrorKind::InvalidIntent,
			plan_id: None,
			..
		}
	));
	assert!(chain.calls().is_empty());
	match events.try_recv() {
		Ok(EngineEvent::Intent(IntentEvent::Rejected { intent, reason })) => {
			assert_eq!(intent, "maybe swap something");
			assert!(reason.contains("not sure what was meant"));
		}
		other => panic!("Expected rejection event, got {:?}", other),
	}
}

#[tokio::test]
async fn test_rejected_approval_then_retry_succeeds() {
	let chain = scripted_chain();
	let engine = engine(&chain, None);
	let intent = swap("100", "testUSDC", "DAI");

	chain.fail_next_write("approve", Fault::Reject);
	let first = engine.submit_intent(&intent, &RouteOptions::default()).await;
	let report = match first {
		Outcome::Cancelled(report) => report,
		other => panic!("Expected cancellation, got {:?}", other),
	};
	assert_eq!(report.cause, FailureCause::UserRejected);
	assert_eq!(report.kind, ErrorKind::UserCancelled);
	assert_eq!(report.step, ExecutionStep::Approval { index: 0, total: 1 });
	assert!(report.transactions.is_empty());
	assert!(chain.submitted().is_empty());
	assert_eq!(engine.state(&report.plan_id), None);

	let calls_before_retry = chain.calls().len();
	let second = engine.submit_intent(&intent, &RouteOptions::default()).await;
	let receipt = match second {
		Outcome::Success(Success::Executed(receipt)) => receipt,
		other => panic!("Expected success, got {:?}", other),
	};
	assert_eq!(receipt.plan_id, report.plan_id);
	assert_eq!(receipt.approvals.len(), 1);
	assert_eq!(chain.submitted(), vec!["approve", "swapExactTokensForTokens"]);

	// The retry read the allowance again before asking for a new approval.
	let retry_calls = &chain.calls()[calls_before_retry..];
	let allowance_read = retry_calls
		.iter()
		.position(|c| matches!(c, ChainCall::Read { function, .. } if function == "allowance"))
		.unwrap();
	let approve_sent = retry_calls
		.iter()
		.position(|c| matches!(c, ChainCall::Submitted { function, .. } if function == "approve"))
		.unwrap();
	assert!(allowance_read < approve_sent);

	let entry = engine.journal().lookup_plan(&receipt.plan_id).await.unwrap();
	assert!(entry.outcome.is_success());
	assert_eq!(entry.request.as_deref(), Some("swap 100 testUSDC for DAI"));
	assert!(entry.summary.is_some());
}

#[tokio::test]
async fn test_native_swap_publishes_acceptance_and_executes() {
	let chain = scripted_chain();
	let engine = engine(&chain, None);
	let mut events = engine.event_bus().subscribe();

	let outcome = engine
		.submit_intent(&swap("1", "ETH", "testUSDC"), &RouteOptions::default())
		.await;

	match &outcome {
		Outcome::Success(Success::Executed(receipt)) => assert!(receipt.approvals.is_empty()),
		other => panic!("Expected success, got {:?}", other),
	}
	assert_eq!(chain.submitted(), vec!["swapExactETHForTokens"]);

	match events.recv().await.unwrap() {
		EngineEvent::Intent(IntentEvent::Accepted { plan }) => {
			assert_eq!(plan.function, "swapExactETHForTokens");
			assert_eq!(plan.value, ether(1));
			assert_eq!(Some(plan.id), outcome.plan_id());
		}
		other => panic!("Expected acceptance first, got {:?}", other),
	}
}

#[tokio::test]
async fn test_query_command_is_reported_without_transactions() {
	let chain = scripted_chain();
	let reporter = RecordingReporter::default();
	let engine = builder(
		&chain,
		Some(json!({
			"type": "query",
			"params": { "intent": "swapCount", "token1": "WETH", "token2": "testUSDC" },
			"confidence": 0.9
		})),
	)
	.with_query_reporter(Box::new(reporter.clone()))
	.build()
	.unwrap();

	let outcome = engine
		.submit_text("how many swaps in the WETH pool today?", &RouteOptions::default())
		.await;

	match outcome {
		Outcome::Success(Success::Reported(request)) => {
			assert_eq!(request.kind, QueryKind::SwapCount);
			assert_eq!(request.pool, WETH_USDC);
			// The wrapped token named in the command is shown as the native asset
			let native = [&request.token0, &request.token1]
				.into_iter()
				.find(|t| t.is_native)
				.map(|t| t.symbol.clone());
			assert_eq!(native.as_deref(), Some("ETH"));
		}
		other => panic!("Expected a report, got {:?}", other),
	}
	assert_eq!(reporter.0.lock().unwrap().len(), 1);
	assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn test_text_without_parser_is_rejected() {
	let chain = scripted_chain();
	let engine = engine(&chain, None);

	let outcome = engine
		.submit_text("swap 1 ETH for DAI", &RouteOptions::default())
		.await;

	assert!(matches!(
		outcome,
		Outcome::Rejected {
			kind: ErrorKind::InvalidIntent,
			..
		}
	));
	assert!(chain.calls().is_empty());
}

#[tokio::test]
async fn test_pool_creation_is_explicit_and_once() {
	let chain = scripted_chain();
	let engine = engine(&chain, None);

	// No DAI/USDT pool: swaps fail instead of creating one.
	let outcome = engine
		.submit_intent(&swap("1", "DAI", "USDT"), &RouteOptions::default())
		.await;
	assert!(matches!(
		outcome,
		Outcome::Rejected {
			kind: ErrorKind::PoolNotFound,
			..
		}
	));
	assert!(chain.submitted().is_empty());

	let created = engine.create_pool("DAI", "USDT").await;
	assert!(created.is_success(), "{:?}", created);
	assert_eq!(chain.submitted(), vec!["createPair"]);

	let again = engine.create_pool("DAI", "USDT").await;
	assert!(matches!(
		again,
		Outcome::Rejected {
			kind: ErrorKind::InvalidIntent,
			..
		}
	));
}

#[tokio::test]
async fn test_dry_run_plan_then_execute() {
	let chain = scripted_chain();
	let engine = engine(&chain, None);

	let routed = engine
		.plan(&swap("1", "ETH", "testUSDC"), &RouteOptions::default())
		.await
		.unwrap();
	let plan = match routed {
		intent_router::Routed::Plan(plan) => plan,
		other => panic!("Expected a plan, got {:?}", other),
	};
	assert!(chain.submitted().is_empty());

	let outcome = engine.execute_plan(&plan).await;
	assert_eq!(outcome.plan_id(), Some(plan.id));
	assert!(outcome.is_success());
}

#[tokio::test]
async fn test_configured_tokens_are_registered() {
	let chain = scripted_chain();
	let engine = engine(&chain, None);

	// MEME resolves from config; there is no pool for it.
	let outcome = engine
		.submit_intent(&swap("1", "ETH", "MEME"), &RouteOptions::default())
		.await;
	assert!(matches!(
		outcome,
		Outcome::Rejected {
			kind: ErrorKind::PoolNotFound,
			..
		}
	));
}

#[test]
fn test_missing_factories_are_configuration_errors() {
	let config: Config = toml::from_str(CONFIG).unwrap();
	let result = EngineBuilder::new(config.clone()).build();
	assert!(matches!(result, Err(EngineError::Config(_))));

	let chain = scripted_chain();
	let result = EngineBuilder::new(config)
		.with_chain_factory("scripted", move |_| Ok(Box::new(chain.clone())))
		.build();
	assert!(matches!(result, Err(EngineError::Config(message)) if message.contains("journal")));
}
