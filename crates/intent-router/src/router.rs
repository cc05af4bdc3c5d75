//! Intent validation, quoting and plan construction.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};
use intent_chain::ChainService;
use intent_execution::ApprovalGate;
use intent_pool::{PoolResolver, TokenRegistry};
use intent_quote::{
	format_amount, min_liquidity_amounts, parse_amount, percent_to_bps, validate_amount_syntax,
	SwapQuote, BPS, DEFAULT_FEE_BPS,
};
use intent_types::{
	abi, AddLiquidityIntent, ApprovalRequirement, ContractCall, ExecutionPlan, IntentError,
	PlanBounds, PlanId, PlanKind, PoolRef, QueryIntent, QueryRequest, ReserveSnapshot, SwapIntent,
	Timeframe, Token, TradeIntent,
};
use std::sync::Arc;
use std::time::Duration;

/// Routing parameters.
#[derive(Debug, Clone)]
pub struct RouterConfig {
	/// AMM router contract; target of every action and spender of every approval.
	pub router: Address,
	pub default_slippage_bps: u32,
	pub fee_bps: u32,
	pub max_price_impact_bps: u32,
	/// Native balance kept back for gas on native-in plans.
	pub gas_reserve: U256,
	pub deadline_window: Duration,
}

impl RouterConfig {
	pub fn new(router: Address) -> Self {
		Self {
			router,
			default_slippage_bps: 50,
			fee_bps: DEFAULT_FEE_BPS,
			max_price_impact_bps: 1_500,
			// 0.01 ETH
			gas_reserve: U256::from(10_000_000_000_000_000u64),
			deadline_window: Duration::from_secs(1_800),
		}
	}
}

/// Per-request confirmations from the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteOptions {
	/// Proceed even if price impact exceeds the configured maximum.
	pub acknowledge_price_impact: bool,
	/// Allow 100% slippage, i.e. a minimum output of zero.
	pub accept_any_output: bool,
}

/// What an intent routes to.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
	Plan(ExecutionPlan),
	Report(QueryRequest),
}

/// Turns validated intents into execution plans.
///
/// Routing only reads from chain. Syntax is checked before the first read,
/// so a malformed intent never costs a network round trip.
pub struct IntentRouter {
	chain: Arc<ChainService>,
	resolver: Arc<PoolResolver>,
	gate: ApprovalGate,
	config: RouterConfig,
}

impl IntentRouter {
	pub fn new(chain: Arc<ChainService>, resolver: Arc<PoolResolver>, config: RouterConfig) -> Self {
		Self {
			gate: ApprovalGate::new(chain.clone()),
			chain,
			resolver,
			config,
		}
	}

	pub fn config(&self) -> &RouterConfig {
		&self.config
	}

	fn registry(&self) -> &TokenRegistry {
		self.resolver.registry()
	}

	pub async fn route(
		&self,
		intent: &TradeIntent,
		owner: Address,
		options: &RouteOptions,
	) -> Result<Routed, IntentError> {
		self.validate(intent)?;

		match intent {
			TradeIntent::Swap(swap) => self.route_swap(swap, owner, options).await.map(Routed::Plan),
			TradeIntent::AddLiquidity(add) => self
				.route_add_liquidity(add, owner, options)
				.await
				.map(Routed::Plan),
			TradeIntent::Query(query) => self.route_query(query).await.map(Routed::Report),
		}
	}

	/// Checks everything that can be checked without the chain.
	pub fn validate(&self, intent: &TradeIntent) -> Result<(), IntentError> {
		match intent {
			TradeIntent::Swap(swap) => {
				validate_amount(&swap.amount_in)?;
				validate_pair(&swap.token_in, &swap.token_out)?;
				self.slippage_bps(&swap.slippage)?;
			}
			TradeIntent::AddLiquidity(add) => {
				validate_amount(&add.amount_a)?;
				validate_amount(&add.amount_b)?;
				validate_pair(&add.token_a, &add.token_b)?;
				self.slippage_bps(&add.slippage)?;
			}
			TradeIntent::Query(query) => {
				match &query.pool {
					PoolRef::Address(address) if !TokenRegistry::is_address_like(address) => {
						return Err(IntentError::InvalidIntent(format!(
							"'{}' is not a pool address",
							address
						)));
					}
					PoolRef::Address(_) => {}
					PoolRef::Pair { token_a, token_b } => validate_pair(token_a, token_b)?,
				}
				if let Timeframe::Range { from, to } = query.timeframe {
					if from > to {
						return Err(IntentError::InvalidIntent(format!(
							"timeframe starts after it ends ({} > {})",
							from, to
						)));
					}
				}
			}
		}
		Ok(())
	}

	async fn route_swap(
		&self,
		intent: &SwapIntent,
		owner: Address,
		options: &RouteOptions,
	) -> Result<ExecutionPlan, IntentError> {
		let slippage_bps = self.slippage_bps(&intent.slippage)?;
		if slippage_bps >= BPS && !options.accept_any_output {
			return Err(IntentError::InvalidIntent(
				"100% slippage accepts any output and must be confirmed explicitly".to_string(),
			));
		}

		let token_in = self.resolver.resolve_token(&intent.token_in).await?;
		let token_out = self.resolver.resolve_token(&intent.token_out).await?;
		let amount_in = parse_amount(&intent.amount_in, token_in.decimals)
			.map_err(|e| IntentError::InvalidIntent(e.to_string()))?;

		let pool = self.resolver.resolve_pool(&token_in, &token_out).await?;
		self.ensure_balance(owner, &token_in, amount_in).await?;

		let path_in = self.registry().to_tradable_address(&token_in);
		let path_out = self.registry().to_tradable_address(&token_out);
		let (reserve_in, reserve_out) = pool.reserves_for(path_in).ok_or_else(|| {
			IntentError::Chain(format!("pool {} does not hold {}", pool.address, path_in))
		})?;

		let quote = SwapQuote::compute(
			amount_in,
			reserve_in,
			reserve_out,
			self.config.fee_bps,
			slippage_bps,
		)
		.map_err(|e| IntentError::InvalidIntent(e.to_string()))?;
		if quote.amount_out.is_zero() {
			return Err(IntentError::InvalidIntent(format!(
				"{} {} is too small to buy any {}",
				intent.amount_in, token_in.symbol, token_out.symbol
			)));
		}
		if quote.price_impact_bps > self.config.max_price_impact_bps
			&& !options.acknowledge_price_impact
		{
			return Err(IntentError::ExcessivePriceImpact {
				impact_bps: quote.price_impact_bps,
				max_bps: self.config.max_price_impact_bps,
			});
		}

		let deadline = self.deadline();
		let router = self.config.router;
		let path = DynSolValue::Array(vec![
			DynSolValue::Address(path_in),
			DynSolValue::Address(path_out),
		]);
		let (kind, action) = if token_in.is_native {
			(
				PlanKind::SwapExactEthForTokens,
				ContractCall::new(
					router,
					abi::router::SWAP_EXACT_ETH_FOR_TOKENS,
					vec![uint(quote.min_out), path, DynSolValue::Address(owner), uint(U256::from(deadline))],
				)
				.with_value(amount_in),
			)
		} else {
			let (kind, signature) = if token_out.is_native {
				(
					PlanKind::SwapExactTokensForEth,
					abi::router::SWAP_EXACT_TOKENS_FOR_ETH,
				)
			} else {
				(
					PlanKind::SwapExactTokensForTokens,
					abi::router::SWAP_EXACT_TOKENS_FOR_TOKENS,
				)
			};
			(
				kind,
				ContractCall::new(
					router,
					signature,
					vec![
						uint(amount_in),
						uint(quote.min_out),
						path,
						DynSolValue::Address(owner),
						uint(U256::from(deadline)),
					],
				),
			)
		};

		let approvals = self.approvals(owner, &[(&token_in, amount_in)]).await?;
		let snapshot = pool.snapshot();
		let id = plan_id(
			kind,
			owner,
			&[path_in, path_out],
			&[amount_in, quote.min_out],
			Some(&snapshot),
		);

		tracing::info!(
			plan_id = %id,
			kind = ?kind,
			amount_in = %amount_in,
			expected_out = %quote.amount_out,
			min_out = %quote.min_out,
			price_impact_bps = quote.price_impact_bps,
			approvals = approvals.len(),
			"Built swap plan"
		);

		Ok(ExecutionPlan {
			id,
			kind,
			owner,
			action,
			approvals,
			deadline,
			snapshot: Some(snapshot),
			pool: Some(pool),
			bounds: PlanBounds::Swap {
				amount_in,
				expected_out: quote.amount_out,
				min_out: quote.min_out,
				price_impact_bps: quote.price_impact_bps,
			},
			touched_tokens: vec![token_in, token_out],
		})
	}

	async fn route_add_liquidity(
		&self,
		intent: &AddLiquidityIntent,
		owner: Address,
		options: &RouteOptions,
	) -> Result<ExecutionPlan, IntentError> {
		let slippage_bps = self.slippage_bps(&intent.slippage)?;
		if slippage_bps >= BPS && !options.accept_any_output {
			return Err(IntentError::InvalidIntent(
				"100% slippage accepts any amounts and must be confirmed explicitly".to_string(),
			));
		}

		let token_a = self.resolver.resolve_token(&intent.token_a).await?;
		let token_b = self.resolver.resolve_token(&intent.token_b).await?;
		let amount_a = parse_amount(&intent.amount_a, token_a.decimals)
			.map_err(|e| IntentError::InvalidIntent(e.to_string()))?;
		let amount_b = parse_amount(&intent.amount_b, token_b.decimals)
			.map_err(|e| IntentError::InvalidIntent(e.to_string()))?;

		// Deposits go into an existing pool only; creating one is a separate request.
		let pool = self.resolver.resolve_pool(&token_a, &token_b).await?;
		self.ensure_balance(owner, &token_a, amount_a).await?;
		self.ensure_balance(owner, &token_b, amount_b).await?;

		let (min_a, min_b) = min_liquidity_amounts(amount_a, amount_b, slippage_bps);
		let deadline = self.deadline();
		let router = self.config.router;

		let (kind, action, approvals) = if token_a.is_native || token_b.is_native {
			// addLiquidityETH takes the token side explicitly and the native side as value.
			let (token, amount_token, min_token, amount_eth, min_eth) = if token_a.is_native {
				(&token_b, amount_b, min_b, amount_a, min_a)
			} else {
				(&token_a, amount_a, min_a, amount_b, min_b)
			};
			let action = ContractCall::new(
				router,
				abi::router::ADD_LIQUIDITY_ETH,
				vec![
					DynSolValue::Address(token.address),
					uint(amount_token),
					uint(min_token),
					uint(min_eth),
					DynSolValue::Address(owner),
					uint(U256::from(deadline)),
				],
			)
			.with_value(amount_eth);
			let approvals = self.approvals(owner, &[(token, amount_token)]).await?;
			(PlanKind::AddLiquidityEth, action, approvals)
		} else {
			let action = ContractCall::new(
				router,
				abi::router::ADD_LIQUIDITY,
				vec![
					DynSolValue::Address(token_a.address),
					DynSolValue::Address(token_b.address),
					uint(amount_a),
					uint(amount_b),
					uint(min_a),
					uint(min_b),
					DynSolValue::Address(owner),
					uint(U256::from(deadline)),
				],
			);
			let approvals = self
				.approvals(owner, &[(&token_a, amount_a), (&token_b, amount_b)])
				.await?;
			(PlanKind::AddLiquidity, action, approvals)
		};

		let snapshot = pool.snapshot();
		let id = plan_id(
			kind,
			owner,
			&[
				self.registry().to_tradable_address(&token_a),
				self.registry().to_tradable_address(&token_b),
			],
			&[amount_a, amount_b, min_a, min_b],
			Some(&snapshot),
		);

		tracing::info!(
			plan_id = %id,
			kind = ?kind,
			pool = %pool.address,
			amount_a = %amount_a,
			amount_b = %amount_b,
			approvals = approvals.len(),
			"Built liquidity plan"
		);

		Ok(ExecutionPlan {
			id,
			kind,
			owner,
			action,
			approvals,
			deadline,
			snapshot: Some(snapshot),
			pool: Some(pool),
			bounds: PlanBounds::Liquidity {
				amount_a,
				amount_b,
				min_a,
				min_b,
			},
			touched_tokens: vec![token_a, token_b],
		})
	}

	async fn route_query(&self, intent: &QueryIntent) -> Result<QueryRequest, IntentError> {
		let pool = match &intent.pool {
			PoolRef::Address(address) => {
				let address: Address = address
					.parse()
					.map_err(|_| IntentError::InvalidIntent(format!("'{}' is not a pool address", address)))?;
				self.resolver.load_pool(address).await?
			}
			PoolRef::Pair { token_a, token_b } => {
				let token_a = self.resolver.resolve_token(token_a).await?;
				let token_b = self.resolver.resolve_token(token_b).await?;
				self.resolver.resolve_pool(&token_a, &token_b).await?
			}
		};

		tracing::debug!(pool = %pool.address, kind = ?intent.kind, "Resolved pool query");
		Ok(QueryRequest {
			kind: intent.kind,
			pool: pool.address,
			token0: self.resolver.display_token(pool.token0).await?,
			token1: self.resolver.display_token(pool.token1).await?,
			timeframe: intent.timeframe,
		})
	}

	/// Builds the plan that creates a pool for two tokens.
	///
	/// Only ever called on an explicit request; swaps and deposits into a
	/// missing pool fail with `PoolNotFound` instead.
	pub async fn route_create_pool(
		&self,
		token_a: &str,
		token_b: &str,
		owner: Address,
	) -> Result<ExecutionPlan, IntentError> {
		validate_pair(token_a, token_b)?;
		let token_a = self.resolver.resolve_token(token_a).await?;
		let token_b = self.resolver.resolve_token(token_b).await?;
		let action = self.resolver.create_pool_call(&token_a, &token_b).await?;

		let kind = PlanKind::CreatePair;
		let id = plan_id(
			kind,
			owner,
			&[
				self.registry().to_tradable_address(&token_a),
				self.registry().to_tradable_address(&token_b),
			],
			&[],
			None,
		);
		tracing::info!(plan_id = %id, token_a = %token_a.symbol, token_b = %token_b.symbol, "Built pool creation plan");

		Ok(ExecutionPlan {
			id,
			kind,
			owner,
			action,
			approvals: Vec::new(),
			deadline: self.deadline(),
			snapshot: None,
			pool: None,
			bounds: PlanBounds::None,
			touched_tokens: Vec::new(),
		})
	}

	fn slippage_bps(&self, slippage: &Option<String>) -> Result<u32, IntentError> {
		match slippage {
			None => Ok(self.config.default_slippage_bps),
			Some(s) if s.trim().is_empty() => Ok(self.config.default_slippage_bps),
			Some(s) => percent_to_bps(s).map_err(|e| IntentError::InvalidIntent(e.to_string())),
		}
	}

	fn deadline(&self) -> u64 {
		chrono::Utc::now().timestamp().max(0) as u64 + self.config.deadline_window.as_secs()
	}

	/// Fails unless `owner` holds `amount` of `token`, plus the gas reserve
	/// when the token is native.
	async fn ensure_balance(
		&self,
		owner: Address,
		token: &Token,
		amount: U256,
	) -> Result<(), IntentError> {
		let (available, required) = if token.is_native {
			(
				self.chain.native_balance(owner).await?,
				amount.saturating_add(self.config.gas_reserve),
			)
		} else {
			(self.chain.balance_of(token.address, owner).await?, amount)
		};

		if available < required {
			tracing::warn!(
				token = %token.symbol,
				available = %format_amount(available, token.decimals),
				required = %format_amount(required, token.decimals),
				"Insufficient balance"
			);
			return Err(IntentError::InsufficientBalance {
				symbol: token.symbol.clone(),
				available,
				required,
			});
		}
		Ok(())
	}

	async fn approvals(
		&self,
		owner: Address,
		spends: &[(&Token, U256)],
	) -> Result<Vec<ApprovalRequirement>, IntentError> {
		let mut approvals = Vec::new();
		for (token, amount) in spends {
			if let Some(requirement) = self
				.gate
				.requirement(owner, self.config.router, token, *amount)
				.await?
			{
				approvals.push(requirement);
			}
		}
		Ok(approvals)
	}
}

fn uint(value: U256) -> DynSolValue {
	DynSolValue::Uint(value, 256)
}

fn validate_amount(amount: &str) -> Result<(), IntentError> {
	validate_amount_syntax(amount).map_err(|e| IntentError::InvalidIntent(e.to_string()))
}

fn validate_pair(token_a: &str, token_b: &str) -> Result<(), IntentError> {
	let (a, b) = (token_a.trim(), token_b.trim());
	if a.is_empty() || b.is_empty() {
		return Err(IntentError::InvalidIntent("token is missing".to_string()));
	}
	if a.eq_ignore_ascii_case(b) {
		return Err(IntentError::InvalidIntent(format!(
			"cannot trade {} against itself",
			a
		)));
	}
	Ok(())
}

/// Identity of a plan: what it does, for whom, against which reserves.
///
/// The deadline is left out so resubmitting the same request maps to the
/// same id.
fn plan_id(
	kind: PlanKind,
	owner: Address,
	tokens: &[Address],
	amounts: &[U256],
	snapshot: Option<&ReserveSnapshot>,
) -> PlanId {
	let mut parts: Vec<Vec<u8>> = vec![vec![kind.tag()], owner.to_vec()];
	parts.extend(tokens.iter().map(|t| t.to_vec()));
	parts.extend(amounts.iter().map(|a| a.to_be_bytes::<32>().to_vec()));
	if let Some(snapshot) = snapshot {
		parts.push(snapshot.pool.to_vec());
		parts.push(snapshot.reserve0.to_be_bytes::<32>().to_vec());
		parts.push(snapshot.reserve1.to_be_bytes::<32>().to_vec());
		parts.push(snapshot.last_update_timestamp.to_be_bytes().to_vec());
	}
	let refs: Vec<&[u8]> = parts.iter().map(Vec::as_slice).collect();
	PlanId::from_parts(&refs)
}
