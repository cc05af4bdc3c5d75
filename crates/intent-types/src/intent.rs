//! Trade intents as they arrive from forms or the natural-language parser.
//!
//! Every field here is raw and untrusted: amounts are decimal strings, tokens
//! are symbols or addresses, slippage is an optional percentage string. An
//! intent is a proposal; the router decides whether it becomes a plan.

use serde::{Deserialize, Serialize};

/// The closed set of things a user can ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TradeIntent {
	Swap(SwapIntent),
	AddLiquidity(AddLiquidityIntent),
	Query(QueryIntent),
}

impl TradeIntent {
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::Swap(_) => "swap",
			Self::AddLiquidity(_) => "addLiquidity",
			Self::Query(_) => "query",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapIntent {
	pub amount_in: String,
	pub token_in: String,
	pub token_out: String,
	/// Percentage, e.g. `"0.5"` for 0.5%. Defaults to the engine setting.
	#[serde(default)]
	pub slippage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLiquidityIntent {
	pub amount_a: String,
	pub token_a: String,
	pub amount_b: String,
	pub token_b: String,
	#[serde(default)]
	pub slippage: Option<String>,
}

/// A read-only request about a pool. Never produces a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryIntent {
	pub kind: QueryKind,
	pub pool: PoolRef,
	#[serde(default)]
	pub timeframe: Timeframe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryKind {
	Reserves,
	SwapCount,
	PriceDistribution,
}

impl std::str::FromStr for QueryKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"reserves" | "getreserves" => Ok(Self::Reserves),
			"swapcount" | "swap-count" => Ok(Self::SwapCount),
			"pricedistribution" | "price-distribution" => Ok(Self::PriceDistribution),
			other => Err(format!("Unknown query kind: {}", other)),
		}
	}
}

/// How a query names its pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PoolRef {
	Address(String),
	Pair { token_a: String, token_b: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Timeframe {
	#[default]
	Today,
	/// Unix seconds, inclusive.
	Range { from: u64, to: u64 },
}
