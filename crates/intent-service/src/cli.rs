//! Command-line interface definitions.

use clap::{Args, Parser, Subcommand};
use intent_router::RouteOptions;
use intent_types::{
	AddLiquidityIntent, PoolRef, QueryIntent, QueryKind, SwapIntent, Timeframe, TradeIntent,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "amm-intent")]
#[command(about = "Trade intents for a constant-product AMM", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
	#[command(subcommand)]
	pub command: Commands,

	/// Path to configuration file
	#[arg(short, long, value_name = "FILE", default_value = "config/example.toml")]
	pub config: PathBuf,

	#[arg(long, env = "AMM_INTENT_LOG_LEVEL", default_value = "info")]
	pub log_level: String,

	#[command(flatten)]
	pub options: ExecutionFlags,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ExecutionFlags {
	/// Proceed even if price impact exceeds the configured maximum
	#[arg(long, global = true)]
	pub acknowledge_price_impact: bool,

	/// Allow 100% slippage (no minimum output)
	#[arg(long, global = true)]
	pub accept_any_output: bool,

	/// Print the plan instead of executing it
	#[arg(long, global = true)]
	pub dry_run: bool,
}

impl ExecutionFlags {
	pub fn route_options(&self) -> RouteOptions {
		RouteOptions {
			acknowledge_price_impact: self.acknowledge_price_impact,
			accept_any_output: self.accept_any_output,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Interpret and carry out a natural-language command
	Ask {
		/// e.g. "swap 1 ETH for testUSDC"
		text: String,
	},
	/// Swap an exact input amount
	Swap {
		amount: String,
		from: String,
		to: String,
		/// Slippage tolerance in percent, e.g. 0.5
		#[arg(long)]
		slippage: Option<String>,
	},
	/// Deposit both sides of a pool
	AddLiquidity {
		amount_a: String,
		token_a: String,
		amount_b: String,
		token_b: String,
		#[arg(long)]
		slippage: Option<String>,
	},
	/// Create the pool for a token pair
	CreatePool { token_a: String, token_b: String },
	/// Ask about a pool
	Query {
		/// reserves, swapCount or priceDistribution
		#[arg(long, default_value = "reserves")]
		kind: QueryKind,
		/// Pool address
		#[arg(long, conflicts_with = "pair")]
		pool: Option<String>,
		/// Token pair naming the pool
		#[arg(long, num_args = 2, value_names = ["TOKEN_A", "TOKEN_B"])]
		pair: Option<Vec<String>>,
		/// Window start, unix seconds
		#[arg(long, requires = "to")]
		from: Option<u64>,
		/// Window end, unix seconds
		#[arg(long, requires = "from")]
		to: Option<u64>,
	},
	/// Validate the configuration file
	Validate,
}

impl Commands {
	/// The structured intent for form-like subcommands.
	pub fn trade_intent(&self) -> Option<TradeIntent> {
		match self {
			Self::Swap {
				amount,
				from,
				to,
				slippage,
			} => Some(TradeIntent::Swap(SwapIntent {
				amount_in: amount.clone(),
				token_in: from.clone(),
				token_out: to.clone(),
				slippage: slippage.clone(),
			})),
			Self::AddLiquidity {
				amount_a,
				token_a,
				amount_b,
				token_b,
				slippage,
			} => Some(TradeIntent::AddLiquidity(AddLiquidityIntent {
				amount_a: amount_a.clone(),
				token_a: token_a.clone(),
				amount_b: amount_b.clone(),
				token_b: token_b.clone(),
				slippage: slippage.clone(),
			})),
			Self::Query {
				kind,
				pool,
				pair,
				from,
				to,
			} => {
				let pool = match (pool, pair.as_deref()) {
					(Some(address), _) => PoolRef::Address(address.clone()),
					(None, Some([token_a, token_b])) => PoolRef::Pair {
						token_a: token_a.clone(),
						token_b: token_b.clone(),
					},
					// Empty pair; the router rejects it
					_ => PoolRef::Address(String::new()),
				};
				let timeframe = match (from, to) {
					(Some(from), Some(to)) => Timeframe::Range {
						from: *from,
						to: *to,
					},
					_ => Timeframe::Today,
				};
				Some(TradeIntent::Query(QueryIntent {
					kind: *kind,
					pool,
					timeframe,
				}))
			}
			Self::Ask { .. } | Self::CreatePool { .. } | Self::Validate => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_swap_subcommand_with_global_flags() {
		let cli = Cli::parse_from([
			"amm-intent",
			"swap",
			"1.5",
			"ETH",
			"testUSDC",
			"--slippage",
			"1",
			"--dry-run",
		]);
		assert!(cli.options.dry_run);
		assert!(!cli.options.accept_any_output);
		assert_eq!(
			cli.command.trade_intent(),
			Some(TradeIntent::Swap(SwapIntent {
				amount_in: "1.5".into(),
				token_in: "ETH".into(),
				token_out: "testUSDC".into(),
				slippage: Some("1".into()),
			}))
		);
	}

	#[test]
	fn test_query_by_pair_with_window() {
		let cli = Cli::parse_from([
			"amm-intent",
			"query",
			"--kind",
			"swapCount",
			"--pair",
			"WETH",
			"testUSDC",
			"--from",
			"100",
			"--to",
			"200",
		]);
		match cli.command.trade_intent() {
			Some(TradeIntent::Query(query)) => {
				assert_eq!(query.kind, QueryKind::SwapCount);
				assert_eq!(
					query.pool,
					PoolRef::Pair {
						token_a: "WETH".into(),
						token_b: "testUSDC".into()
					}
				);
				assert_eq!(query.timeframe, Timeframe::Range { from: 100, to: 200 });
			}
			other => panic!("Expected query, got {:?}", other),
		}
	}

	#[test]
	fn test_ask_has_no_structured_intent() {
		let cli = Cli::parse_from(["amm-intent", "ask", "swap 1 ETH for DAI"]);
		assert!(cli.command.trade_intent().is_none());
		assert_eq!(cli.config, PathBuf::from("config/example.toml"));
	}
}
