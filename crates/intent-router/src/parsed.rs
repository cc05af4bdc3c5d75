//! The loosely typed shape a natural-language parser returns, and its
//! conversion into a [`TradeIntent`].

use intent_types::{
	AddLiquidityIntent, IntentError, PoolRef, QueryIntent, QueryKind, SwapIntent, Timeframe,
	TradeIntent,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw parser output.
///
/// Parsers are free to use their own parameter names; the conversion accepts
/// the common aliases (`amount`/`amountIn`, `fromToken`/`tokenIn`,
/// `token1Amount`/`amountA`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub action: String,
	#[serde(default)]
	pub params: Map<String, Value>,
	#[serde(default)]
	pub confidence: f64,
	#[serde(default)]
	pub explanation: Option<String>,
}

impl ParsedIntent {
	/// The intent a parser reports when it could not make sense of a command.
	pub fn error(explanation: impl Into<String>) -> Self {
		Self {
			kind: "error".to_string(),
			action: "error".to_string(),
			params: Map::new(),
			confidence: 0.0,
			explanation: Some(explanation.into()),
		}
	}

	/// Converts into a [`TradeIntent`].
	///
	/// Error-typed and low-confidence results stop here with the parser's
	/// explanation; nothing downstream ever sees them.
	pub fn into_trade_intent(self, confidence_threshold: f64) -> Result<TradeIntent, IntentError> {
		let explanation = self
			.explanation
			.clone()
			.filter(|e| !e.trim().is_empty())
			.unwrap_or_else(|| "could not understand the command".to_string());

		if self.kind.eq_ignore_ascii_case("error") {
			return Err(IntentError::InvalidIntent(explanation));
		}
		// NaN never passes
		if !(self.confidence >= confidence_threshold) {
			return Err(IntentError::InvalidIntent(format!(
				"confidence {:.2} is below {:.2}: {}",
				self.confidence, confidence_threshold, explanation
			)));
		}

		match self.kind.to_ascii_lowercase().as_str() {
			"swap" => Ok(TradeIntent::Swap(SwapIntent {
				amount_in: self.required(&["amountIn", "amount"])?,
				token_in: self.required(&["tokenIn", "fromToken", "from"])?,
				token_out: self.required(&["tokenOut", "toToken", "to"])?,
				slippage: self.optional(&["slippage", "slippageTolerance"]),
			})),
			"deposit" | "addliquidity" | "add_liquidity" => {
				Ok(TradeIntent::AddLiquidity(AddLiquidityIntent {
					amount_a: self.required(&["amountA", "token1Amount"])?,
					token_a: self.required(&["tokenA", "token1Symbol", "token1"])?,
					amount_b: self.required(&["amountB", "token2Amount"])?,
					token_b: self.required(&["tokenB", "token2Symbol", "token2"])?,
					slippage: self.optional(&["slippage", "slippageTolerance"]),
				}))
			}
			"query" => self.query(),
			other => Err(IntentError::InvalidIntent(format!(
				"unsupported command type '{}'",
				other
			))),
		}
	}

	fn query(&self) -> Result<TradeIntent, IntentError> {
		let kind = match self.optional(&["intent", "kind", "query"]) {
			Some(kind) => kind.parse::<QueryKind>().map_err(IntentError::InvalidIntent)?,
			None => QueryKind::Reserves,
		};

		let pool = if let Some(address) = self.optional(&["poolAddress", "pool"]) {
			PoolRef::Address(address)
		} else {
			PoolRef::Pair {
				token_a: self.required(&["tokenA", "token1Symbol", "token1", "fromToken"])?,
				token_b: self.required(&["tokenB", "token2Symbol", "token2", "toToken"])?,
			}
		};

		let timeframe = match self.params.get("timeframe") {
			None | Some(Value::Null) => Timeframe::Today,
			Some(Value::String(s)) if s.eq_ignore_ascii_case("today") => Timeframe::Today,
			Some(Value::Object(window)) => {
				let bound = |key: &str| {
					window.get(key).and_then(Value::as_u64).ok_or_else(|| {
						IntentError::InvalidIntent(format!("timeframe is missing '{}'", key))
					})
				};
				Timeframe::Range {
					from: bound("from")?,
					to: bound("to")?,
				}
			}
			Some(other) => {
				return Err(IntentError::InvalidIntent(format!(
					"unsupported timeframe {}",
					other
				)))
			}
		};

		Ok(TradeIntent::Query(QueryIntent {
			kind,
			pool,
			timeframe,
		}))
	}

	fn optional(&self, keys: &[&str]) -> Option<String> {
		keys.iter()
			.filter_map(|key| self.params.get(*key))
			.find_map(|value| match value {
				Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
				Value::Number(n) => Some(n.to_string()),
				_ => None,
			})
	}

	fn required(&self, keys: &[&str]) -> Result<String, IntentError> {
		self.optional(keys).ok_or_else(|| {
			IntentError::InvalidIntent(format!("missing parameter '{}'", keys[0]))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn parsed(value: Value) -> ParsedIntent {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn test_swap_with_aliases_and_numeric_amount() {
		let intent = parsed(json!({
			"type": "swap",
			"action": "swapExactETHForTokens",
			"params": { "amount": 1.5, "fromToken": "ETH", "toToken": "testUSDC" },
			"confidence": 0.9,
			"explanation": "swap 1.5 ETH for testUSDC"
		}))
		.into_trade_intent(0.5)
		.unwrap();

		assert_eq!(
			intent,
			TradeIntent::Swap(SwapIntent {
				amount_in: "1.5".into(),
				token_in: "ETH".into(),
				token_out: "testUSDC".into(),
				slippage: None,
			})
		);
	}

	#[test]
	fn test_deposit_maps_to_add_liquidity() {
		let intent = parsed(json!({
			"type": "deposit",
			"params": {
				"token1Amount": "10",
				"token1Symbol": "DAI",
				"token2Amount": 20,
				"token2Symbol": "USDT",
				"slippage": "1%"
			},
			"confidence": 0.8
		}))
		.into_trade_intent(0.5)
		.unwrap();

		match intent {
			TradeIntent::AddLiquidity(add) => {
				assert_eq!(add.amount_a, "10");
				assert_eq!(add.token_b, "USDT");
				assert_eq!(add.amount_b, "20");
				assert_eq!(add.slippage.as_deref(), Some("1%"));
			}
			other => panic!("Expected add liquidity, got {:?}", other),
		}
	}

	#[test]
	fn test_low_confidence_short_circuits_with_explanation() {
		let result = parsed(json!({
			"type": "swap",
			"params": { "amount": 1, "fromToken": "ETH", "toToken": "DAI" },
			"confidence": 0.2,
			"explanation": "unsure which token"
		}))
		.into_trade_intent(0.5);

		match result {
			Err(IntentError::InvalidIntent(message)) => assert!(message.contains("unsure which token")),
			other => panic!("Expected invalid intent, got {:?}", other),
		}
	}

	#[test]
	fn test_error_type_surfaces_explanation() {
		let result = ParsedIntent::error("Failed to parse command").into_trade_intent(0.0);
		assert_eq!(
			result,
			Err(IntentError::InvalidIntent("Failed to parse command".into()))
		);
	}

	#[test]
	fn test_query_with_pair_and_window() {
		let intent = parsed(json!({
			"type": "query",
			"params": {
				"intent": "swapCount",
				"token1Symbol": "ETH",
				"token2Symbol": "testUSDC",
				"timeframe": { "from": 100, "to": 200 }
			},
			"confidence": 0.7
		}))
		.into_trade_intent(0.5)
		.unwrap();

		assert_eq!(
			intent,
			TradeIntent::Query(QueryIntent {
				kind: QueryKind::SwapCount,
				pool: PoolRef::Pair {
					token_a: "ETH".into(),
					token_b: "testUSDC".into()
				},
				timeframe: Timeframe::Range { from: 100, to: 200 },
			})
		);
	}

	#[test]
	fn test_missing_parameter_is_invalid() {
		let result = parsed(json!({
			"type": "swap",
			"params": { "amount": 1, "fromToken": "ETH" },
			"confidence": 1.0
		}))
		.into_trade_intent(0.5);
		assert!(matches!(result, Err(IntentError::InvalidIntent(m)) if m.contains("tokenOut")));
	}
}
