//! Constant-product quote math.
//!
//! Pure functions over minor-unit integers. Every function takes the reserve
//! snapshot it quotes against as an explicit argument, so the same inputs
//! always produce the same quote.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod units;

pub use units::{format_amount, parse_amount, percent_to_bps, validate_amount_syntax};

/// Basis-point denominator.
pub const BPS: u32 = 10_000;

/// Pool fee taken from the input amount, in basis points.
pub const DEFAULT_FEE_BPS: u32 = 30;

/// Errors that can occur while computing quotes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
	/// The inputs do not describe a tradable pool or amount.
	#[error("Invalid quote: {0}")]
	InvalidQuote(String),
	/// An amount string could not be turned into minor units.
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
	/// A slippage string is malformed or out of range.
	#[error("Invalid slippage: {0}")]
	InvalidSlippage(String),
}

fn checked_mul(a: U256, b: U256) -> Result<U256, QuoteError> {
	a.checked_mul(b)
		.ok_or_else(|| QuoteError::InvalidQuote("arithmetic overflow".to_string()))
}

/// Output of selling `amount_in` into a pool, after the input-side fee.
///
/// `amount_out = amount_in * (10000 - fee) * reserve_out
///             / (reserve_in * 10000 + amount_in * (10000 - fee))`
pub fn quote_swap_output(
	amount_in: U256,
	reserve_in: U256,
	reserve_out: U256,
	fee_bps: u32,
) -> Result<U256, QuoteError> {
	if reserve_in.is_zero() || reserve_out.is_zero() {
		return Err(QuoteError::InvalidQuote("pool has no liquidity".to_string()));
	}
	if amount_in.is_zero() {
		return Err(QuoteError::InvalidQuote(
			"input amount must be positive".to_string(),
		));
	}
	if fee_bps >= BPS {
		return Err(QuoteError::InvalidQuote(format!(
			"fee of {} bps leaves nothing to trade",
			fee_bps
		)));
	}

	let amount_in_with_fee = checked_mul(amount_in, U256::from(BPS - fee_bps))?;
	let numerator = checked_mul(amount_in_with_fee, reserve_out)?;
	let denominator = checked_mul(reserve_in, U256::from(BPS))?
		.checked_add(amount_in_with_fee)
		.ok_or_else(|| QuoteError::InvalidQuote("arithmetic overflow".to_string()))?;

	Ok(numerator / denominator)
}

/// Lowest acceptable output for a slippage tolerance.
///
/// Slippage is clamped to `[0, 10000]`. At 10000 the bound is zero, meaning
/// any output is accepted; callers must get explicit confirmation for that.
pub fn min_output_with_slippage(amount_out: U256, slippage_bps: u32) -> U256 {
	let slippage = slippage_bps.min(BPS);
	// Multiplying first keeps precision; fall back to dividing first on overflow.
	match amount_out.checked_mul(U256::from(BPS - slippage)) {
		Some(scaled) => scaled / U256::from(BPS),
		None => amount_out / U256::from(BPS) * U256::from(BPS - slippage),
	}
}

/// Per-side minimums for a liquidity deposit.
pub fn min_liquidity_amounts(amount_a: U256, amount_b: U256, slippage_bps: u32) -> (U256, U256) {
	(
		min_output_with_slippage(amount_a, slippage_bps),
		min_output_with_slippage(amount_b, slippage_bps),
	)
}

/// Execution price versus mid price, in basis points.
///
/// `10000 - (amount_out / amount_in) / (reserve_out / reserve_in) * 10000`,
/// saturating at zero. The result includes the pool fee.
pub fn price_impact_bps(
	amount_in: U256,
	amount_out: U256,
	reserve_in: U256,
	reserve_out: U256,
) -> Result<u32, QuoteError> {
	if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
		return Err(QuoteError::InvalidQuote(
			"price impact needs a positive amount and reserves".to_string(),
		));
	}

	let executed = checked_mul(checked_mul(amount_out, reserve_in)?, U256::from(BPS))?;
	let ideal = checked_mul(amount_in, reserve_out)?;
	let ratio = executed / ideal;

	let bps = U256::from(BPS);
	Ok(if ratio >= bps {
		0
	} else {
		(bps - ratio).to::<u32>()
	})
}

/// Price impact approximated from the input reserve alone.
///
/// `amount_in / (reserve_in + amount_in)`, which is the exact fee-less impact
/// of a constant-product trade.
///
/// Routing always has both reserves and uses [`price_impact_bps`]. This is
/// for callers that hold only the input side of a pool, such as a price
/// preview before the output reserve has been read.
pub fn reserve_ratio_impact_bps(amount_in: U256, reserve_in: U256) -> Result<u32, QuoteError> {
	let total = reserve_in
		.checked_add(amount_in)
		.ok_or_else(|| QuoteError::InvalidQuote("arithmetic overflow".to_string()))?;
	if total.is_zero() {
		return Err(QuoteError::InvalidQuote(
			"price impact needs a positive amount or reserve".to_string(),
		));
	}
	Ok((checked_mul(amount_in, U256::from(BPS))? / total).to::<u32>())
}

/// A complete swap quote against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
	pub amount_in: U256,
	pub amount_out: U256,
	pub min_out: U256,
	pub price_impact_bps: u32,
	pub fee_bps: u32,
	pub slippage_bps: u32,
}

impl SwapQuote {
	pub fn compute(
		amount_in: U256,
		reserve_in: U256,
		reserve_out: U256,
		fee_bps: u32,
		slippage_bps: u32,
	) -> Result<Self, QuoteError> {
		let amount_out = quote_swap_output(amount_in, reserve_in, reserve_out, fee_bps)?;
		let price_impact_bps = price_impact_bps(amount_in, amount_out, reserve_in, reserve_out)?;
		let slippage_bps = slippage_bps.min(BPS);

		Ok(Self {
			amount_in,
			amount_out,
			min_out: min_output_with_slippage(amount_out, slippage_bps),
			price_impact_bps,
			fee_bps,
			slippage_bps,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn u(v: u64) -> U256 {
		U256::from(v)
	}

	#[test]
	fn test_reference_swap_quote() {
		// 1000 * 9970 * 2_000_000 / (1_000_000 * 10000 + 1000 * 9970)
		let out = quote_swap_output(u(1000), u(1_000_000), u(2_000_000), DEFAULT_FEE_BPS).unwrap();
		assert_eq!(out, u(1992));
		assert_eq!(min_output_with_slippage(out, 50), u(1982));
	}

	#[test]
	fn test_quote_struct_matches_functions() {
		let quote = SwapQuote::compute(u(1000), u(1_000_000), u(2_000_000), 30, 50).unwrap();
		assert_eq!(quote.amount_out, u(1992));
		assert_eq!(quote.min_out, u(1982));
		// 1992 * 1_000_000 * 10000 / (1000 * 2_000_000) = 9960
		assert_eq!(quote.price_impact_bps, 40);
	}

	#[test]
	fn test_output_stays_below_reserve_and_grows_with_input() {
		let reserve_in = u(1_000_000);
		let reserve_out = u(2_000_000);
		let mut previous = U256::ZERO;
		for amount in [1u64, 10, 1_000, 100_000, 1_000_000, 50_000_000, 1_000_000_000_000] {
			let out = quote_swap_output(u(amount), reserve_in, reserve_out, 30).unwrap();
			assert!(out < reserve_out, "output {} must stay below reserve", out);
			assert!(out >= previous, "output must not shrink as input grows");
			previous = out;
		}
	}

	#[test]
	fn test_invalid_quote_inputs() {
		assert!(matches!(
			quote_swap_output(u(1), U256::ZERO, u(10), 30),
			Err(QuoteError::InvalidQuote(_))
		));
		assert!(matches!(
			quote_swap_output(u(1), u(10), U256::ZERO, 30),
			Err(QuoteError::InvalidQuote(_))
		));
		assert!(matches!(
			quote_swap_output(U256::ZERO, u(10), u(10), 30),
			Err(QuoteError::InvalidQuote(_))
		));
		assert!(matches!(
			quote_swap_output(u(1), u(10), u(10), 10_000),
			Err(QuoteError::InvalidQuote(_))
		));
	}

	#[test]
	fn test_overflow_is_reported_not_wrapped() {
		let result = quote_swap_output(U256::MAX, U256::MAX, U256::MAX, 30);
		assert!(matches!(result, Err(QuoteError::InvalidQuote(_))));
	}

	#[test]
	fn test_min_output_bounds() {
		let x = u(123_456_789);
		assert_eq!(min_output_with_slippage(x, 0), x);
		assert_eq!(min_output_with_slippage(x, 10_000), U256::ZERO);
		assert_eq!(min_output_with_slippage(x, 25_000), U256::ZERO);
		for bps in [1u32, 50, 100, 999, 5_000] {
			assert!(min_output_with_slippage(x, bps) <= x);
		}
		assert!(min_output_with_slippage(U256::MAX, 50) <= U256::MAX);
	}

	#[test]
	fn test_min_liquidity_amounts_reduce_each_side() {
		let (a, b) = min_liquidity_amounts(u(10_000), u(4_000), 100);
		assert_eq!(a, u(9_900));
		assert_eq!(b, u(3_960));
	}

	#[test]
	fn test_price_impact_grows_with_trade_size() {
		let small = price_impact_bps(
			u(1_000),
			quote_swap_output(u(1_000), u(1_000_000), u(1_000_000), 30).unwrap(),
			u(1_000_000),
			u(1_000_000),
		)
		.unwrap();
		let large = price_impact_bps(
			u(500_000),
			quote_swap_output(u(500_000), u(1_000_000), u(1_000_000), 30).unwrap(),
			u(1_000_000),
			u(1_000_000),
		)
		.unwrap();
		assert!(small < large);
		assert!(large > 3_000);
	}

	#[test]
	fn test_reserve_ratio_impact() {
		assert_eq!(reserve_ratio_impact_bps(u(1_000), u(1_000_000)).unwrap(), 9);
		assert_eq!(reserve_ratio_impact_bps(u(1_000_000), u(1_000_000)).unwrap(), 5_000);
		assert!(reserve_ratio_impact_bps(U256::ZERO, U256::ZERO).is_err());
	}
}
