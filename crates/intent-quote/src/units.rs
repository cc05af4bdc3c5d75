//! Conversions between user-facing decimal strings and minor units.

use crate::{QuoteError, BPS};
use alloy::primitives::utils::{format_units, parse_units, ParseUnits};
use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Checks that `amount` is a positive decimal number without knowing the
/// token's decimals yet.
pub fn validate_amount_syntax(amount: &str) -> Result<(), QuoteError> {
	let trimmed = amount.trim();
	if trimmed.is_empty() {
		return Err(QuoteError::InvalidAmount("amount is empty".to_string()));
	}
	let value = Decimal::from_str(trimmed)
		.map_err(|e| QuoteError::InvalidAmount(format!("'{}': {}", trimmed, e)))?;
	if value <= Decimal::ZERO {
		return Err(QuoteError::InvalidAmount(format!(
			"'{}' must be greater than zero",
			trimmed
		)));
	}
	Ok(())
}

/// Parses a decimal string such as `"1.5"` into minor units.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, QuoteError> {
	let trimmed = amount.trim();
	if trimmed.starts_with('-') {
		return Err(QuoteError::InvalidAmount(format!(
			"'{}' must be greater than zero",
			trimmed
		)));
	}

	let parsed = parse_units(trimmed, decimals)
		.map_err(|e| QuoteError::InvalidAmount(format!("'{}': {}", trimmed, e)))?;
	let value = match parsed {
		ParseUnits::U256(value) => value,
		ParseUnits::I256(_) => {
			return Err(QuoteError::InvalidAmount(format!(
				"'{}' must be greater than zero",
				trimmed
			)))
		}
	};

	if value.is_zero() {
		return Err(QuoteError::InvalidAmount(format!(
			"'{}' must be greater than zero",
			trimmed
		)));
	}
	Ok(value)
}

/// Formats minor units for display.
pub fn format_amount(amount: U256, decimals: u8) -> String {
	format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}

/// Converts a slippage percentage (`"0.5"`, `"0.5%"`) into basis points.
///
/// Accepts `[0, 100]` percent. Fractions of a basis point are dropped, which
/// only ever tightens the bound.
pub fn percent_to_bps(percent: &str) -> Result<u32, QuoteError> {
	let trimmed = percent.trim();
	let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
	let value = Decimal::from_str(number)
		.map_err(|e| QuoteError::InvalidSlippage(format!("'{}': {}", trimmed, e)))?;

	if value < Decimal::ZERO || value > Decimal::from(100) {
		return Err(QuoteError::InvalidSlippage(format!(
			"'{}' is outside 0-100%",
			trimmed
		)));
	}

	(value * Decimal::from(100))
		.floor()
		.to_u32()
		.map(|bps| bps.min(BPS))
		.ok_or_else(|| QuoteError::InvalidSlippage(format!("'{}' is not representable", trimmed)))
}
