//! Token metadata.

use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Placeholder address used for the chain's native asset.
pub const NATIVE_PLACEHOLDER: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// A resolved token.
///
/// Tokens are immutable once resolved. The native asset keeps its placeholder
/// address here; the wrapped address is substituted only when a transaction
/// is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
	pub is_native: bool,
}

impl Token {
	/// Creates a descriptor for an ERC-20 token.
	pub fn erc20(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
		Self {
			address,
			symbol: symbol.into(),
			decimals,
			is_native: false,
		}
	}

	/// Creates the descriptor for the native asset.
	pub fn native(symbol: impl Into<String>, decimals: u8) -> Self {
		Self {
			address: NATIVE_PLACEHOLDER,
			symbol: symbol.into(),
			decimals,
			is_native: true,
		}
	}
}

impl std::fmt::Display for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} ({})", self.symbol, self.address)
	}
}
