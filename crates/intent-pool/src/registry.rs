//! Static token table with native/wrapped substitution.

use alloy::primitives::{address, Address};
use intent_types::Token;
use std::collections::HashMap;

/// Wrapped native token of the default deployment.
pub const DEFAULT_WRAPPED_NATIVE: Address = address!("764ac516ec320a310375e69f59180355c69e313f");

/// Canonical token metadata keyed by symbol and by address.
///
/// Symbol lookups are case-insensitive. The registry never guesses: anything
/// not in the table is unknown here, and literal addresses of unlisted tokens
/// are left to [`crate::PoolResolver`] to look up on chain.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
	by_symbol: HashMap<String, Token>,
	by_address: HashMap<Address, Token>,
	native: Token,
	wrapped: Token,
}

impl TokenRegistry {
	/// Creates a registry holding only the native asset and its wrapped form.
	pub fn new(wrapped_native: Address) -> Self {
		let native = Token::native("ETH", 18);
		let wrapped = Token::erc20(wrapped_native, "WETH", 18);
		let mut registry = Self {
			by_symbol: HashMap::new(),
			by_address: HashMap::new(),
			native: native.clone(),
			wrapped: wrapped.clone(),
		};
		registry.insert(native);
		registry.insert(wrapped);
		registry
	}

	/// Creates a registry with the default token list.
	pub fn with_defaults(wrapped_native: Address) -> Self {
		let mut registry = Self::new(wrapped_native);
		for token in [
			Token::erc20(
				address!("8682d6f065e716d4c78b7bb5701e6e5859d050c5"),
				"testUSDC",
				6,
			),
			Token::erc20(
				address!("dAC17F958D2ee523a2206206994597C13D831ec7"),
				"USDT",
				6,
			),
			Token::erc20(
				address!("6B175474E89094C44Da98b954EedeAC495271d0F"),
				"DAI",
				18,
			),
		] {
			registry.insert(token);
		}
		registry
	}

	fn insert(&mut self, token: Token) {
		self.by_symbol
			.insert(token.symbol.to_lowercase(), token.clone());
		self.by_address.insert(token.address, token);
	}

	/// Adds or replaces an ERC-20 entry.
	///
	/// The native asset and the wrapped token are fixed at construction and
	/// cannot be overridden.
	pub fn register(&mut self, token: Token) -> bool {
		let reserved = token.is_native
			|| token.address == self.wrapped.address
			|| token.symbol.eq_ignore_ascii_case(&self.native.symbol)
			|| token.symbol.eq_ignore_ascii_case(&self.wrapped.symbol);
		if reserved {
			tracing::warn!(symbol = %token.symbol, "Ignoring override of native or wrapped token");
			return false;
		}
		self.insert(token);
		true
	}

	/// Looks up a symbol (case-insensitive) or a listed address.
	pub fn lookup(&self, symbol_or_address: &str) -> Option<Token> {
		let input = symbol_or_address.trim();
		if Self::is_address_like(input) {
			let address: Address = input.parse().ok()?;
			return self.by_address(address);
		}
		self.by_symbol.get(&input.to_lowercase()).cloned()
	}

	pub fn by_address(&self, address: Address) -> Option<Token> {
		self.by_address.get(&address).cloned()
	}

	pub fn native(&self) -> &Token {
		&self.native
	}

	pub fn wrapped(&self) -> &Token {
		&self.wrapped
	}

	/// Address to use in every on-chain call for `token`.
	pub fn to_tradable_address(&self, token: &Token) -> Address {
		if token.is_native {
			self.wrapped.address
		} else {
			token.address
		}
	}

	/// Token to show for an on-chain address; the wrapped token reads as native.
	pub fn for_display(&self, address: Address) -> Option<Token> {
		if address == self.wrapped.address {
			return Some(self.native.clone());
		}
		self.by_address(address)
	}

	/// Whether `input` looks like a 20-byte hex address.
	pub fn is_address_like(input: &str) -> bool {
		let input = input.trim();
		input.len() == 42
			&& (input.starts_with("0x") || input.starts_with("0X"))
			&& input[2..].chars().all(|c| c.is_ascii_hexdigit())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use intent_types::NATIVE_PLACEHOLDER;

	#[test]
	fn test_symbol_lookup_is_case_insensitive() {
		let registry = TokenRegistry::with_defaults(DEFAULT_WRAPPED_NATIVE);
		let usdc = registry.lookup("testusdc").unwrap();
		assert_eq!(usdc.symbol, "testUSDC");
		assert_eq!(usdc.decimals, 6);
		assert_eq!(registry.lookup("TESTUSDC"), Some(usdc));
		assert_eq!(registry.lookup(" dai ").unwrap().decimals, 18);
	}

	#[test]
	fn test_unknown_symbol_is_not_guessed() {
		let registry = TokenRegistry::with_defaults(DEFAULT_WRAPPED_NATIVE);
		assert_eq!(registry.lookup("USDC"), None);
		assert_eq!(registry.lookup(""), None);
	}

	#[test]
	fn test_listed_address_lookup() {
		let registry = TokenRegistry::with_defaults(DEFAULT_WRAPPED_NATIVE);
		let dai = registry
			.lookup("0x6b175474e89094c44da98b954eedeac495271d0f")
			.unwrap();
		assert_eq!(dai.symbol, "DAI");
		assert_eq!(
			registry.lookup("0x0000000000000000000000000000000000000001"),
			None
		);
	}

	#[test]
	fn test_native_substitution_is_symmetric() {
		let registry = TokenRegistry::with_defaults(DEFAULT_WRAPPED_NATIVE);
		let eth = registry.lookup("eth").unwrap();
		assert!(eth.is_native);
		assert_eq!(eth.address, NATIVE_PLACEHOLDER);
		assert_eq!(registry.to_tradable_address(&eth), DEFAULT_WRAPPED_NATIVE);

		let weth = registry.lookup("WETH").unwrap();
		assert_eq!(registry.to_tradable_address(&weth), DEFAULT_WRAPPED_NATIVE);
		assert_eq!(registry.for_display(DEFAULT_WRAPPED_NATIVE), Some(eth));
	}

	#[test]
	fn test_register_custom_token() {
		let mut registry = TokenRegistry::new(DEFAULT_WRAPPED_NATIVE);
		let custom = Token::erc20(Address::repeat_byte(0x42), "MEME", 9);
		assert!(registry.register(custom.clone()));
		assert_eq!(registry.lookup("meme"), Some(custom));

		assert!(!registry.register(Token::erc20(Address::repeat_byte(0x43), "weth", 18)));
		assert_eq!(registry.lookup("WETH").unwrap().address, DEFAULT_WRAPPED_NATIVE);
	}

	#[test]
	fn test_address_detection() {
		assert!(TokenRegistry::is_address_like(
			"0x764ac516ec320a310375e69f59180355c69e313f"
		));
		assert!(!TokenRegistry::is_address_like("0x764ac516"));
		assert!(!TokenRegistry::is_address_like("testUSDC"));
		assert!(!TokenRegistry::is_address_like(
			"0x764ac516ec320a310375e69f59180355c69e313g"
		));
	}
}
