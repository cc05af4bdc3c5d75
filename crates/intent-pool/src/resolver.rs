//! Pair lookup and reserve reads.

use crate::{PoolError, TokenRegistry};
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::Address;
use intent_chain::{expect_uint, ChainService};
use intent_types::{abi, ContractCall, Pool, ReserveSnapshot, Token};
use std::sync::Arc;

/// Resolves tokens and pools against the factory.
pub struct PoolResolver {
	chain: Arc<ChainService>,
	registry: Arc<TokenRegistry>,
	factory: Address,
}

impl PoolResolver {
	pub fn new(chain: Arc<ChainService>, registry: Arc<TokenRegistry>, factory: Address) -> Self {
		Self {
			chain,
			registry,
			factory,
		}
	}

	pub fn registry(&self) -> &TokenRegistry {
		&self.registry
	}

	/// Resolves a symbol or address to token metadata.
	///
	/// Symbols must be in the registry. Addresses that are not listed are
	/// read from chain (`decimals()`, `symbol()`); if that fails the token is
	/// unknown.
	pub async fn resolve_token(&self, symbol_or_address: &str) -> Result<Token, PoolError> {
		let input = symbol_or_address.trim();
		if let Some(token) = self.registry.lookup(input) {
			return Ok(token);
		}
		if !TokenRegistry::is_address_like(input) {
			return Err(PoolError::UnknownToken(input.to_string()));
		}

		let address: Address = input
			.parse()
			.map_err(|_| PoolError::UnknownToken(input.to_string()))?;

		let decimals = match self.chain.read_uint(address, abi::erc20::DECIMALS, &[]).await {
			Ok(decimals) if decimals <= alloy::primitives::U256::from(u8::MAX) => {
				decimals.to::<u8>()
			}
			Ok(_) | Err(_) => return Err(PoolError::UnknownToken(input.to_string())),
		};
		let symbol = self
			.chain
			.read_string(address, abi::erc20::SYMBOL, &[])
			.await
			.unwrap_or_else(|_| format!("{}..{}", &input[..6], &input[input.len() - 4..]));

		tracing::debug!(%address, %symbol, decimals, "Resolved token from chain");
		Ok(Token::erc20(address, symbol, decimals))
	}

	/// Token to show for an on-chain address.
	///
	/// The wrapped native token reads as the native asset; unlisted addresses
	/// are resolved from chain like any literal address.
	pub async fn display_token(&self, address: Address) -> Result<Token, PoolError> {
		match self.registry.for_display(address) {
			Some(token) => Ok(token),
			None => self.resolve_token(&address.to_string()).await,
		}
	}

	/// Finds the pair address, trying `(a, b)` before `(b, a)`.
	pub async fn find_pair(&self, a: Address, b: Address) -> Result<Option<Address>, PoolError> {
		for (first, second) in [(a, b), (b, a)] {
			let pair = self
				.chain
				.read_address(
					self.factory,
					abi::factory::GET_PAIR,
					&[DynSolValue::Address(first), DynSolValue::Address(second)],
				)
				.await?;
			if !pair.is_zero() {
				return Ok(Some(pair));
			}
		}
		Ok(None)
	}

	/// Resolves the pool for two tokens, in either order, with fresh reserves.
	pub async fn resolve_pool(&self, token_a: &Token, token_b: &Token) -> Result<Pool, PoolError> {
		let a = self.registry.to_tradable_address(token_a);
		let b = self.registry.to_tradable_address(token_b);
		if a == b {
			return Err(PoolError::IdenticalTokens(token_a.symbol.clone()));
		}

		let pair = self
			.find_pair(a, b)
			.await?
			.ok_or(PoolError::PoolNotFound {
				token_a: a,
				token_b: b,
			})?;

		self.load_pool(pair).await
	}

	/// Reads a pair's tokens and reserves.
	pub async fn load_pool(&self, pair: Address) -> Result<Pool, PoolError> {
		let token0 = self.chain.read_address(pair, abi::pair::TOKEN0, &[]).await?;
		let token1 = self.chain.read_address(pair, abi::pair::TOKEN1, &[]).await?;
		let snapshot = self.snapshot(pair).await?;

		Ok(Pool {
			address: pair,
			token0,
			token1,
			reserve0: snapshot.reserve0,
			reserve1: snapshot.reserve1,
			last_update_timestamp: snapshot.last_update_timestamp,
		})
	}

	/// Re-reads a pair's reserves.
	pub async fn snapshot(&self, pair: Address) -> Result<ReserveSnapshot, PoolError> {
		read_snapshot(&self.chain, pair).await.map_err(PoolError::from)
	}

	/// Builds the factory call that creates a pair for two tokens.
	///
	/// Pool creation is always an explicit request; routing never calls this.
	pub async fn create_pool_call(
		&self,
		token_a: &Token,
		token_b: &Token,
	) -> Result<ContractCall, PoolError> {
		let a = self.registry.to_tradable_address(token_a);
		let b = self.registry.to_tradable_address(token_b);
		if a == b {
			return Err(PoolError::IdenticalTokens(token_a.symbol.clone()));
		}
		if let Some(pool) = self.find_pair(a, b).await? {
			return Err(PoolError::PoolExists {
				token_a: a,
				token_b: b,
				pool,
			});
		}

		Ok(ContractCall::new(
			self.factory,
			abi::factory::CREATE_PAIR,
			vec![DynSolValue::Address(a), DynSolValue::Address(b)],
		))
	}
}

/// Reads `getReserves()` from a pair.
pub async fn read_snapshot(
	chain: &ChainService,
	pair: Address,
) -> Result<ReserveSnapshot, intent_chain::ChainError> {
	let values = chain.read(pair, abi::pair::GET_RESERVES, &[]).await?;
	Ok(ReserveSnapshot {
		pool: pair,
		reserve0: expect_uint(&values, 0)?,
		reserve1: expect_uint(&values, 1)?,
		last_update_timestamp: expect_uint(&values, 2)?.saturating_to::<u32>(),
	})
}
