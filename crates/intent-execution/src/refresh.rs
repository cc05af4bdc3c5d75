//! Post-confirmation balance refresh.

use alloy::primitives::Address;
use async_trait::async_trait;
use intent_chain::{ChainError, ChainService};
use intent_types::{Token, TokenBalance};
use std::sync::Arc;

/// Re-reads balances and allowances after a plan's action confirms.
#[async_trait]
pub trait BalanceRefresher: Send + Sync {
	async fn refresh(
		&self,
		owner: Address,
		spender: Address,
		tokens: &[Token],
	) -> Result<Vec<TokenBalance>, ChainError>;
}

/// Refresher that reads straight from chain.
pub struct ChainBalanceRefresher {
	chain: Arc<ChainService>,
}

impl ChainBalanceRefresher {
	pub fn new(chain: Arc<ChainService>) -> Self {
		Self { chain }
	}
}

#[async_trait]
impl BalanceRefresher for ChainBalanceRefresher {
	async fn refresh(
		&self,
		owner: Address,
		spender: Address,
		tokens: &[Token],
	) -> Result<Vec<TokenBalance>, ChainError> {
		let mut balances = Vec::with_capacity(tokens.len());
		for token in tokens {
			let (balance, allowance) = if token.is_native {
				(self.chain.native_balance(owner).await?, None)
			} else {
				(
					self.chain.balance_of(token.address, owner).await?,
					Some(self.chain.allowance(token.address, owner, spender).await?),
				)
			};
			tracing::debug!(token = %token.symbol, %balance, "Refreshed balance");
			balances.push(TokenBalance {
				token: token.address,
				symbol: token.symbol.clone(),
				balance,
				allowance,
			});
		}
		Ok(balances)
	}
}
