//! Token and pool resolution.
//!
//! The [`TokenRegistry`] turns symbols into token metadata and handles the
//! native/wrapped substitution. The [`PoolResolver`] finds the pool for a
//! token pair and reads its reserves.

use alloy::primitives::Address;
use intent_chain::ChainError;
use intent_types::IntentError;
use thiserror::Error;

pub mod registry;
pub mod resolver;

pub use registry::TokenRegistry;
pub use resolver::PoolResolver;

/// Errors that can occur while resolving tokens and pools.
#[derive(Debug, Error)]
pub enum PoolError {
	/// The symbol or address does not name a known token.
	#[error("Unknown token: {0}")]
	UnknownToken(String),
	/// The factory has no pair for these tokens in either order.
	#[error("No pool for {token_a} / {token_b}")]
	PoolNotFound { token_a: Address, token_b: Address },
	/// Both sides resolve to the same tradable address.
	#[error("Cannot pair {0} with itself")]
	IdenticalTokens(String),
	/// Pool creation was requested for a pair that already exists.
	#[error("Pool for {token_a} / {token_b} already exists at {pool}")]
	PoolExists {
		token_a: Address,
		token_b: Address,
		pool: Address,
	},
	/// Error from the underlying chain client.
	#[error(transparent)]
	Chain(#[from] ChainError),
}

impl From<PoolError> for IntentError {
	fn from(err: PoolError) -> Self {
		match err {
			PoolError::UnknownToken(token) => IntentError::UnknownToken(token),
			PoolError::PoolNotFound { token_a, token_b } => {
				IntentError::PoolNotFound { token_a, token_b }
			}
			PoolError::IdenticalTokens(_) | PoolError::PoolExists { .. } => {
				IntentError::InvalidIntent(err.to_string())
			}
			PoolError::Chain(e) => IntentError::Chain(e.to_string()),
		}
	}
}
