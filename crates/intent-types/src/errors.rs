//! Error taxonomy surfaced to callers.

use crate::PlanId;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that stop an intent from becoming, or finishing as, a transaction.
///
/// Validation variants are produced before any network call. Chain-side
/// variants carry the raw message from the node or wallet.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntentError {
	#[error("Invalid intent: {0}")]
	InvalidIntent(String),
	#[error("Unknown token: {0}")]
	UnknownToken(String),
	#[error("No pool found for {token_a} / {token_b}")]
	PoolNotFound { token_a: Address, token_b: Address },
	#[error("Insufficient {symbol} balance: have {available}, need {required}")]
	InsufficientBalance {
		symbol: String,
		available: U256,
		required: U256,
	},
	#[error("Price impact of {impact_bps} bps exceeds the {max_bps} bps limit")]
	ExcessivePriceImpact { impact_bps: u32, max_bps: u32 },
	#[error("Approval failed: {0}")]
	ApprovalFailed(String),
	#[error("Action failed: {0}")]
	ActionFailed(String),
	#[error("Cancelled by user: {0}")]
	UserCancelled(String),
	#[error("Quote is stale: pool reserves changed since the plan was built")]
	StaleQuote,
	#[error("Plan {0} is already executing")]
	AlreadyInFlight(PlanId),
	#[error("Chain error: {0}")]
	Chain(String),
}

impl IntentError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::InvalidIntent(_) => ErrorKind::InvalidIntent,
			Self::UnknownToken(_) => ErrorKind::UnknownToken,
			Self::PoolNotFound { .. } => ErrorKind::PoolNotFound,
			Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
			Self::ExcessivePriceImpact { .. } => ErrorKind::ExcessivePriceImpact,
			Self::ApprovalFailed(_) => ErrorKind::ApprovalFailed,
			Self::ActionFailed(_) => ErrorKind::ActionFailed,
			Self::UserCancelled(_) => ErrorKind::UserCancelled,
			Self::StaleQuote => ErrorKind::StaleQuote,
			Self::AlreadyInFlight(_) => ErrorKind::AlreadyInFlight,
			Self::Chain(_) => ErrorKind::Chain,
		}
	}
}

/// Serializable discriminant of [`IntentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
	InvalidIntent,
	UnknownToken,
	PoolNotFound,
	InsufficientBalance,
	ExcessivePriceImpact,
	ApprovalFailed,
	ActionFailed,
	UserCancelled,
	StaleQuote,
	AlreadyInFlight,
	Chain,
}
