//! Execution plans.
//!
//! A plan is the resolved, typed translation of an intent: concrete addresses,
//! minor-unit amounts, the output bound, the deadline and the approvals that
//! must land first. Plans are built once by the router and never modified.

use crate::{abi, Pool, ReserveSnapshot, Token};
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Deterministic identity of a plan.
///
/// Derived from what the plan does, not when it was built, so submitting the
/// same trade twice yields the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub B256);

impl PlanId {
	pub fn from_parts(parts: &[&[u8]]) -> Self {
		let mut buf = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
		for part in parts {
			buf.extend_from_slice(part);
		}
		Self(keccak256(&buf))
	}
}

impl std::fmt::Display for PlanId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanKind {
	SwapExactEthForTokens,
	SwapExactTokensForEth,
	SwapExactTokensForTokens,
	AddLiquidity,
	AddLiquidityEth,
	CreatePair,
}

impl PlanKind {
	pub fn tag(&self) -> u8 {
		match self {
			Self::SwapExactEthForTokens => 1,
			Self::SwapExactTokensForEth => 2,
			Self::SwapExactTokensForTokens => 3,
			Self::AddLiquidity => 4,
			Self::AddLiquidityEth => 5,
			Self::CreatePair => 6,
		}
	}
}

/// A single contract invocation. ABI encoding is left to the chain client.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
	pub to: Address,
	/// Human-readable function signature, see [`crate::abi`].
	pub signature: String,
	pub args: Vec<DynSolValue>,
	/// Native value attached to the call.
	pub value: U256,
}

impl ContractCall {
	pub fn new(to: Address, signature: &str, args: Vec<DynSolValue>) -> Self {
		Self {
			to,
			signature: signature.to_string(),
			args,
			value: U256::ZERO,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	pub fn function_name(&self) -> &str {
		abi::function_name(&self.signature)
	}
}

/// An allowance that must be raised before the plan's action can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequirement {
	pub token: Token,
	pub spender: Address,
	pub current_allowance: U256,
	pub required_amount: U256,
}

/// Amounts the plan was quoted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlanBounds {
	#[serde(rename_all = "camelCase")]
	Swap {
		amount_in: U256,
		expected_out: U256,
		min_out: U256,
		price_impact_bps: u32,
	},
	#[serde(rename_all = "camelCase")]
	Liquidity {
		amount_a: U256,
		amount_b: U256,
		min_a: U256,
		min_b: U256,
	},
	None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
	pub id: PlanId,
	pub kind: PlanKind,
	pub owner: Address,
	pub action: ContractCall,
	/// Processed strictly in order.
	pub approvals: Vec<ApprovalRequirement>,
	/// Unix seconds after which the action must not be submitted.
	pub deadline: u64,
	/// Reserves the quote was computed from. `None` for pool creation.
	pub snapshot: Option<ReserveSnapshot>,
	pub pool: Option<Pool>,
	pub bounds: PlanBounds,
	/// Tokens whose balances change when the action confirms.
	pub touched_tokens: Vec<Token>,
}

impl ExecutionPlan {
	pub fn summary(&self) -> PlanSummary {
		PlanSummary {
			id: self.id,
			kind: self.kind,
			owner: self.owner,
			target: self.action.to,
			function: self.action.function_name().to_string(),
			value: self.action.value,
			approvals: self
				.approvals
				.iter()
				.map(|a| ApprovalSummary {
					token: a.token.symbol.clone(),
					spender: a.spender,
					required_amount: a.required_amount,
				})
				.collect(),
			deadline: self.deadline,
			pool: self.pool.as_ref().map(|p| p.address),
			bounds: self.bounds.clone(),
			tokens: self.touched_tokens.iter().map(|t| t.symbol.clone()).collect(),
		}
	}
}

/// Serializable view of a plan for logs, the journal and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
	pub id: PlanId,
	pub kind: PlanKind,
	pub owner: Address,
	pub target: Address,
	pub function: String,
	pub value: U256,
	pub approvals: Vec<ApprovalSummary>,
	pub deadline: u64,
	pub pool: Option<Address>,
	pub bounds: PlanBounds,
	pub tokens: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalSummary {
	pub token: String,
	pub spender: Address,
	pub required_amount: U256,
}
