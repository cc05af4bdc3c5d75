//! Terminal results reported to the caller.

use crate::{ErrorKind, IntentError, PlanId, QueryKind, Timeframe, Token};
use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
	pub hash: B256,
	pub block_number: u64,
	pub success: bool,
}

/// A query resolved down to concrete pool and token identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
	pub kind: QueryKind,
	pub pool: Address,
	/// Pair tokens in pool order, as shown to the user: the wrapped native
	/// token reads as the native asset.
	pub token0: Token,
	pub token1: Token,
	pub timeframe: Timeframe,
}

/// What happened to an intent. Exactly one variant is ever reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Outcome {
	Success(Success),
	/// Refused before anything was submitted.
	#[serde(rename_all = "camelCase")]
	Rejected {
		plan_id: Option<PlanId>,
		kind: ErrorKind,
		message: String,
	},
	Failed(FailureReport),
	Cancelled(FailureReport),
}

impl Outcome {
	pub fn rejected(plan_id: Option<PlanId>, error: &IntentError) -> Self {
		Self::Rejected {
			plan_id,
			kind: error.kind(),
			message: error.to_string(),
		}
	}

	pub fn plan_id(&self) -> Option<PlanId> {
		match self {
			Self::Success(Success::Executed(receipt)) => Some(receipt.plan_id),
			Self::Success(Success::Reported(_)) => None,
			Self::Rejected { plan_id, .. } => *plan_id,
			Self::Failed(report) | Self::Cancelled(report) => Some(report.plan_id),
		}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success(_))
	}

	pub fn label(&self) -> &'static str {
		match self {
			Self::Success(_) => "success",
			Self::Rejected { .. } => "rejected",
			Self::Failed(_) => "failed",
			Self::Cancelled(_) => "cancelled",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "camelCase")]
pub enum Success {
	Executed(ExecutionReceipt),
	Reported(QueryRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReceipt {
	pub plan_id: PlanId,
	pub approvals: Vec<TransactionReceipt>,
	pub action: TransactionReceipt,
}

/// The step of a plan at which execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum ExecutionStep {
	Preflight,
	Approval { index: usize, total: usize },
	Action,
}

impl std::fmt::Display for ExecutionStep {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Preflight => write!(f, "preflight"),
			Self::Approval { index, total } => write!(f, "approval {} of {}", index + 1, total),
			Self::Action => write!(f, "action"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureCause {
	UserRejected,
	Reverted,
	Expired,
	Timeout,
	Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
	pub plan_id: PlanId,
	pub step: ExecutionStep,
	pub kind: ErrorKind,
	pub cause: FailureCause,
	/// Raw message from the wallet or node.
	pub message: String,
	/// Set when the transaction may still land, e.g. after a confirmation timeout.
	pub ambiguous: bool,
	/// Hashes of every transaction submitted for the plan, in order.
	pub transactions: Vec<B256>,
}
