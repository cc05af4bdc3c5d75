use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{ExecutionState, ExecutionStep, Outcome, PlanId, PlanSummary, QueryRequest, TransactionReceipt};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
	Intent(IntentEvent),
	Execution(ExecutionEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IntentEvent {
	Accepted { plan: PlanSummary },
	Rejected { intent: String, reason: String },
	Reported { request: QueryRequest },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
	StateChanged {
		plan_id: PlanId,
		from: ExecutionState,
		to: ExecutionState,
	},
	TransactionSubmitted {
		plan_id: PlanId,
		step: ExecutionStep,
		tx_hash: B256,
	},
	TransactionConfirmed {
		plan_id: PlanId,
		step: ExecutionStep,
		receipt: TransactionReceipt,
	},
	BalancesRefreshed {
		plan_id: PlanId,
		attempt: u8,
		balances: Vec<TokenBalance>,
	},
	Finished {
		plan_id: PlanId,
		outcome: Outcome,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
	pub token: Address,
	pub symbol: String,
	pub balance: U256,
	/// `None` for the native asset.
	pub allowance: Option<U256>,
}

pub struct EventBus {
	sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
		self.sender.subscribe()
	}

	pub fn publish(
		&self,
		event: EngineEvent,
	) -> Result<(), broadcast::error::SendError<EngineEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}
