//! The approve-then-act state machine.

use crate::{ApprovalGate, BalanceRefresher};
use alloy::primitives::B256;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use intent_chain::{ChainError, ChainService};
use intent_pool::resolver::read_snapshot;
use intent_types::{
	ContractCall, EngineEvent, ErrorKind, EventBus, ExecutionEvent,
	ExecutionPlan, ExecutionReceipt, ExecutionState, ExecutionStep, FailureCause, FailureReport,
	IntentError, Outcome, PlanId, Success, TransactionReceipt,
};
use std::sync::Arc;
use std::time::Duration;

/// Tunables for plan execution.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
	/// Approvals request `required_amount * approval_multiplier`.
	pub approval_multiplier: u32,
	/// Delay before the second post-confirmation balance refresh.
	pub refresh_delay: Duration,
}

impl Default for OrchestratorConfig {
	fn default() -> Self {
		Self {
			approval_multiplier: 10,
			refresh_delay: Duration::from_secs(1),
		}
	}
}

/// A failed chain step, and whether its transaction reached the node.
struct StepError {
	error: ChainError,
	broadcast: bool,
}

/// Removes a plan from the in-flight table when execution ends, however it ends.
struct InFlight {
	states: Arc<DashMap<PlanId, ExecutionState>>,
	plan_id: PlanId,
}

impl Drop for InFlight {
	fn drop(&mut self) {
		self.states.remove(&self.plan_id);
	}
}

/// Drives execution plans through approvals and the action.
///
/// Approvals run strictly in order and each one is confirmed before the next
/// is submitted; the action is submitted only once every approval has
/// confirmed. A plan id can be executing at most once at a time.
pub struct TransactionOrchestrator {
	chain: Arc<ChainService>,
	gate: ApprovalGate,
	refresher: Arc<dyn BalanceRefresher>,
	states: Arc<DashMap<PlanId, ExecutionState>>,
	event_bus: EventBus,
	config: OrchestratorConfig,
}

impl TransactionOrchestrator {
	pub fn new(
		chain: Arc<ChainService>,
		refresher: Arc<dyn BalanceRefresher>,
		event_bus: EventBus,
		config: OrchestratorConfig,
	) -> Self {
		Self {
			gate: ApprovalGate::new(chain.clone()),
			chain,
			refresher,
			states: Arc::new(DashMap::new()),
			event_bus,
			config,
		}
	}

	/// Current state of an executing plan, `None` once it has finished.
	pub fn state(&self, plan_id: &PlanId) -> Option<ExecutionState> {
		self.states.get(plan_id).map(|entry| *entry)
	}

	/// Number of plans currently executing.
	pub fn in_flight(&self) -> usize {
		self.states.len()
	}

	/// Executes a plan and reports exactly one outcome.
	pub async fn execute(&self, plan: &ExecutionPlan) -> Outcome {
		let Some(guard) = self.claim(plan.id) else {
			tracing::warn!(plan_id = %plan.id, "Plan is already executing");
			return Outcome::rejected(Some(plan.id), &IntentError::AlreadyInFlight(plan.id));
		};

		tracing::info!(
			plan_id = %plan.id,
			kind = ?plan.kind,
			approvals = plan.approvals.len(),
			"Executing plan"
		);

		let mut submitted = Vec::new();
		let outcome = self.drive(plan, &mut submitted).await;
		drop(guard);

		tracing::info!(plan_id = %plan.id, outcome = outcome.label(), "Plan finished");
		self.event_bus
			.publish(EngineEvent::Execution(ExecutionEvent::Finished {
				plan_id: plan.id,
				outcome: outcome.clone(),
			}))
			.ok();

		if outcome.is_success() {
			self.refresh_balances(plan).await;
		}
		outcome
	}

	fn claim(&self, plan_id: PlanId) -> Option<InFlight> {
		match self.states.entry(plan_id) {
			Entry::Occupied(_) => None,
			Entry::Vacant(vacant) => {
				vacant.insert(ExecutionState::Idle);
				Some(InFlight {
					states: self.states.clone(),
					plan_id,
				})
			}
		}
	}

	async fn drive(&self, plan: &ExecutionPlan, submitted: &mut Vec<B256>) -> Outcome {
		if let Some(outcome) = self.check_deadline(plan, ExecutionStep::Preflight, submitted) {
			return outcome;
		}
		if let Some(outcome) = self.check_fresh(plan, submitted).await {
			return outcome;
		}

		let total = plan.approvals.len();
		let mut approvals = Vec::with_capacity(total);

		for (index, requirement) in plan.approvals.iter().enumerate() {
			let step = ExecutionStep::Approval { index, total };
			self.transition(plan.id, ExecutionState::AwaitingApproval { index, total });

			// Someone may have approved since the plan was built.
			match self
				.gate
				.needs_approval(
					plan.owner,
					requirement.spender,
					&requirement.token,
					requirement.required_amount,
				)
				.await
			{
				Ok(false) => {
					tracing::info!(
						plan_id = %plan.id,
						token = %requirement.token.symbol,
						"Allowance already sufficient, skipping approval"
					);
					continue;
				}
				Ok(true) => {}
				Err(error) => {
					return self.fail(
						plan,
						step,
						ErrorKind::ApprovalFailed,
						StepError {
							error,
							broadcast: false,
						},
						submitted,
					);
				}
			}

			self.transition(plan.id, ExecutionState::Approving { index, total });
			let call = ApprovalGate::approval_call(requirement, self.config.approval_multiplier);
			match self.submit_and_confirm(plan.id, step, &call, submitted).await {
				Ok(receipt) => approvals.push(receipt),
				Err(err) => return self.fail(plan, step, ErrorKind::ApprovalFailed, err, submitted),
			}
		}

		if let Some(outcome) = self.check_deadline(plan, ExecutionStep::Action, submitted) {
			return outcome;
		}
		// Approvals take time; the pool may have moved while they confirmed.
		if !approvals.is_empty() {
			if let Some(outcome) = self.check_fresh(plan, submitted).await {
				return outcome;
			}
		}

		self.transition(plan.id, ExecutionState::ActionPending);
		match self
			.submit_and_confirm(plan.id, ExecutionStep::Action, &plan.action, submitted)
			.await
		{
			Ok(action) => {
				self.transition(plan.id, ExecutionState::Confirmed);
				Outcome::Success(Success::Executed(ExecutionReceipt {
					plan_id: plan.id,
					approvals,
					action,
				}))
			}
			Err(err) => self.fail(plan, ExecutionStep::Action, ErrorKind::ActionFailed, err, submitted),
		}
	}

	async fn submit_and_confirm(
		&self,
		plan_id: PlanId,
		step: ExecutionStep,
		call: &ContractCall,
		submitted: &mut Vec<B256>,
	) -> Result<TransactionReceipt, StepError> {
		let tx_hash = self.chain.submit(call).await.map_err(|error| StepError {
			error,
			broadcast: false,
		})?;
		submitted.push(tx_hash);
		self.event_bus
			.publish(EngineEvent::Execution(ExecutionEvent::TransactionSubmitted {
				plan_id,
				step,
				tx_hash,
			}))
			.ok();

		let receipt = self.chain.confirm(tx_hash).await.map_err(|error| StepError {
			error,
			broadcast: true,
		})?;
		self.event_bus
			.publish(EngineEvent::Execution(ExecutionEvent::TransactionConfirmed {
				plan_id,
				step,
				receipt: receipt.clone(),
			}))
			.ok();
		Ok(receipt)
	}

	fn check_deadline(
		&self,
		plan: &ExecutionPlan,
		step: ExecutionStep,
		submitted: &[B256],
	) -> Option<Outcome> {
		if !deadline_passed(plan.deadline) {
			return None;
		}
		tracing::warn!(plan_id = %plan.id, deadline = plan.deadline, "Plan deadline passed");
		self.transition(plan.id, ExecutionState::Failed);
		Some(Outcome::Failed(FailureReport {
			plan_id: plan.id,
			step,
			kind: ErrorKind::ActionFailed,
			cause: FailureCause::Expired,
			message: format!("deadline {} has passed", plan.deadline),
			ambiguous: false,
			transactions: submitted.to_vec(),
		}))
	}

	/// Compares the plan's reserve snapshot with the pool's current reserves.
	async fn check_fresh(&self, plan: &ExecutionPlan, submitted: &[B256]) -> Option<Outcome> {
		let snapshot = plan.snapshot?;
		match read_snapshot(&self.chain, snapshot.pool).await {
			Ok(current) if current == snapshot => None,
			Ok(current) => {
				tracing::warn!(
					plan_id = %plan.id,
					pool = %snapshot.pool,
					quoted_at = snapshot.last_update_timestamp,
					current = current.last_update_timestamp,
					"Pool reserves changed since the plan was quoted"
				);
				self.transition(plan.id, ExecutionState::Failed);
				Some(Outcome::rejected(Some(plan.id), &IntentError::StaleQuote))
			}
			Err(error) => Some(self.fail(
				plan,
				ExecutionStep::Preflight,
				ErrorKind::Chain,
				StepError {
					error,
					broadcast: false,
				},
				submitted,
			)),
		}
	}

	fn fail(
		&self,
		plan: &ExecutionPlan,
		step: ExecutionStep,
		kind: ErrorKind,
		err: StepError,
		submitted: &[B256],
	) -> Outcome {
		let (cause, ambiguous) = match &err.error {
			ChainError::UserRejected(_) => (FailureCause::UserRejected, false),
			ChainError::Reverted(_) if deadline_passed(plan.deadline) => (FailureCause::Expired, false),
			ChainError::Reverted(_) => (FailureCause::Reverted, false),
			ChainError::Timeout { .. } => (FailureCause::Timeout, true),
			_ => (FailureCause::Network, err.broadcast),
		};

		let mut report = FailureReport {
			plan_id: plan.id,
			step,
			kind,
			cause,
			message: err.error.to_string(),
			ambiguous,
			transactions: submitted.to_vec(),
		};

		if cause == FailureCause::UserRejected {
			report.kind = ErrorKind::UserCancelled;
			tracing::warn!(plan_id = %plan.id, %step, "Signature request rejected");
			self.transition(plan.id, ExecutionState::Cancelled);
			return Outcome::Cancelled(report);
		}

		tracing::error!(
			plan_id = %plan.id,
			%step,
			cause = ?cause,
			ambiguous,
			error = %report.message,
			"Plan execution failed"
		);
		self.transition(plan.id, ExecutionState::Failed);
		Outcome::Failed(report)
	}

	fn transition(&self, plan_id: PlanId, next: ExecutionState) {
		let Some(mut entry) = self.states.get_mut(&plan_id) else {
			return;
		};
		let from = *entry;
		if !from.can_transition_to(&next) {
			tracing::error!(%plan_id, %from, to = %next, "Refusing invalid state transition");
			return;
		}
		*entry = next;
		drop(entry);

		tracing::debug!(%plan_id, %from, to = %next, "Execution state changed");
		self.event_bus
			.publish(EngineEvent::Execution(ExecutionEvent::StateChanged {
				plan_id,
				from,
				to: next,
			}))
			.ok();
	}

	/// Refreshes balances right away and once more after `refresh_delay`,
	/// since some nodes serve pre-confirmation state for a short while.
	///
	/// Both attempts finish before `execute` returns, so a caller that exits
	/// right after the outcome still sees the second one.
	async fn refresh_balances(&self, plan: &ExecutionPlan) {
		let (owner, spender) = (plan.owner, plan.action.to);
		for attempt in 1..=2u8 {
			if attempt > 1 {
				tokio::time::sleep(self.config.refresh_delay).await;
			}
			refresh_once(
				&*self.refresher,
				&self.event_bus,
				plan.id,
				owner,
				spender,
				&plan.touched_tokens,
				attempt,
			)
			.await;
		}
	}
}

async fn refresh_once(
	refresher: &dyn BalanceRefresher,
	event_bus: &EventBus,
	plan_id: PlanId,
	owner: alloy::primitives::Address,
	spender: alloy::primitives::Address,
	tokens: &[intent_types::Token],
	attempt: u8,
) {
	match refresher.refresh(owner, spender, tokens).await {
		Ok(balances) => {
			event_bus
				.publish(EngineEvent::Execution(ExecutionEvent::BalancesRefreshed {
					plan_id,
					attempt,
					balances,
				}))
				.ok();
		}
		Err(e) => {
			tracing::warn!(%plan_id, attempt, error = %e, "Balance refresh failed");
		}
	}
}

fn deadline_passed(deadline: u64) -> bool {
	chrono::Utc::now().timestamp().max(0) as u64 >= deadline
}

impl std::fmt::Debug for TransactionOrchestrator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TransactionOrchestrator")
			.field("in_flight", &self.states.len())
			.field("config", &self.config)
			.finish()
	}
}
