//! Per-plan execution state machine.

use serde::{Deserialize, Serialize};

/// Where a plan is in its approve-then-act sequence.
///
/// Approval indices are zero-based; `total` is the number of approvals the
/// plan carried when execution started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ExecutionState {
	Idle,
	AwaitingApproval { index: usize, total: usize },
	Approving { index: usize, total: usize },
	ActionPending,
	Confirmed,
	Failed,
	Cancelled,
}

impl ExecutionState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Confirmed | Self::Failed | Self::Cancelled)
	}

	/// Whether moving from `self` to `next` is a legal step.
	pub fn can_transition_to(&self, next: &ExecutionState) -> bool {
		use ExecutionState::*;

		if self.is_terminal() {
			return false;
		}

		match (*self, *next) {
			(Idle, AwaitingApproval { index: 0, total }) => total > 0,
			(Idle, ActionPending) => true,
			(AwaitingApproval { index, total }, Approving { index: i, total: t }) => {
				index == i && total == t
			}
			// Allowance turned out to be sufficient on re-check.
			(AwaitingApproval { index, total }, AwaitingApproval { index: i, total: t }) => {
				i == index + 1 && t == total && i < total
			}
			(AwaitingApproval { index, total }, ActionPending) => index + 1 == total,
			(Approving { index, total }, AwaitingApproval { index: i, total: t }) => {
				i == index + 1 && t == total && i < total
			}
			(Approving { index, total }, ActionPending) => index + 1 == total,
			(ActionPending, Confirmed) => true,
			(_, Failed) => true,
			(_, Cancelled) => true,
			_ => false,
		}
	}
}

impl std::fmt::Display for ExecutionState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Idle => write!(f, "Idle"),
			Self::AwaitingApproval { index, total } => {
				write!(f, "AwaitingApproval({} of {})", index + 1, total)
			}
			Self::Approving { index, total } => write!(f, "Approving({} of {})", index + 1, total),
			Self::ActionPending => write!(f, "ActionPending"),
			Self::Confirmed => write!(f, "Confirmed"),
			Self::Failed => write!(f, "Failed"),
			Self::Cancelled => write!(f, "Cancelled"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::ExecutionState::*;

	#[test]
	fn test_happy_path_with_two_approvals() {
		let path = [
			Idle,
			AwaitingApproval { index: 0, total: 2 },
			Approving { index: 0, total: 2 },
			AwaitingApproval { index: 1, total: 2 },
			Approving { index: 1, total: 2 },
			ActionPending,
			Confirmed,
		];
		for step in path.windows(2) {
			assert!(
				step[0].can_transition_to(&step[1]),
				"{} -> {} should be allowed",
				step[0],
				step[1]
			);
		}
	}

	#[test]
	fn test_action_cannot_skip_pending_approvals() {
		assert!(!AwaitingApproval { index: 0, total: 2 }.can_transition_to(&ActionPending));
		assert!(!Approving { index: 0, total: 2 }.can_transition_to(&ActionPending));
		assert!(!Idle.can_transition_to(&Confirmed));
		assert!(!Idle.can_transition_to(&AwaitingApproval { index: 1, total: 2 }));
	}

	#[test]
	fn test_terminal_states_are_final() {
		for terminal in [Confirmed, Failed, Cancelled] {
			assert!(terminal.is_terminal());
			assert!(!terminal.can_transition_to(&Idle));
			assert!(!terminal.can_transition_to(&Failed));
		}
	}

	#[test]
	fn test_cancel_and_fail_from_any_live_state() {
		for live in [Idle, Approving { index: 0, total: 1 }, ActionPending] {
			assert!(live.can_transition_to(&Cancelled));
			assert!(live.can_transition_to(&Failed));
		}
	}
}
