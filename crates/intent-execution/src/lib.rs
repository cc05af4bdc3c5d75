//! Plan execution for the AMM intent engine.
//!
//! This module owns the approve-then-act sequence: the [`ApprovalGate`]
//! decides whether an allowance must be raised, and the
//! [`TransactionOrchestrator`] submits approvals and the action in order,
//! tracks each plan's [`intent_types::ExecutionState`] and reports exactly
//! one terminal [`intent_types::Outcome`].

pub mod approval;
pub mod orchestrator;
pub mod refresh;

pub use approval::{requires_approval, ApprovalGate};
pub use orchestrator::{OrchestratorConfig, TransactionOrchestrator};
pub use refresh::{BalanceRefresher, ChainBalanceRefresher};
