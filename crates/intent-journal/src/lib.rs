//! Outcome journal for the AMM intent engine.
//!
//! This module records the terminal outcome of every intent the engine
//! handles, keyed by plan id, so failures can be inspected after the fact.
//! Backends store raw bytes; the [`Journal`] service handles serialization.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intent_types::{ErrorKind, Outcome, PlanId, PlanSummary};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

const NAMESPACE: &str = "outcome";

/// Errors that can occur during journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
	/// Error that occurs when a requested entry is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the journal backend.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the low-level interface for journal backends.
#[async_trait]
pub trait JournalInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, JournalError>;

	/// Stores raw bytes under the given key, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), JournalError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), JournalError>;

	/// Checks if a key exists.
	async fn exists(&self, key: &str) -> Result<bool, JournalError>;
}

/// One journaled outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
	/// Plan id, or a generated id for intents that never became a plan.
	pub id: String,
	pub recorded_at: DateTime<Utc>,
	/// What the user asked for, when known.
	#[serde(default)]
	pub request: Option<String>,
	pub summary: Option<PlanSummary>,
	pub outcome: Outcome,
}

impl JournalEntry {
	/// A duplicate submission refused while its plan was running gets its own
	/// id, so it never replaces the running plan's entry.
	pub fn new(request: Option<String>, summary: Option<PlanSummary>, outcome: Outcome) -> Self {
		let duplicate = matches!(
			outcome,
			Outcome::Rejected {
				kind: ErrorKind::AlreadyInFlight,
				..
			}
		);
		let plan_id = if duplicate {
			None
		} else {
			outcome.plan_id().or(summary.as_ref().map(|s| s.id))
		};
		let id = plan_id
			.map(|id| id.to_string())
			.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
		Self {
			id,
			recorded_at: Utc::now(),
			request,
			summary,
			outcome,
		}
	}
}

/// High-level journal service.
///
/// Entries are keyed by plan id, so re-running a plan overwrites its previous
/// entry with the latest outcome.
pub struct Journal {
	backend: Box<dyn JournalInterface>,
}

impl Journal {
	pub fn new(backend: Box<dyn JournalInterface>) -> Self {
		Self { backend }
	}

	fn key(id: &str) -> String {
		format!("{}:{}", NAMESPACE, id)
	}

	/// Records an entry and returns the id it was stored under.
	pub async fn record(&self, entry: &JournalEntry) -> Result<String, JournalError> {
		let bytes =
			serde_json::to_vec(entry).map_err(|e| JournalError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(&entry.id), bytes).await?;
		tracing::debug!(id = %entry.id, outcome = entry.outcome.label(), "Journaled outcome");
		Ok(entry.id.clone())
	}

	pub async fn lookup(&self, id: &str) -> Result<JournalEntry, JournalError> {
		let bytes = self.backend.get_bytes(&Self::key(id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| JournalError::Serialization(e.to_string()))
	}

	pub async fn lookup_plan(&self, plan_id: &PlanId) -> Result<JournalEntry, JournalError> {
		self.lookup(&plan_id.to_string()).await
	}

	pub async fn contains(&self, id: &str) -> Result<bool, JournalError> {
		self.backend.exists(&Self::key(id)).await
	}

	pub async fn remove(&self, id: &str) -> Result<(), JournalError> {
		self.backend.delete(&Self::key(id)).await
	}
}
