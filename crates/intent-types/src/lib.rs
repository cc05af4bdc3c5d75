//! Shared types for the AMM intent engine.
//!
//! Every other crate in the workspace speaks in these types: resolved tokens
//! and pool snapshots, the untrusted trade intents that enter the engine, the
//! execution plans built from them, the per-plan execution state machine and
//! the terminal outcomes reported back to the caller.

pub mod abi;
pub mod errors;
pub mod events;
pub mod intent;
pub mod outcome;
pub mod plan;
pub mod pool;
pub mod state;
pub mod token;

pub use errors::*;
pub use events::*;
pub use intent::*;
pub use outcome::*;
pub use plan::*;
pub use pool::*;
pub use state::*;
pub use token::*;

/// Truncates a 32-byte hash for log output.
pub fn truncate_hash(hash: &alloy::primitives::B256) -> String {
	let hash_str = hex::encode(hash.0);
	if hash_str.len() <= 8 {
		hash_str
	} else {
		format!("{}..", &hash_str[..8])
	}
}
