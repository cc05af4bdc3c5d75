//! Pool snapshots.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Point-in-time view of a constant-product pool.
///
/// A pool value is never mutated locally. Reserves change on-chain; a fresh
/// read produces a fresh `Pool`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
	pub address: Address,
	pub token0: Address,
	pub token1: Address,
	pub reserve0: U256,
	pub reserve1: U256,
	pub last_update_timestamp: u32,
}

impl Pool {
	/// Returns `(reserve_in, reserve_out)` for a trade selling `token_in`.
	pub fn reserves_for(&self, token_in: Address) -> Option<(U256, U256)> {
		if token_in == self.token0 {
			Some((self.reserve0, self.reserve1))
		} else if token_in == self.token1 {
			Some((self.reserve1, self.reserve0))
		} else {
			None
		}
	}

	pub fn contains(&self, token: Address) -> bool {
		token == self.token0 || token == self.token1
	}

	pub fn snapshot(&self) -> ReserveSnapshot {
		ReserveSnapshot {
			pool: self.address,
			reserve0: self.reserve0,
			reserve1: self.reserve1,
			last_update_timestamp: self.last_update_timestamp,
		}
	}
}

/// The reserve state a plan was quoted against.
///
/// Two snapshots of the same pool compare equal only if nothing traded in
/// between, which is what staleness detection relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveSnapshot {
	pub pool: Address,
	pub reserve0: U256,
	pub reserve1: U256,
	pub last_update_timestamp: u32,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn pool() -> Pool {
		Pool {
			address: Address::repeat_byte(0xaa),
			token0: Address::repeat_byte(0x01),
			token1: Address::repeat_byte(0x02),
			reserve0: U256::from(1_000_000u64),
			reserve1: U256::from(2_000_000u64),
			last_update_timestamp: 42,
		}
	}

	#[test]
	fn test_reserves_follow_trade_direction() {
		let pool = pool();
		assert_eq!(
			pool.reserves_for(Address::repeat_byte(0x01)),
			Some((U256::from(1_000_000u64), U256::from(2_000_000u64)))
		);
		assert_eq!(
			pool.reserves_for(Address::repeat_byte(0x02)),
			Some((U256::from(2_000_000u64), U256::from(1_000_000u64)))
		);
		assert_eq!(pool.reserves_for(Address::repeat_byte(0x03)), None);
	}

	#[test]
	fn test_snapshot_detects_reserve_movement() {
		let before = pool().snapshot();
		let mut moved = pool();
		moved.reserve0 += U256::from(1u64);
		assert_eq!(before, pool().snapshot());
		assert_ne!(before, moved.snapshot());
	}
}
