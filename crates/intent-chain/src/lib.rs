//! Chain access for the AMM intent engine.
//!
//! This module defines the boundary between the engine and an EVM chain:
//! contract reads, contract writes and confirmation waits. ABI encoding and
//! signing stay behind the [`ChainInterface`] implementation; the engine only
//! deals in function signatures and dynamic values.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use intent_types::{abi, truncate_hash, ContractCall, IntentError, TransactionReceipt};
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Errors that can occur while talking to the chain.
#[derive(Debug, Error)]
pub enum ChainError {
	/// Error that occurs when the node cannot be reached or answers with an error.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when the wallet refuses to sign.
	#[error("Rejected by user: {0}")]
	UserRejected(String),
	/// Error that occurs when a transaction is mined but fails.
	#[error("Transaction reverted: {0}")]
	Reverted(String),
	/// Error that occurs when no receipt arrives within the configured window.
	#[error("No confirmation for {tx_hash} after {seconds}s")]
	Timeout { tx_hash: B256, seconds: u64 },
	/// Error that occurs when encoding arguments or decoding return data fails.
	#[error("ABI error: {0}")]
	Abi(String),
	/// Error that occurs when the client is misconfigured.
	#[error("Configuration error: {0}")]
	Config(String),
}

impl From<ChainError> for IntentError {
	fn from(err: ChainError) -> Self {
		match err {
			ChainError::UserRejected(message) => IntentError::UserCancelled(message),
			other => IntentError::Chain(other.to_string()),
		}
	}
}

/// Trait defining the low-level interface for chain clients.
#[async_trait]
pub trait ChainInterface: Send + Sync {
	/// Address transactions are sent from.
	fn account(&self) -> Address;

	/// Calls a view function and returns its decoded outputs.
	async fn read_contract(
		&self,
		address: Address,
		signature: &str,
		args: &[DynSolValue],
	) -> Result<Vec<DynSolValue>, ChainError>;

	/// Signs and submits a state-changing call, returning its hash.
	async fn write_contract(&self, call: &ContractCall) -> Result<B256, ChainError>;

	/// Waits until the transaction has the requested number of confirmations.
	///
	/// A mined but failed transaction is returned as a receipt with
	/// `success == false`, not as an error.
	async fn wait_for_confirmation(
		&self,
		tx_hash: B256,
		confirmations: u64,
	) -> Result<TransactionReceipt, ChainError>;

	/// Native asset balance of `owner`.
	async fn native_balance(&self, owner: Address) -> Result<U256, ChainError>;
}

/// High-level chain service used by the rest of the engine.
///
/// Wraps a [`ChainInterface`] with typed read helpers, the confirmation depth
/// and an optional client-side confirmation timeout.
pub struct ChainService {
	client: Box<dyn ChainInterface>,
	confirmations: u64,
	confirmation_timeout: Option<Duration>,
}

impl ChainService {
	pub fn new(client: Box<dyn ChainInterface>, confirmations: u64) -> Self {
		Self {
			client,
			confirmations: confirmations.max(1),
			confirmation_timeout: None,
		}
	}

	pub fn with_confirmation_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.confirmation_timeout = timeout;
		self
	}

	pub fn account(&self) -> Address {
		self.client.account()
	}

	pub async fn read(
		&self,
		address: Address,
		signature: &str,
		args: &[DynSolValue],
	) -> Result<Vec<DynSolValue>, ChainError> {
		tracing::debug!(
			contract = %address,
			function = abi::function_name(signature),
			"Reading contract"
		);
		self.client.read_contract(address, signature, args).await
	}

	pub async fn read_uint(
		&self,
		address: Address,
		signature: &str,
		args: &[DynSolValue],
	) -> Result<U256, ChainError> {
		let values = self.read(address, signature, args).await?;
		expect_uint(&values, 0)
	}

	pub async fn read_address(
		&self,
		address: Address,
		signature: &str,
		args: &[DynSolValue],
	) -> Result<Address, ChainError> {
		let values = self.read(address, signature, args).await?;
		expect_address(&values, 0)
	}

	pub async fn read_string(
		&self,
		address: Address,
		signature: &str,
		args: &[DynSolValue],
	) -> Result<String, ChainError> {
		let values = self.read(address, signature, args).await?;
		values
			.first()
			.and_then(|v| v.as_str())
			.map(str::to_string)
			.ok_or_else(|| ChainError::Abi("Expected a string return value".to_string()))
	}

	/// ERC-20 allowance granted by `owner` to `spender`.
	pub async fn allowance(
		&self,
		token: Address,
		owner: Address,
		spender: Address,
	) -> Result<U256, ChainError> {
		self.read_uint(
			token,
			abi::erc20::ALLOWANCE,
			&[DynSolValue::Address(owner), DynSolValue::Address(spender)],
		)
		.await
	}

	/// ERC-20 balance of `owner`.
	pub async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
		self.read_uint(token, abi::erc20::BALANCE_OF, &[DynSolValue::Address(owner)])
			.await
	}

	pub async fn native_balance(&self, owner: Address) -> Result<U256, ChainError> {
		self.client.native_balance(owner).await
	}

	/// Submits a call and returns its hash without waiting.
	pub async fn submit(&self, call: &ContractCall) -> Result<B256, ChainError> {
		let tx_hash = self.client.write_contract(call).await?;
		tracing::info!(
			tx_hash = %truncate_hash(&tx_hash),
			function = call.function_name(),
			"Submitted transaction"
		);
		Ok(tx_hash)
	}

	/// Waits for a submitted transaction.
	///
	/// A failed receipt becomes [`ChainError::Reverted`]; running out of time
	/// becomes [`ChainError::Timeout`], in which case the transaction may still
	/// be mined later.
	pub async fn confirm(&self, tx_hash: B256) -> Result<TransactionReceipt, ChainError> {
		let wait = self
			.client
			.wait_for_confirmation(tx_hash, self.confirmations);

		let receipt = match self.confirmation_timeout {
			Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
				ChainError::Timeout {
					tx_hash,
					seconds: limit.as_secs(),
				}
			})??,
			None => wait.await?,
		};

		if !receipt.success {
			return Err(ChainError::Reverted(format!(
				"transaction 0x{} reverted in block {}",
				hex::encode(tx_hash),
				receipt.block_number
			)));
		}

		tracing::info!(
			tx_hash = %truncate_hash(&tx_hash),
			block = receipt.block_number,
			"Transaction confirmed"
		);
		Ok(receipt)
	}
}

/// Returns the unsigned integer at `index` of a decoded return tuple.
pub fn expect_uint(values: &[DynSolValue], index: usize) -> Result<U256, ChainError> {
	values
		.get(index)
		.and_then(|v| v.as_uint())
		.map(|(value, _)| value)
		.ok_or_else(|| ChainError::Abi(format!("Expected uint return value at position {}", index)))
}

/// Returns the address at `index` of a decoded return tuple.
pub fn expect_address(values: &[DynSolValue], index: usize) -> Result<Address, ChainError> {
	values
		.get(index)
		.and_then(|v| v.as_address())
		.ok_or_else(|| {
			ChainError::Abi(format!(
				"Expected address return value at position {}",
				index
			))
		})
}

#[cfg(test)]
mod tests {
	use super::testing::{Fault, ScriptedChain};
	use super::*;

	#[test]
	fn test_expect_helpers() {
		let values = vec![
			DynSolValue::Uint(U256::from(7u64), 112),
			DynSolValue::Address(Address::repeat_byte(0x01)),
		];
		assert_eq!(expect_uint(&values, 0).unwrap(), U256::from(7u64));
		assert_eq!(
			expect_address(&values, 1).unwrap(),
			Address::repeat_byte(0x01)
		);
		assert!(expect_uint(&values, 1).is_err());
		assert!(expect_address(&values, 5).is_err());
	}

	#[tokio::test]
	async fn test_confirm_maps_failed_receipt_to_revert() {
		let chain = ScriptedChain::new(Address::repeat_byte(0x0a));
		let token = Address::repeat_byte(0x22);
		chain.fail_next_write("approve", Fault::Revert);
		let service = ChainService::new(Box::new(chain.clone()), 1);

		let call = ContractCall::new(
			token,
			abi::erc20::APPROVE,
			vec![
				DynSolValue::Address(Address::repeat_byte(0x33)),
				DynSolValue::Uint(U256::from(1u64), 256),
			],
		);
		let hash = service.submit(&call).await.unwrap();
		let result = service.confirm(hash).await;
		assert!(matches!(result, Err(ChainError::Reverted(_))));
	}

	#[tokio::test(start_paused = true)]
	async fn test_confirm_times_out_when_receipt_never_arrives() {
		let chain = ScriptedChain::new(Address::repeat_byte(0x0a));
		chain.fail_next_write("approve", Fault::Stall);
		let service = ChainService::new(Box::new(chain.clone()), 1)
			.with_confirmation_timeout(Some(Duration::from_secs(30)));

		let call = ContractCall::new(
			Address::repeat_byte(0x22),
			abi::erc20::APPROVE,
			vec![
				DynSolValue::Address(Address::repeat_byte(0x33)),
				DynSolValue::Uint(U256::from(1u64), 256),
			],
		);
		let hash = service.submit(&call).await.unwrap();
		match service.confirm(hash).await {
			Err(ChainError::Timeout { tx_hash, seconds }) => {
				assert_eq!(tx_hash, hash);
				assert_eq!(seconds, 30);
			}
			other => panic!("Expected timeout, got {:?}", other),
		}
	}
}
