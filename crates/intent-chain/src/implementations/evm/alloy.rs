//! Alloy-backed chain client.
//!
//! Encodes calls from their human-readable signatures, submits them through
//! an HTTP provider and polls for receipts. With a private key the provider
//! signs locally; without one, transactions go out through
//! `eth_sendTransaction` from the configured account and the node's wallet
//! does the signing.

use crate::{ChainError, ChainInterface};
use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::Function;
use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use async_trait::async_trait;
use intent_types::{truncate_hash, ContractCall, TransactionReceipt};
use std::time::Duration;

/// EIP-1193 code wallets return when the user declines a request.
const USER_REJECTED_CODE: i64 = 4001;

/// Alloy-based EVM chain client.
pub struct AlloyChainClient {
	/// The Alloy provider for blockchain interaction.
	provider: Box<dyn Provider<Ethereum>>,
	/// Sender of every transaction.
	account: Address,
	/// Interval between receipt polls.
	poll_interval: Duration,
}

impl AlloyChainClient {
	/// Creates a client that signs with a local key.
	pub fn with_signer(
		rpc_url: &str,
		signer: PrivateKeySigner,
		poll_interval: Duration,
	) -> Result<Self, ChainError> {
		let url = rpc_url
			.parse()
			.map_err(|e| ChainError::Config(format!("Invalid RPC URL: {}", e)))?;
		let account = signer.address();
		let wallet = EthereumWallet::from(signer);

		let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

		Ok(Self {
			provider: Box::new(provider),
			account,
			poll_interval,
		})
	}

	/// Creates a client that leaves signing to the node's wallet.
	pub fn with_remote_account(
		rpc_url: &str,
		account: Address,
		poll_interval: Duration,
	) -> Result<Self, ChainError> {
		let url = rpc_url
			.parse()
			.map_err(|e| ChainError::Config(format!("Invalid RPC URL: {}", e)))?;

		let provider = ProviderBuilder::new().connect_http(url);

		Ok(Self {
			provider: Box::new(provider),
			account,
			poll_interval,
		})
	}

	fn parse_function(signature: &str) -> Result<Function, ChainError> {
		Function::parse(signature)
			.map_err(|e| ChainError::Abi(format!("Invalid signature '{}': {}", signature, e)))
	}

	fn encode(signature: &str, args: &[DynSolValue]) -> Result<(Function, Vec<u8>), ChainError> {
		let function = Self::parse_function(signature)?;
		let input = function
			.abi_encode_input(args)
			.map_err(|e| ChainError::Abi(format!("Failed to encode {}: {}", function.name, e)))?;
		Ok((function, input))
	}
}

/// Maps a transport error onto the engine's chain errors.
fn map_transport_error(context: &str, err: TransportError) -> ChainError {
	if let Some(payload) = err.as_error_resp() {
		if payload.code == USER_REJECTED_CODE {
			return ChainError::UserRejected(payload.message.to_string());
		}
		if payload.message.contains("revert") {
			return ChainError::Reverted(payload.message.to_string());
		}
	}
	ChainError::Network(format!("{}: {}", context, err))
}

#[async_trait]
impl ChainInterface for AlloyChainClient {
	fn account(&self) -> Address {
		self.account
	}

	async fn read_contract(
		&self,
		address: Address,
		signature: &str,
		args: &[DynSolValue],
	) -> Result<Vec<DynSolValue>, ChainError> {
		let (function, input) = Self::encode(signature, args)?;
		let request = TransactionRequest::default()
			.with_to(address)
			.with_input(input);

		let output = self
			.provider
			.call(request)
			.await
			.map_err(|e| map_transport_error("eth_call failed", e))?;

		function
			.abi_decode_output(&output)
			.map_err(|e| ChainError::Abi(format!("Failed to decode {}: {}", function.name, e)))
	}

	async fn write_contract(&self, call: &ContractCall) -> Result<B256, ChainError> {
		let (_, input) = Self::encode(&call.signature, &call.args)?;
		let request = TransactionRequest::default()
			.with_from(self.account)
			.with_to(call.to)
			.with_input(input)
			.with_value(call.value);

		// The provider's wallet, or the node's, handles signing
		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| map_transport_error("Failed to send transaction", e))?;

		Ok(*pending.tx_hash())
	}

	async fn wait_for_confirmation(
		&self,
		tx_hash: B256,
		confirmations: u64,
	) -> Result<TransactionReceipt, ChainError> {
		tracing::debug!(
			tx_hash = %truncate_hash(&tx_hash),
			"Waiting for {} confirmations",
			confirmations
		);

		loop {
			let receipt = match self.provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					// Not yet mined
					tokio::time::sleep(self.poll_interval).await;
					continue;
				}
				Err(e) => return Err(map_transport_error("Failed to get receipt", e)),
			};

			let current_block = self
				.provider
				.get_block_number()
				.await
				.map_err(|e| map_transport_error("Failed to get block number", e))?;

			let tx_block = receipt.block_number.unwrap_or(0);
			// The inclusion block counts as the first confirmation
			let current_confirmations = current_block.saturating_sub(tx_block) + 1;

			if current_confirmations >= confirmations {
				return Ok(TransactionReceipt {
					hash: receipt.transaction_hash,
					block_number: tx_block,
					success: receipt.status(),
				});
			}

			tracing::debug!(
				"Waiting for {} more confirmations...",
				confirmations.saturating_sub(current_confirmations)
			);
			tokio::time::sleep(self.poll_interval).await;
		}
	}

	async fn native_balance(&self, owner: Address) -> Result<U256, ChainError> {
		self.provider
			.get_balance(owner)
			.await
			.map_err(|e| map_transport_error("Failed to get balance", e))
	}
}

/// Factory function to create an Alloy chain client from configuration.
///
/// Configuration parameters:
/// - `rpc_url`: HTTP(S) endpoint of the node
/// - `private_key`: hex key for local signing (optional)
/// - `account`: sender address when `private_key` is absent
/// - `poll_interval_ms`: receipt polling interval (default: 2000)
pub fn create_alloy_chain(config: &toml::Value) -> Result<Box<dyn ChainInterface>, ChainError> {
	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ChainError::Config("rpc_url is required".to_string()))?;

	let poll_interval = Duration::from_millis(
		config
			.get("poll_interval_ms")
			.and_then(|v| v.as_integer())
			.unwrap_or(2000)
			.max(1) as u64,
	);

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.filter(|k| !k.trim().is_empty());

	let client = match private_key {
		Some(key) => {
			let signer: PrivateKeySigner = key
				.parse()
				.map_err(|e| ChainError::Config(format!("Invalid private key: {}", e)))?;
			AlloyChainClient::with_signer(rpc_url, signer, poll_interval)?
		}
		None => {
			let account: Address = config
				.get("account")
				.and_then(|v| v.as_str())
				.ok_or_else(|| {
					ChainError::Config("Either private_key or account is required".to_string())
				})?
				.parse()
				.map_err(|e| ChainError::Config(format!("Invalid account address: {}", e)))?;
			AlloyChainClient::with_remote_account(rpc_url, account, poll_interval)?
		}
	};

	tracing::info!(account = %client.account, "Chain client ready");
	Ok(Box::new(client))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_factory_requires_rpc_url() {
		let config: toml::Value = toml::from_str("account = \"0x0000000000000000000000000000000000000001\"").unwrap();
		assert!(matches!(
			create_alloy_chain(&config),
			Err(ChainError::Config(_))
		));
	}

	#[test]
	fn test_factory_requires_key_or_account() {
		let config: toml::Value = toml::from_str("rpc_url = \"http://localhost:8545\"").unwrap();
		assert!(matches!(
			create_alloy_chain(&config),
			Err(ChainError::Config(_))
		));
	}

	#[test]
	fn test_factory_builds_remote_account_client() {
		let config: toml::Value = toml::from_str(
			"rpc_url = \"http://localhost:8545\"\naccount = \"0x00000000000000000000000000000000000000aa\"",
		)
		.unwrap();
		let client = create_alloy_chain(&config).unwrap();
		assert_eq!(client.account(), Address::with_last_byte(0xaa));
	}

	#[test]
	fn test_signatures_encode_against_their_arguments() {
		let (function, input) = AlloyChainClient::encode(
			intent_types::abi::erc20::APPROVE,
			&[
				DynSolValue::Address(Address::repeat_byte(0x11)),
				DynSolValue::Uint(U256::from(5u64), 256),
			],
		)
		.unwrap();
		assert_eq!(function.name, "approve");
		// selector + two words
		assert_eq!(input.len(), 4 + 64);
		assert_eq!(&input[..4], &[0x09, 0x5e, 0xa7, 0xb3]);
	}
}
