//! In-memory chain for tests.
//!
//! `ScriptedChain` answers the reads the engine performs against ERC-20
//! tokens, a pair factory and pairs, applies the effect of confirmed
//! approvals and pair creation, and records every read, submission and confirmation so tests
//! can assert on ordering. Individual writes can be scripted to be rejected
//! by the wallet, to revert, or to never confirm.

use crate::{ChainError, ChainInterface};
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{keccak256, Address, B256, U256};
use async_trait::async_trait;
use intent_types::{abi, ContractCall, TransactionReceipt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// How a scripted write misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
	/// The wallet refuses to sign (code 4001).
	Reject,
	/// The transaction is mined with a failed status.
	Revert,
	/// The transaction is never mined.
	Stall,
}

/// One observable interaction with the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
	Read {
		to: Address,
		function: String,
	},
	Submitted {
		to: Address,
		function: String,
		tx_hash: B256,
	},
	Confirmed {
		function: String,
		tx_hash: B256,
	},
}

#[derive(Debug, Clone)]
struct PairState {
	token0: Address,
	token1: Address,
	reserve0: U256,
	reserve1: U256,
	timestamp: u32,
}

#[derive(Debug, Clone)]
struct PendingTx {
	call: ContractCall,
	fault: Option<Fault>,
}

#[derive(Default)]
struct ChainState {
	native: HashMap<Address, U256>,
	balances: HashMap<(Address, Address), U256>,
	allowances: HashMap<(Address, Address, Address), U256>,
	metadata: HashMap<Address, (String, u8)>,
	factory_pairs: HashMap<(Address, Address, Address), Address>,
	pairs: HashMap<Address, PairState>,
	faults: HashMap<String, VecDeque<Fault>>,
	pending: HashMap<B256, PendingTx>,
	log: Vec<ChainCall>,
	block: u64,
	nonce: u64,
}

/// Scripted chain shared between a test and the engine under test.
#[derive(Clone)]
pub struct ScriptedChain {
	account: Address,
	state: Arc<Mutex<ChainState>>,
}

impl ScriptedChain {
	pub fn new(account: Address) -> Self {
		Self {
			account,
			state: Arc::new(Mutex::new(ChainState {
				block: 100,
				..Default::default()
			})),
		}
	}

	fn state(&self) -> MutexGuard<'_, ChainState> {
		self.state.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub fn set_native_balance(&self, owner: Address, amount: U256) {
		self.state().native.insert(owner, amount);
	}

	pub fn set_balance(&self, token: Address, owner: Address, amount: U256) {
		self.state().balances.insert((token, owner), amount);
	}

	pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
		self.state()
			.allowances
			.insert((token, owner, spender), amount);
	}

	pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
		self.state()
			.allowances
			.get(&(token, owner, spender))
			.copied()
			.unwrap_or_default()
	}

	/// Makes `symbol()` and `decimals()` answer for an address.
	pub fn set_token_metadata(&self, token: Address, symbol: &str, decimals: u8) {
		self.state()
			.metadata
			.insert(token, (symbol.to_string(), decimals));
	}

	/// Registers a pair under `getPair(token_a, token_b)` only, so lookups in
	/// the opposite order miss at the factory.
	pub fn add_pair(
		&self,
		factory: Address,
		pair: Address,
		token_a: Address,
		token_b: Address,
		reserve_a: U256,
		reserve_b: U256,
	) {
		let (token0, token1, reserve0, reserve1) = if token_a < token_b {
			(token_a, token_b, reserve_a, reserve_b)
		} else {
			(token_b, token_a, reserve_b, reserve_a)
		};
		let mut state = self.state();
		state
			.factory_pairs
			.insert((factory, token_a, token_b), pair);
		state.pairs.insert(
			pair,
			PairState {
				token0,
				token1,
				reserve0,
				reserve1,
				timestamp: 1,
			},
		);
	}

	/// Overwrites a pair's reserves, as a trade by someone else would.
	pub fn set_reserves(&self, pair: Address, reserve0: U256, reserve1: U256) {
		if let Some(state) = self.state().pairs.get_mut(&pair) {
			state.reserve0 = reserve0;
			state.reserve1 = reserve1;
			state.timestamp += 1;
		}
	}

	/// Scripts the next write of `function` to misbehave.
	pub fn fail_next_write(&self, function: &str, fault: Fault) {
		self.state()
			.faults
			.entry(function.to_string())
			.or_default()
			.push_back(fault);
	}

	/// Every interaction so far, in order.
	pub fn calls(&self) -> Vec<ChainCall> {
		self.state().log.clone()
	}

	/// Names of submitted functions, in order.
	pub fn submitted(&self) -> Vec<String> {
		self.state()
			.log
			.iter()
			.filter_map(|c| match c {
				ChainCall::Submitted { function, .. } => Some(function.clone()),
				_ => None,
			})
			.collect()
	}

	/// Position of the first log entry matching `predicate`.
	pub fn position(&self, predicate: impl Fn(&ChainCall) -> bool) -> Option<usize> {
		self.state().log.iter().position(predicate)
	}

	fn read(
		state: &ChainState,
		to: Address,
		function: &str,
		args: &[DynSolValue],
	) -> Result<Vec<DynSolValue>, ChainError> {
		let address_arg = |i: usize| -> Result<Address, ChainError> {
			args.get(i)
				.and_then(|v| v.as_address())
				.ok_or_else(|| ChainError::Abi(format!("{}: argument {} is not an address", function, i)))
		};
		let uint = |v: U256| DynSolValue::Uint(v, 256);

		match function {
			"balanceOf" => {
				let owner = address_arg(0)?;
				Ok(vec![uint(
					state.balances.get(&(to, owner)).copied().unwrap_or_default(),
				)])
			}
			"allowance" => {
				let owner = address_arg(0)?;
				let spender = address_arg(1)?;
				Ok(vec![uint(
					state
						.allowances
						.get(&(to, owner, spender))
						.copied()
						.unwrap_or_default(),
				)])
			}
			"decimals" => state
				.metadata
				.get(&to)
				.map(|(_, decimals)| vec![DynSolValue::Uint(U256::from(*decimals), 8)])
				.ok_or_else(|| ChainError::Network("execution reverted".to_string())),
			"symbol" => state
				.metadata
				.get(&to)
				.map(|(symbol, _)| vec![DynSolValue::String(symbol.clone())])
				.ok_or_else(|| ChainError::Network("execution reverted".to_string())),
			"getPair" => {
				let key = (to, address_arg(0)?, address_arg(1)?);
				let pair = state.factory_pairs.get(&key).copied().unwrap_or(Address::ZERO);
				Ok(vec![DynSolValue::Address(pair)])
			}
			"token0" | "token1" | "getReserves" => {
				let pair = state
					.pairs
					.get(&to)
					.ok_or_else(|| ChainError::Network("execution reverted".to_string()))?;
				Ok(match function {
					"token0" => vec![DynSolValue::Address(pair.token0)],
					"token1" => vec![DynSolValue::Address(pair.token1)],
					_ => vec![
						DynSolValue::Uint(pair.reserve0, 112),
						DynSolValue::Uint(pair.reserve1, 112),
						DynSolValue::Uint(U256::from(pair.timestamp), 32),
					],
				})
			}
			other => Err(ChainError::Abi(format!("Unscripted read: {}", other))),
		}
	}

	fn apply(state: &mut ChainState, account: Address, call: &ContractCall) {
		match call.function_name() {
			"approve" => {
				let spender = call.args.first().and_then(|v| v.as_address());
				let amount = call.args.get(1).and_then(|v| v.as_uint()).map(|(v, _)| v);
				if let (Some(spender), Some(amount)) = (spender, amount) {
					state.allowances.insert((call.to, account, spender), amount);
				}
			}
			"createPair" => {
				let token_a = call.args.first().and_then(|v| v.as_address());
				let token_b = call.args.get(1).and_then(|v| v.as_address());
				if let (Some(token_a), Some(token_b)) = (token_a, token_b) {
					let (token0, token1) = if token_a < token_b {
						(token_a, token_b)
					} else {
						(token_b, token_a)
					};
					let salt = keccak256([token0.as_slice(), token1.as_slice()].concat());
					let pair = Address::from_slice(&salt[12..]);
					state.factory_pairs.insert((call.to, token0, token1), pair);
					state.pairs.insert(
						pair,
						PairState {
							token0,
							token1,
							reserve0: U256::ZERO,
							reserve1: U256::ZERO,
							timestamp: 0,
						},
					);
				}
			}
			_ => {}
		}
	}
}

#[async_trait]
impl ChainInterface for ScriptedChain {
	fn account(&self) -> Address {
		self.account
	}

	async fn read_contract(
		&self,
		address: Address,
		signature: &str,
		args: &[DynSolValue],
	) -> Result<Vec<DynSolValue>, ChainError> {
		let function = abi::function_name(signature).to_string();
		let mut state = self.state();
		state.log.push(ChainCall::Read {
			to: address,
			function: function.clone(),
		});
		Self::read(&state, address, &function, args)
	}

	async fn write_contract(&self, call: &ContractCall) -> Result<B256, ChainError> {
		let function = call.function_name().to_string();
		let mut state = self.state();
		let fault = state.faults.get_mut(&function).and_then(|q| q.pop_front());

		if fault == Some(Fault::Reject) {
			return Err(ChainError::UserRejected(
				"User denied transaction signature".to_string(),
			));
		}

		state.nonce += 1;
		let tx_hash = B256::left_padding_from(&state.nonce.to_be_bytes());
		state.log.push(ChainCall::Submitted {
			to: call.to,
			function,
			tx_hash,
		});
		state.pending.insert(
			tx_hash,
			PendingTx {
				call: call.clone(),
				fault,
			},
		);
		Ok(tx_hash)
	}

	async fn wait_for_confirmation(
		&self,
		tx_hash: B256,
		_confirmations: u64,
	) -> Result<TransactionReceipt, ChainError> {
		let pending = self.state().pending.get(&tx_hash).cloned();
		let pending = pending
			.ok_or_else(|| ChainError::Network(format!("Unknown transaction {}", tx_hash)))?;

		if pending.fault == Some(Fault::Stall) {
			std::future::pending::<()>().await;
		}

		let mut state = self.state();
		state.pending.remove(&tx_hash);
		state.block += 1;
		let success = pending.fault != Some(Fault::Revert);
		if success {
			Self::apply(&mut state, self.account, &pending.call);
		}
		state.log.push(ChainCall::Confirmed {
			function: pending.call.function_name().to_string(),
			tx_hash,
		});

		Ok(TransactionReceipt {
			hash: tx_hash,
			block_number: state.block,
			success,
		})
	}

	async fn native_balance(&self, owner: Address) -> Result<U256, ChainError> {
		Ok(self.state().native.get(&owner).copied().unwrap_or_default())
	}
}
