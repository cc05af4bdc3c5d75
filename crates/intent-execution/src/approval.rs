//! Allowance checks.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};
use intent_chain::{ChainError, ChainService};
use intent_types::{abi, ApprovalRequirement, ContractCall, Token};
use std::sync::Arc;

/// Whether an allowance of `current_allowance` is too small for `amount`.
///
/// The native asset is never approved.
pub fn requires_approval(token: &Token, current_allowance: U256, amount: U256) -> bool {
	!token.is_native && current_allowance < amount
}

/// Decides whether a spender needs a larger allowance.
///
/// Every check reads the allowance fresh from chain.
#[derive(Clone)]
pub struct ApprovalGate {
	chain: Arc<ChainService>,
}

impl ApprovalGate {
	pub fn new(chain: Arc<ChainService>) -> Self {
		Self { chain }
	}

	pub async fn needs_approval(
		&self,
		owner: Address,
		spender: Address,
		token: &Token,
		amount: U256,
	) -> Result<bool, ChainError> {
		Ok(self
			.requirement(owner, spender, token, amount)
			.await?
			.is_some())
	}

	/// The requirement for `amount`, or `None` when the allowance already covers it.
	pub async fn requirement(
		&self,
		owner: Address,
		spender: Address,
		token: &Token,
		amount: U256,
	) -> Result<Option<ApprovalRequirement>, ChainError> {
		if token.is_native {
			return Ok(None);
		}

		let current_allowance = self.chain.allowance(token.address, owner, spender).await?;
		tracing::debug!(
			token = %token.symbol,
			%spender,
			%current_allowance,
			required = %amount,
			"Checked allowance"
		);

		Ok(
			requires_approval(token, current_allowance, amount).then(|| ApprovalRequirement {
				token: token.clone(),
				spender,
				current_allowance,
				required_amount: amount,
			}),
		)
	}

	/// The `approve` call for a requirement.
	///
	/// Requests `required_amount * multiplier` so repeated trades of similar
	/// size do not each need a fresh approval.
	pub fn approval_call(requirement: &ApprovalRequirement, multiplier: u32) -> ContractCall {
		let amount = requirement
			.required_amount
			.saturating_mul(U256::from(multiplier.max(1)));
		ContractCall::new(
			requirement.token.address,
			abi::erc20::APPROVE,
			vec![
				DynSolValue::Address(requirement.spender),
				DynSolValue::Uint(amount, 256),
			],
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use intent_chain::testing::ScriptedChain;

	const OWNER: Address = Address::repeat_byte(0x0a);
	const SPENDER: Address = Address::repeat_byte(0x5e);

	fn token() -> Token {
		Token::erc20(Address::repeat_byte(0x11), "TKN", 18)
	}

	#[test]
	fn test_requires_approval_rule() {
		let native = Token::native("ETH", 18);
		assert!(!requires_approval(&native, U256::ZERO, U256::MAX));
		assert!(requires_approval(&token(), U256::from(9u64), U256::from(10u64)));
		assert!(!requires_approval(&token(), U256::from(10u64), U256::from(10u64)));
	}

	#[tokio::test]
	async fn test_native_asset_never_reads_allowance() {
		let chain = ScriptedChain::new(OWNER);
		let gate = ApprovalGate::new(Arc::new(ChainService::new(Box::new(chain.clone()), 1)));

		let needed = gate
			.needs_approval(OWNER, SPENDER, &Token::native("ETH", 18), U256::from(1u64))
			.await
			.unwrap();
		assert!(!needed);
		assert!(chain.calls().is_empty());
	}

	#[tokio::test]
	async fn test_requirement_reflects_current_allowance() {
		let chain = ScriptedChain::new(OWNER);
		let gate = ApprovalGate::new(Arc::new(ChainService::new(Box::new(chain.clone()), 1)));
		let token = token();
		chain.set_allowance(token.address, OWNER, SPENDER, U256::from(5u64));

		let requirement = gate
			.requirement(OWNER, SPENDER, &token, U256::from(8u64))
			.await
			.unwrap()
			.unwrap();
		assert_eq!(requirement.current_allowance, U256::from(5u64));
		assert_eq!(requirement.required_amount, U256::from(8u64));

		chain.set_allowance(token.address, OWNER, SPENDER, U256::from(8u64));
		assert!(!gate
			.needs_approval(OWNER, SPENDER, &token, U256::from(8u64))
			.await
			.unwrap());
	}

	#[test]
	fn test_approval_call_requests_multiple() {
		let requirement = ApprovalRequirement {
			token: token(),
			spender: SPENDER,
			current_allowance: U256::ZERO,
			required_amount: U256::from(100u64),
		};
		let call = ApprovalGate::approval_call(&requirement, 10);
		assert_eq!(call.to, token().address);
		assert_eq!(call.args[1], DynSolValue::Uint(U256::from(1_000u64), 256));

		let saturated = ApprovalGate::approval_call(
			&ApprovalRequirement {
				required_amount: U256::MAX,
				..requirement
			},
			10,
		);
		assert_eq!(saturated.args[1], DynSolValue::Uint(U256::MAX, 256));
	}
}
