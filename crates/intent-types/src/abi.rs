//! Human-readable signatures of the contract functions the engine touches.

pub mod erc20 {
	pub const APPROVE: &str = "function approve(address spender, uint256 amount) returns (bool)";
	pub const ALLOWANCE: &str =
		"function allowance(address owner, address spender) view returns (uint256)";
	pub const BALANCE_OF: &str = "function balanceOf(address account) view returns (uint256)";
	pub const DECIMALS: &str = "function decimals() view returns (uint8)";
	pub const SYMBOL: &str = "function symbol() view returns (string)";
}

pub mod factory {
	pub const GET_PAIR: &str =
		"function getPair(address tokenA, address tokenB) view returns (address pair)";
	pub const CREATE_PAIR: &str =
		"function createPair(address tokenA, address tokenB) returns (address pair)";
}

pub mod pair {
	pub const TOKEN0: &str = "function token0() view returns (address)";
	pub const TOKEN1: &str = "function token1() view returns (address)";
	pub const GET_RESERVES: &str = "function getReserves() view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast)";
}

pub mod router {
	pub const SWAP_EXACT_ETH_FOR_TOKENS: &str = "function swapExactETHForTokens(uint256 amountOutMin, address[] path, address to, uint256 deadline) payable returns (uint256[] amounts)";
	pub const SWAP_EXACT_TOKENS_FOR_ETH: &str = "function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) returns (uint256[] amounts)";
	pub const SWAP_EXACT_TOKENS_FOR_TOKENS: &str = "function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] path, address to, uint256 deadline) returns (uint256[] amounts)";
	pub const ADD_LIQUIDITY: &str = "function addLiquidity(address tokenA, address tokenB, uint256 amountADesired, uint256 amountBDesired, uint256 amountAMin, uint256 amountBMin, address to, uint256 deadline) returns (uint256 amountA, uint256 amountB, uint256 liquidity)";
	pub const ADD_LIQUIDITY_ETH: &str = "function addLiquidityETH(address token, uint256 amountTokenDesired, uint256 amountTokenMin, uint256 amountETHMin, address to, uint256 deadline) payable returns (uint256 amountToken, uint256 amountETH, uint256 liquidity)";
}

/// Extracts the bare function name from a signature string.
pub fn function_name(signature: &str) -> &str {
	let trimmed = signature.trim();
	let trimmed = trimmed.strip_prefix("function ").unwrap_or(trimmed);
	trimmed.split('(').next().unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_function_name() {
		assert_eq!(function_name(erc20::APPROVE), "approve");
		assert_eq!(function_name(pair::GET_RESERVES), "getReserves");
		assert_eq!(function_name("balanceOf(address)"), "balanceOf");
	}
}
