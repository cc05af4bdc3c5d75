//! Configuration file layout.

use alloy::primitives::utils::parse_ether;
use alloy::primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub engine: EngineConfig,
	pub chain: ChainConfig,
	pub contracts: ContractsConfig,
	/// Extra ERC-20 tokens on top of the built-in list.
	#[serde(default)]
	pub tokens: Vec<TokenEntry>,
	/// Natural-language parser; only needed for free-text commands.
	#[serde(default)]
	pub parser: Option<ParserConfig>,
	#[serde(default)]
	pub journal: JournalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	pub name: String,
	pub log_level: String,
	pub default_slippage_bps: u32,
	pub fee_bps: u32,
	pub max_price_impact_bps: u32,
	pub approval_multiplier: u32,
	pub deadline_seconds: u64,
	/// Native amount kept back for gas, in ether, e.g. `"0.01"`.
	pub gas_reserve: String,
	pub refresh_delay_ms: u64,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			name: "amm-intent".to_string(),
			log_level: "info".to_string(),
			default_slippage_bps: 50,
			fee_bps: 30,
			max_price_impact_bps: 1_500,
			approval_multiplier: 10,
			deadline_seconds: 1_800,
			gas_reserve: "0.01".to_string(),
			refresh_delay_ms: 1_000,
		}
	}
}

impl EngineConfig {
	/// Gas reserve in wei.
	pub fn gas_reserve_wei(&self) -> Result<U256, String> {
		parse_ether(self.gas_reserve.trim())
			.map_err(|e| format!("Invalid gas_reserve '{}': {}", self.gas_reserve, e))
	}

	pub fn deadline_window(&self) -> Duration {
		Duration::from_secs(self.deadline_seconds)
	}

	pub fn refresh_delay(&self) -> Duration {
		Duration::from_millis(self.refresh_delay_ms)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
	/// Chain client implementation, e.g. `"alloy"`.
	#[serde(default = "default_chain_provider")]
	pub provider: String,
	#[serde(default = "default_confirmations")]
	pub confirmations: u64,
	/// Give up waiting for a receipt after this long. The transaction may
	/// still be mined afterwards.
	#[serde(default)]
	pub confirmation_timeout_seconds: Option<u64>,
	/// Provider-specific settings (`rpc_url`, `private_key`, ...).
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

impl ChainConfig {
	pub fn confirmation_timeout(&self) -> Option<Duration> {
		self.confirmation_timeout_seconds.map(Duration::from_secs)
	}

	pub fn rpc_url(&self) -> Option<&str> {
		self.config.get("rpc_url").and_then(|v| v.as_str())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
	pub router: Address,
	pub factory: Address,
	#[serde(default = "default_wrapped_native")]
	pub wrapped_native: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
	pub symbol: String,
	pub address: Address,
	pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
	#[serde(default = "default_parser_provider")]
	pub provider: String,
	#[serde(default = "default_confidence_threshold")]
	pub confidence_threshold: f64,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
	/// `"memory"` or `"file"`.
	#[serde(default = "default_journal_backend")]
	pub backend: String,
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

impl Default for JournalConfig {
	fn default() -> Self {
		Self {
			backend: default_journal_backend(),
			config: empty_table(),
		}
	}
}

fn default_chain_provider() -> String {
	"alloy".to_string()
}

fn default_confirmations() -> u64 {
	1
}

fn default_wrapped_native() -> Address {
	address!("764ac516ec320a310375e69f59180355c69e313f")
}

fn default_parser_provider() -> String {
	"openai".to_string()
}

fn default_confidence_threshold() -> f64 {
	0.5
}

fn default_journal_backend() -> String {
	"memory".to_string()
}

pub(crate) fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}
