//! Configuration for the AMM intent engine.
//!
//! Configuration is a TOML file. `${VAR}` references are substituted from the
//! environment before parsing, a few `AMM_INTENT_*` variables override file
//! values afterwards, and the result is validated before anything is built
//! from it.

use std::collections::HashSet;
use std::env;
use std::path::Path;
use thiserror::Error;

mod types;

pub use types::*;

const DEFAULT_ENV_PREFIX: &str = "AMM_INTENT_";

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: DEFAULT_ENV_PREFIX.to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		self.load_with(|name| env::var(name).ok()).await
	}

	/// Like [`ConfigLoader::load`], reading variables through `lookup`.
	pub async fn load_with(
		&self,
		lookup: impl Fn(&str) -> Option<String>,
	) -> Result<Config, ConfigError> {
		let Some(file_path) = &self.file_path else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		let content = match tokio::fs::read_to_string(file_path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::FileNotFound(file_path.clone()))
			}
			Err(e) => return Err(e.into()),
		};

		let mut config = self.parse_with(&content, &lookup)?;
		self.apply_env_overrides(&mut config, &lookup);
		validate_config(&config)?;

		tracing::debug!(file = %file_path, "Loaded configuration");
		Ok(config)
	}

	fn parse_with(
		&self,
		content: &str,
		lookup: &impl Fn(&str) -> Option<String>,
	) -> Result<Config, ConfigError> {
		let substituted = substitute_env_vars(content, lookup)?;
		toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn apply_env_overrides(&self, config: &mut Config, lookup: &impl Fn(&str) -> Option<String>) {
		let var = |name: &str| lookup(&format!("{}{}", self.env_prefix, name));

		if let Some(log_level) = var("LOG_LEVEL") {
			config.engine.log_level = log_level;
		}

		for (name, key) in [("RPC_URL", "rpc_url"), ("PRIVATE_KEY", "private_key")] {
			if let Some(value) = var(name) {
				tracing::debug!("Overriding chain {} from environment", key);
				if !config.chain.config.is_table() {
					config.chain.config = empty_table();
				}
				if let Some(table) = config.chain.config.as_table_mut() {
					table.insert(key.to_string(), toml::Value::String(value));
				}
			}
		}
	}
}

/// Replaces `${VAR_NAME}` references with values from `lookup`.
fn substitute_env_vars(
	content: &str,
	lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
	let re = regex::Regex::new(r"\$\{([^}]+)\}")
		.map_err(|e| ConfigError::ParseError(e.to_string()))?;

	let mut result = content.to_string();
	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];
		let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVarNotFound(var_name.to_string()))?;
		result = result.replace(full_match, &value);
	}
	Ok(result)
}

fn invalid(message: impl Into<String>) -> ConfigError {
	ConfigError::ValidationError(message.into())
}

/// Checks a parsed configuration for values the engine cannot work with.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let engine = &config.engine;
	if engine.default_slippage_bps > 10_000 {
		return Err(invalid("engine.default_slippage_bps must be at most 10000"));
	}
	if engine.fee_bps >= 10_000 {
		return Err(invalid("engine.fee_bps must be below 10000"));
	}
	if engine.max_price_impact_bps > 10_000 {
		return Err(invalid("engine.max_price_impact_bps must be at most 10000"));
	}
	if engine.approval_multiplier == 0 {
		return Err(invalid("engine.approval_multiplier must be at least 1"));
	}
	if engine.deadline_seconds == 0 {
		return Err(invalid("engine.deadline_seconds must be positive"));
	}
	engine.gas_reserve_wei().map_err(invalid)?;

	let chain = &config.chain;
	if chain.confirmations == 0 {
		return Err(invalid("chain.confirmations must be at least 1"));
	}
	if chain.confirmation_timeout_seconds == Some(0) {
		return Err(invalid("chain.confirmation_timeout_seconds must be positive"));
	}
	match chain.rpc_url() {
		Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
		Some(url) => {
			return Err(invalid(format!(
				"chain.config.rpc_url must be an http(s) URL, got '{}'",
				url
			)))
		}
		None if chain.provider == "alloy" => {
			return Err(invalid("chain.config.rpc_url is required"));
		}
		None => {}
	}

	let contracts = &config.contracts;
	let addresses = [
		("router", contracts.router),
		("factory", contracts.factory),
		("wrapped_native", contracts.wrapped_native),
	];
	for (name, address) in addresses {
		if address.is_zero() {
			return Err(invalid(format!("contracts.{} must not be the zero address", name)));
		}
	}
	if contracts.router == contracts.factory
		|| contracts.router == contracts.wrapped_native
		|| contracts.factory == contracts.wrapped_native
	{
		return Err(invalid("contracts.router, factory and wrapped_native must differ"));
	}

	let mut symbols = HashSet::new();
	for token in &config.tokens {
		let symbol = token.symbol.trim().to_lowercase();
		if symbol.is_empty() {
			return Err(invalid(format!("token {} has an empty symbol", token.address)));
		}
		if symbol == "eth" || symbol == "weth" || token.address == contracts.wrapped_native {
			return Err(invalid(format!(
				"token {} overrides the native or wrapped token",
				token.symbol
			)));
		}
		if token.address.is_zero() {
			return Err(invalid(format!("token {} has the zero address", token.symbol)));
		}
		if !symbols.insert(symbol) {
			return Err(invalid(format!("token {} is listed twice", token.symbol)));
		}
	}

	if let Some(parser) = &config.parser {
		if !(0.0..=1.0).contains(&parser.confidence_threshold) {
			return Err(invalid("parser.confidence_threshold must be within [0, 1]"));
		}
	}

	if !matches!(config.journal.backend.as_str(), "memory" | "file") {
		return Err(invalid(format!(
			"journal.backend must be 'memory' or 'file', got '{}'",
			config.journal.backend
		)));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::io::Write;

	const MINIMAL: &str = r#"
[chain]
confirmations = 2

[chain.config]
rpc_url = "${TEST_RPC_URL}"
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[contracts]
router = "0x5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e"
factory = "0xfafafafafafafafafafafafafafafafafafafafa"
"#;

	fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |name| map.get(name).cloned()
	}

	fn write_config(content: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		file
	}

	#[tokio::test]
	async fn test_load_substitutes_and_defaults() {
		let file = write_config(MINIMAL);
		let config = ConfigLoader::new()
			.with_file(file.path())
			.load_with(vars(&[("TEST_RPC_URL", "http://localhost:8545")]))
			.await
			.unwrap();

		assert_eq!(config.chain.rpc_url(), Some("http://localhost:8545"));
		assert_eq!(config.chain.confirmations, 2);
		assert_eq!(config.engine.default_slippage_bps, 50);
		assert_eq!(config.engine.approval_multiplier, 10);
		assert_eq!(
			config.engine.gas_reserve_wei().unwrap(),
			alloy::primitives::U256::from(10_000_000_000_000_000u64)
		);
		assert_eq!(config.journal.backend, "memory");
		assert!(config.parser.is_none());
	}

	#[tokio::test]
	async fn test_missing_variable_is_reported() {
		let file = write_config(MINIMAL);
		let result = ConfigLoader::new()
			.with_file(file.path())
			.load_with(vars(&[]))
			.await;
		assert!(matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "TEST_RPC_URL"));
	}

	#[tokio::test]
	async fn test_prefixed_overrides_win() {
		let file = write_config(MINIMAL);
		let config = ConfigLoader::new()
			.with_file(file.path())
			.load_with(vars(&[
				("TEST_RPC_URL", "http://localhost:8545"),
				("AMM_INTENT_RPC_URL", "https://rpc.example.org"),
				("AMM_INTENT_LOG_LEVEL", "debug"),
			]))
			.await
			.unwrap();
		assert_eq!(config.chain.rpc_url(), Some("https://rpc.example.org"));
		assert_eq!(config.engine.log_level, "debug");
	}

	#[tokio::test]
	async fn test_missing_file() {
		let result = ConfigLoader::new()
			.with_file("/definitely/not/here.toml")
			.load_with(vars(&[]))
			.await;
		assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
		assert!(matches!(
			ConfigLoader::new().load_with(vars(&[])).await,
			Err(ConfigError::FileNotFound(_))
		));
	}

	fn parse(extra: &str) -> Config {
		let content = format!(
			"{}\n{}",
			MINIMAL.replace("${TEST_RPC_URL}", "http://localhost:8545"),
			extra
		);
		toml::from_str(&content).unwrap()
	}

	#[test]
	fn test_validation_rules() {
		assert!(validate_config(&parse("")).is_ok());

		let mut config = parse("");
		config.chain.confirmations = 0;
		assert!(validate_config(&config).is_err());

		let mut config = parse("");
		config.engine.default_slippage_bps = 10_001;
		assert!(validate_config(&config).is_err());

		let mut config = parse("");
		config.contracts.factory = config.contracts.router;
		assert!(validate_config(&config).is_err());

		let mut config = parse("");
		config.engine.gas_reserve = "lots".into();
		assert!(validate_config(&config).is_err());

		let config = parse(
			r#"
[parser]
confidence_threshold = 1.5
"#,
		);
		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn test_token_table_validation() {
		let config = parse(
			r#"
[[tokens]]
symbol = "MEME"
address = "0x4242424242424242424242424242424242424242"
decimals = 9

[[tokens]]
symbol = "meme"
address = "0x4343434343434343434343434343434343434343"
decimals = 9
"#,
		);
		assert!(validate_config(&config).is_err());

		let config = parse(
			r#"
[[tokens]]
symbol = "WETH"
address = "0x4242424242424242424242424242424242424242"
decimals = 18
"#,
		);
		assert!(validate_config(&config).is_err());
	}
}
