//! Intent intake for the AMM intent engine.
//!
//! Turns untrusted input into something executable: natural-language text is
//! parsed into a [`TradeIntent`] through an [`IntentParser`] implementation,
//! and the [`IntentRouter`] validates an intent, resolves its tokens and pool,
//! quotes it and builds an [`intent_types::ExecutionPlan`]. Queries never
//! produce plans; they are resolved and handed to a [`QueryReporter`].

use async_trait::async_trait;
use intent_types::{IntentError, TradeIntent};
use thiserror::Error;

pub mod parsed;
pub mod reporter;
pub mod router;

/// Re-export implementations
pub mod implementations {
	pub mod openai;
}

pub use parsed::ParsedIntent;
pub use reporter::{QueryReporter, TracingQueryReporter};
pub use router::{IntentRouter, RouteOptions, Routed, RouterConfig};

/// Errors that can occur while talking to a parser backend.
#[derive(Debug, Error)]
pub enum ParserError {
	/// Error that occurs when the backend cannot be reached or refuses the request.
	#[error("HTTP error: {0}")]
	Http(String),
	/// Error that occurs when the backend answers with something unusable.
	#[error("Invalid response: {0}")]
	Response(String),
	/// Error that occurs when the parser is misconfigured.
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Trait defining the interface for natural-language parser backends.
#[async_trait]
pub trait IntentParser: Send + Sync {
	/// Interprets a free-text command.
	async fn parse(&self, text: &str) -> Result<ParsedIntent, ParserError>;
}

/// Service that applies the confidence threshold on top of a parser backend.
pub struct ParserService {
	parser: Box<dyn IntentParser>,
	confidence_threshold: f64,
}

impl ParserService {
	pub fn new(parser: Box<dyn IntentParser>, confidence_threshold: f64) -> Self {
		Self {
			parser,
			confidence_threshold,
		}
	}

	pub fn confidence_threshold(&self) -> f64 {
		self.confidence_threshold
	}

	/// Parses `text` into a trade intent.
	///
	/// Backend failures are reported like an unparseable command, as an
	/// [`IntentError::InvalidIntent`] carrying the reason.
	pub async fn interpret(&self, text: &str) -> Result<TradeIntent, IntentError> {
		if text.trim().is_empty() {
			return Err(IntentError::InvalidIntent("command is empty".to_string()));
		}

		let parsed = match self.parser.parse(text).await {
			Ok(parsed) => parsed,
			Err(e) => {
				tracing::warn!(error = %e, "Parser backend failed");
				ParsedIntent::error(format!("Failed to process command: {}", e))
			}
		};

		tracing::debug!(
			kind = %parsed.kind,
			action = %parsed.action,
			confidence = parsed.confidence,
			"Parsed command"
		);
		parsed.into_trade_intent(self.confidence_threshold)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	struct FixedParser(Result<serde_json::Value, String>);

	#[async_trait]
	impl IntentParser for FixedParser {
		async fn parse(&self, _text: &str) -> Result<ParsedIntent, ParserError> {
			match &self.0 {
				Ok(value) => serde_json::from_value(value.clone())
					.map_err(|e| ParserError::Response(e.to_string())),
				Err(e) => Err(ParserError::Http(e.clone())),
			}
		}
	}

	#[tokio::test]
	async fn test_threshold_is_applied() {
		let service = ParserService::new(
			Box::new(FixedParser(Ok(json!({
				"type": "swap",
				"params": { "amount": "1", "fromToken": "ETH", "toToken": "DAI" },
				"confidence": 0.2
			})))),
			0.5,
		);
		assert!(matches!(
			service.interpret("swap 1 ETH for DAI").await,
			Err(IntentError::InvalidIntent(_))
		));
	}

	#[tokio::test]
	async fn test_backend_failure_becomes_invalid_intent() {
		let service = ParserService::new(Box::new(FixedParser(Err("connection refused".into()))), 0.5);
		match service.interpret("swap 1 ETH for DAI").await {
			Err(IntentError::InvalidIntent(message)) => {
				assert!(message.contains("connection refused"))
			}
			other => panic!("Expected invalid intent, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_empty_command_is_rejected() {
		let service = ParserService::new(Box::new(FixedParser(Err("unused".into()))), 0.5);
		assert!(service.interpret("   ").await.is_err());
	}
}
