//! OpenAI-compatible chat-completions parser.
//!
//! Works against any endpoint that speaks the `/chat/completions` protocol,
//! hosted or self-hosted. Replies that are not the expected JSON object come
//! back as an error-typed [`ParsedIntent`] rather than as a failure.

use crate::{IntentParser, ParsedIntent, ParserError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

const SYSTEM_PROMPT: &str = r#"You are a natural language processor for a Uniswap V2 style AMM.
Convert user commands into structured data for blockchain transactions.
Available commands:
- swap: "swap X TOKEN1 for TOKEN2"
- deposit: "deposit X TOKEN1 and Y TOKEN2"
- query: "what are the reserves of the TOKEN1-TOKEN2 pool", "how many swaps happened today in the TOKEN1-TOKEN2 pool", "show the price distribution of the TOKEN1-TOKEN2 pool"

Parameters:
- swap: amount, fromToken, toToken, optional slippage (percent)
- deposit: token1Amount, token1Symbol, token2Amount, token2Symbol, optional slippage (percent)
- query: intent ("getReserves" | "swapCount" | "priceDistribution"), token1Symbol and token2Symbol or poolAddress, timeframe ("today" or {"from": unix seconds, "to": unix seconds})

Respond with a JSON object only:
{
  "type": "swap" | "deposit" | "query" | "error",
  "action": "function name",
  "params": { ... },
  "confidence": number between 0 and 1,
  "explanation": "brief explanation of the parsed command"
}"#;

#[derive(Serialize)]
struct ChatRequest<'a> {
	model: &'a str,
	messages: [ChatMessage<'a>; 2],
	temperature: f32,
	max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
	role: &'a str,
	content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
	choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
	message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
	content: Option<String>,
}

/// Parser backed by a chat-completions endpoint.
pub struct OpenAiParser {
	client: reqwest::Client,
	endpoint: String,
	api_key: Option<String>,
	model: String,
	max_tokens: u32,
}

impl OpenAiParser {
	pub fn new(
		endpoint: impl Into<String>,
		api_key: Option<String>,
		model: impl Into<String>,
		timeout: Duration,
	) -> Result<Self, ParserError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ParserError::Config(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			client,
			endpoint: endpoint.into(),
			api_key,
			model: model.into(),
			max_tokens: 500,
		})
	}

	fn url(&self) -> String {
		format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
	}
}

#[async_trait]
impl IntentParser for OpenAiParser {
	async fn parse(&self, text: &str) -> Result<ParsedIntent, ParserError> {
		let body = ChatRequest {
			model: &self.model,
			messages: [
				ChatMessage {
					role: "system",
					content: SYSTEM_PROMPT,
				},
				ChatMessage {
					role: "user",
					content: text,
				},
			],
			temperature: 0.1,
			max_tokens: self.max_tokens,
		};

		let mut request = self.client.post(self.url()).json(&body);
		if let Some(key) = &self.api_key {
			request = request.bearer_auth(key);
		}

		let response = request
			.send()
			.await
			.map_err(|e| ParserError::Http(e.to_string()))?;
		let status = response.status();
		if !status.is_success() {
			return Err(ParserError::Http(format!("endpoint returned {}", status)));
		}

		let reply: ChatResponse = response
			.json()
			.await
			.map_err(|e| ParserError::Response(e.to_string()))?;
		let content = reply
			.choices
			.into_iter()
			.next()
			.and_then(|choice| choice.message.content)
			.ok_or_else(|| ParserError::Response("No response content".to_string()))?;

		Ok(parse_reply(&content))
	}
}

/// Reads the JSON object out of a model reply, tolerating Markdown fences.
pub fn parse_reply(content: &str) -> ParsedIntent {
	let trimmed = content.trim();
	let body = trimmed
		.strip_prefix("```json")
		.or_else(|| trimmed.strip_prefix("```"))
		.and_then(|rest| rest.strip_suffix("```"))
		.unwrap_or(trimmed)
		.trim();

	match serde_json::from_str::<ParsedIntent>(body) {
		Ok(parsed) => parsed,
		Err(e) => {
			tracing::warn!(error = %e, "Failed to parse model reply");
			ParsedIntent::error("Failed to parse command")
		}
	}
}

/// Factory function to create an OpenAI-compatible parser from configuration.
///
/// Configuration parameters:
/// - `endpoint`: base URL (default `https://api.openai.com/v1`)
/// - `api_key`: bearer token, optional for self-hosted endpoints
/// - `model`: model name (default `gpt-4o`)
/// - `timeout_ms`: request timeout (default 30000)
pub fn create_openai_parser(config: &toml::Value) -> Result<Box<dyn IntentParser>, ParserError> {
	let endpoint = config
		.get("endpoint")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_ENDPOINT);
	if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
		return Err(ParserError::Config(format!(
			"endpoint must be an http(s) URL, got '{}'",
			endpoint
		)));
	}

	let api_key = config
		.get("api_key")
		.and_then(|v| v.as_str())
		.filter(|k| !k.trim().is_empty())
		.map(str::to_string);
	let model = config
		.get("model")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_MODEL);
	let timeout = Duration::from_millis(
		config
			.get("timeout_ms")
			.and_then(|v| v.as_integer())
			.unwrap_or(30_000)
			.max(1) as u64,
	);

	Ok(Box::new(OpenAiParser::new(endpoint, api_key, model, timeout)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_reply_plain_and_fenced() {
		let plain = r#"{"type":"swap","action":"swap","params":{"amount":1},"confidence":0.9}"#;
		assert_eq!(parse_reply(plain).kind, "swap");

		let fenced = format!("```json\n{}\n```", plain);
		let parsed = parse_reply(&fenced);
		assert_eq!(parsed.kind, "swap");
		assert_eq!(parsed.confidence, 0.9);
	}

	#[test]
	fn test_unparseable_reply_becomes_error_intent() {
		let parsed = parse_reply("Sure! You want to swap some tokens.");
		assert_eq!(parsed.kind, "error");
		assert_eq!(parsed.confidence, 0.0);
		assert_eq!(parsed.explanation.as_deref(), Some("Failed to parse command"));
	}

	#[test]
	fn test_factory_defaults_and_validation() {
		let config: toml::Value = toml::from_str("model = \"llama3\"").unwrap();
		assert!(create_openai_parser(&config).is_ok());

		let config: toml::Value = toml::from_str("endpoint = \"localhost:11434\"").unwrap();
		assert!(matches!(
			create_openai_parser(&config),
			Err(ParserError::Config(_))
		));
	}

	#[test]
	fn test_url_joins_without_double_slash() {
		let parser =
			OpenAiParser::new("http://localhost:8000/v1/", None, "m", Duration::from_secs(1))
				.unwrap();
		assert_eq!(parser.url(), "http://localhost:8000/v1/chat/completions");
	}
}
