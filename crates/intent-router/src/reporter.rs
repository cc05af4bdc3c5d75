use async_trait::async_trait;
use intent_types::{IntentError, QueryRequest};

/// Consumer of resolved read-only queries.
///
/// Reporters only ever see the resolved pool and its tokens, never the raw
/// intent text.
#[async_trait]
pub trait QueryReporter: Send + Sync {
	async fn report(&self, request: &QueryRequest) -> Result<(), IntentError>;
}

/// Reporter that writes queries to the log.
#[derive(Debug, Default)]
pub struct TracingQueryReporter;

#[async_trait]
impl QueryReporter for TracingQueryReporter {
	async fn report(&self, request: &QueryRequest) -> Result<(), IntentError> {
		tracing::info!(
			kind = ?request.kind,
			pool = %request.pool,
			token0 = %request.token0.symbol,
			token1 = %request.token1.symbol,
			timeframe = ?request.timeframe,
			"Pool query"
		);
		Ok(())
	}
}
