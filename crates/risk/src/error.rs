//! Oracle error types

use thiserror::Error;

/// Errors raised while talking to a risk oracle.
///
/// None of these escape the scoring client; each one maps to a safe default.
#[derive(Debug, Error)]
pub enum OracleError {
    /// No oracle endpoint configured
    #[error("Risk oracle is not configured")]
    NotConfigured,

    /// Transport-level failure
    #[error("Oracle connection failed: {source}")]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Non-success HTTP status
    #[error("Oracle returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Oracle rate limited the request")]
    RateLimited,

    /// Response envelope could not be decoded
    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error("Oracle returned an empty response")]
    EmptyResponse,
}

pub type OracleResult<T> = Result<T, OracleError>;
