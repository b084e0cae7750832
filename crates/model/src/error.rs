use thiserror::Error;

/// Errors surfaced by the model client contract (§6.1).
///
/// This is the boundary between the agent loop and whatever drives the
/// actual model calls; tool-local failures never produce one of these
/// (see the `ToolError` taxonomy in the `agent` crate instead).
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("authentication error: {0}")]
    AuthError(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("response format error: {message}. raw response: {raw_response}")]
    ResponseFormatError {
        message: String,
        raw_response: String,
    },

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("tool configuration error: {0}")]
    ToolConfigError(String),

    #[error("schema validation failed: {0}")]
    SchemaValidationFailure(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),
}

#[cfg(feature = "reqwest-client")]
impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        ModelError::HttpError(err.to_string())
    }
}

impl From<http::Error> for ModelError {
    fn from(err: http::Error) -> Self {
        ModelError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::JsonError(format!(
            "{} at line {} column {}",
            err,
            err.line(),
            err.column()
        ))
    }
}

impl From<url::ParseError> for ModelError {
    fn from(err: url::ParseError) -> Self {
        ModelError::InvalidRequest(format!("error parsing url: {}", err))
    }
}
