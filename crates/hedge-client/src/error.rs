//! Error types for the hedge fund client

use thiserror::Error;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request violates one of the `AnalysisRequest` invariants
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Request failed with status {status}: {body}")]
    Http {
        status: u16,
        body: String,
    },

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// REST envelope reported `success: false`
    #[error("API error: {0}")]
    Api(String),

    /// Operation was cancelled before it produced a result
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ClientError {
    /// Build an HTTP status error, falling back to the canonical reason when
    /// the server sent no body.
    pub fn http(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();
        let body = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("no response body").to_string()
        } else {
            body
        };
        Self::Http {
            status: status.as_u16(),
            body,
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::InvalidRequest("at least one ticker is required".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid request: at least one ticker is required"
        );

        let err = ClientError::Http {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed with status 500: boom");
    }

    #[test]
    fn test_http_error_uses_reason_for_empty_body() {
        let err = ClientError::http(reqwest::StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(err.to_string(), "Request failed with status 502: Bad Gateway");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ClientError = parse_err.into();
        assert!(matches!(err, ClientError::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
