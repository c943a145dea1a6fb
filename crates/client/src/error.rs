use cabin_core::{CoreError, FormErrors};
use reqwest::StatusCode;

/// Outcome classes of a backend call.
///
/// Server-provided `message` strings are surfaced verbatim when present so
/// callers can show them; otherwise callers fall back to their own text.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection, DNS, TLS or body transfer failed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unauthorized{}", suffix(.message))]
    Unauthorized { message: Option<String> },

    #[error("forbidden{}", suffix(.message))]
    Forbidden { message: Option<String> },

    #[error("not found{}", suffix(.message))]
    NotFound { message: Option<String> },

    /// Any other 4xx, typically validation.
    #[error("request rejected ({status}){}", suffix(.message))]
    Rejected {
        status: u16,
        message: Option<String>,
        fields: FormErrors,
    },

    #[error("server error ({status}){}", suffix(.message))]
    Server {
        status: u16,
        message: Option<String>,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("could not encode request: {0}")]
    Encode(#[from] CoreError),
}

fn suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl ApiError {
    /// Classify a non-success response from its status and raw body.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let json: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();
        let message = json
            .get("message")
            .or_else(|| json.get("error"))
            .and_then(|m| m.as_str())
            .map(str::to_string);

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized { message },
            StatusCode::FORBIDDEN => ApiError::Forbidden { message },
            StatusCode::NOT_FOUND => ApiError::NotFound { message },
            s if s.is_server_error() => ApiError::Server {
                status: s.as_u16(),
                message,
            },
            s => ApiError::Rejected {
                status: s.as_u16(),
                message,
                fields: FormErrors::from_server_body(&json),
            },
        }
    }

    /// Message the server attached to the failure, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message }
            | ApiError::Forbidden { message }
            | ApiError::NotFound { message }
            | ApiError::Rejected { message, .. }
            | ApiError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Field errors the server reported, empty unless the request was
    /// rejected as invalid.
    pub fn fields(&self) -> FormErrors {
        match self {
            ApiError::Rejected { fields, .. } => fields.clone(),
            _ => FormErrors::new(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Connectivity problems and 5xx may succeed on retry; 4xx will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Server { .. })
    }
}
