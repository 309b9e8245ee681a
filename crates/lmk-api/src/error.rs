//! Error taxonomy for backend calls.
//!
//! Every failure a call can produce is classified into one of three
//! variants; none of them is ever surfaced to an SDK caller as a panic.
//! The engine logs them (debug-gated) and resolves the operation as
//! "no payload."

use std::fmt;

use lmk_schemas::ApiErrorBody;

/// Error body value that triggers local fallback synthesis in the
/// universal-link flow (and only there).
pub const DOMAIN_NOT_FOUND: &str = "domain_not_found";

/// Errors an [`AttributionApi`](crate::AttributionApi) call may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Network or transport failure; no HTTP response was obtained.
    Transport(String),
    /// The backend answered with a non-2xx status.
    Http { status: u16, body: String },
    /// A 2xx response body could not be decoded.
    Decode(String),
}

impl ApiError {
    /// True iff this is a non-2xx response whose body is the
    /// `{"error":"domain_not_found"}` envelope.
    pub fn is_domain_not_found(&self) -> bool {
        match self {
            ApiError::Http { body, .. } => serde_json::from_str::<ApiErrorBody>(body)
                .map(|b| b.error == DOMAIN_NOT_FOUND)
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(msg) => write!(f, "transport error: {msg}"),
            ApiError::Http { status, body } => {
                write!(f, "http error status={status} body={body}")
            }
            ApiError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}
