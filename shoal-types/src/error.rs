//! The error type shared across the hub core.
//!
//! Every fallible operation in the core returns `HubResult<T>`. Errors carry a
//! dotted string code that is stable across the RPC and gossip boundaries, so
//! peers and clients can match on the kind without parsing the message text.

use std::fmt;

use thiserror::Error;

/// Result type alias using the hub's error type.
pub type HubResult<T> = Result<T, HubError>;

/// Stable error kinds, rendered as dotted strings on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The request failed validation: missing fid, unknown signer, bad type.
    BadRequestValidationFailure,
    /// Chain-inconsistent input (same position, different block/tx hash).
    BadRequestConflict,
    /// Malformed bytes.
    BadRequestParseFailure,
    /// Unknown enum value or otherwise out-of-range parameter.
    BadRequestInvalidParam,
    /// The requested record does not exist.
    NotFound,
    /// A transport or peer failure during sync.
    Unavailable,
    /// Invariant-violating internal error; fatal to the current operation.
    Unknown,
}

impl ErrorCode {
    /// The dotted wire representation of this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequestValidationFailure => "bad_request.validation_failure",
            Self::BadRequestConflict => "bad_request.conflict",
            Self::BadRequestParseFailure => "bad_request.parse_failure",
            Self::BadRequestInvalidParam => "bad_request.invalid_param",
            Self::NotFound => "not_found",
            Self::Unavailable => "unavailable",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned by a hub core operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct HubError {
    /// The stable error kind.
    pub code: ErrorCode,
    /// Human-readable context for logs and operators.
    pub message: String,
}

impl HubError {
    /// Creates an error with an explicit code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// `bad_request.validation_failure`
    pub fn validation_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequestValidationFailure, message)
    }

    /// `bad_request.conflict`
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequestConflict, message)
    }

    /// `bad_request.parse_failure`
    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequestParseFailure, message)
    }

    /// `bad_request.invalid_param`
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequestInvalidParam, message)
    }

    /// `not_found`
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// `unavailable`
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    /// `unknown`
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, message)
    }

    /// True for any of the `bad_request.*` kinds.
    #[must_use]
    pub const fn is_bad_request(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::BadRequestValidationFailure
                | ErrorCode::BadRequestConflict
                | ErrorCode::BadRequestParseFailure
                | ErrorCode::BadRequestInvalidParam
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_as_dotted_strings() {
        assert_eq!(
            ErrorCode::BadRequestValidationFailure.to_string(),
            "bad_request.validation_failure"
        );
        assert_eq!(ErrorCode::NotFound.to_string(), "not_found");
        assert_eq!(ErrorCode::Unavailable.to_string(), "unavailable");
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = HubError::not_found("no custody event for fid 42");
        assert_eq!(err.to_string(), "not_found: no custody event for fid 42");
    }

    #[test]
    fn bad_request_classification() {
        assert!(HubError::conflict("x").is_bad_request());
        assert!(HubError::invalid_param("x").is_bad_request());
        assert!(!HubError::unavailable("x").is_bad_request());
        assert!(!HubError::unknown("x").is_bad_request());
    }
}
