//! Error types for the port traits.
//!
//! [`RunServiceError`] covers every way a read or apply against the platform
//! can fail. Its `Display` output is embedded verbatim in failed verdict
//! messages, so variants carry the upstream body where one exists.
//!
//! [`ReportError`] covers failures delivering a verdict to the callback URL.
//! Those are logged and never retried.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Run service errors
// ---------------------------------------------------------------------------

/// Failure talking to the platform's run/workspace API.
///
/// None of these are retried by the client itself; retry policy belongs to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunServiceError {
    /// The run or workspace does not exist (or the token cannot see it).
    #[error("not found (404): {body}")]
    NotFound {
        /// Response body returned by the platform.
        body: String,
    },

    /// The API token was rejected (401 or 403).
    #[error("unauthorized ({status}): {body}")]
    Unauthorized {
        /// HTTP status code returned by the platform.
        status: u16,
        /// Response body returned by the platform.
        body: String,
    },

    /// Any other non-success status.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code returned by the platform.
        status: u16,
        /// Response body returned by the platform.
        body: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("transport error: {message}")]
    Transport {
        /// Description of the underlying transport failure.
        message: String,
    },

    /// A success response whose document did not have the expected shape.
    #[error("malformed response document: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },
}

impl RunServiceError {
    /// Maps a non-success HTTP status and body to the matching variant.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            404 => RunServiceError::NotFound { body },
            401 | 403 => RunServiceError::Unauthorized { status, body },
            _ => RunServiceError::UnexpectedStatus { status, body },
        }
    }
}

// ---------------------------------------------------------------------------
// Callback errors
// ---------------------------------------------------------------------------

/// Failure delivering a verdict to the task result callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// The platform answered with a non-success status.
    #[error("callback rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code returned by the platform.
        status: u16,
        /// Response body returned by the platform.
        body: String,
    },

    /// The callback request never produced a response.
    #[error("callback transport error: {message}")]
    Transport {
        /// Description of the underlying transport failure.
        message: String,
    },

    /// The task result body could not be serialised; nothing was sent.
    #[error("failed to encode task result: {message}")]
    Encode {
        /// Description of the serialisation failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            RunServiceError::from_status(404, "gone"),
            RunServiceError::NotFound { .. }
        ));
        assert!(matches!(
            RunServiceError::from_status(403, ""),
            RunServiceError::Unauthorized { status: 403, .. }
        ));
        assert!(matches!(
            RunServiceError::from_status(500, "boom"),
            RunServiceError::UnexpectedStatus { status: 500, .. }
        ));
    }

    #[test]
    fn report_errors_name_their_stage() {
        let encode = ReportError::Encode {
            message: "key must be a string".into(),
        };
        assert_eq!(
            encode.to_string(),
            "failed to encode task result: key must be a string"
        );
        assert!(ReportError::Transport {
            message: "connection reset".into()
        }
        .to_string()
        .starts_with("callback transport error"));
    }

    #[test]
    fn display_embeds_upstream_body() {
        let err = RunServiceError::from_status(404, r#"{"errors":[{"status":"404"}]}"#);
        assert_eq!(err.to_string(), r#"not found (404): {"errors":[{"status":"404"}]}"#);
    }
}
