//! Error taxonomy shared across the workspace.
//!
//! Every failure a caller can observe is one of the [`DomoError`] variants.
//! Adapters define their own typed errors and convert into this enum at the
//! port boundary.

use std::time::Duration;

/// Boxed source error carried across the transport port.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classified hub failure.
#[derive(Debug, thiserror::Error)]
pub enum DomoError {
    /// The hub could not be reached while logging in.
    #[error("cannot connect to hub")]
    Connect(#[source] BoxError),

    /// The hub refused the credentials.
    #[error("hub rejected the credentials")]
    Auth,

    /// The hub no longer recognizes the session.
    #[error("hub session expired")]
    SessionExpired,

    /// I/O failure or timeout in the middle of an exchange.
    #[error("hub transport failure")]
    Transport(#[from] TransportError),

    /// The hub answered with something we cannot interpret.
    #[error("malformed hub response")]
    Protocol(#[from] ProtocolError),

    /// The caller asked for something invalid; nothing was sent.
    #[error("invalid request")]
    Validation(#[from] ValidationError),
}

impl DomoError {
    /// Whether a fresh login could recover from this error.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

/// Transport-level failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No answer within the configured bound.
    #[error("no response from hub within {0:?}")]
    Timeout(Duration),

    /// The session was closed locally (logout) and cannot carry requests.
    #[error("session is not connected")]
    NotConnected,

    /// The underlying client failed.
    #[error("hub I/O failure")]
    Io(#[source] BoxError),
}

/// Malformed or unexpected responses.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The body is not valid JSON.
    #[error("response body is not valid JSON")]
    InvalidJson(#[source] BoxError),

    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field is present with the wrong shape.
    #[error("field `{field}` is not {expected}")]
    UnexpectedType {
        /// Field name as sent by the hub.
        field: &'static str,
        /// Human description of the expected shape.
        expected: &'static str,
    },

    /// The hub acknowledged the request with a non-zero reason code.
    #[error("hub refused the request with reason {0}")]
    Rejected(i64),
}

/// Caller-side validation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Setpoint outside the range a thermo zone accepts.
    #[error("setpoint {0} is outside the supported range")]
    SetpointOutOfRange(f64),
}
