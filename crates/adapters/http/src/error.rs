//! HTTP adapter error types.

use std::time::Duration;

use domosync_domain::error::{DomoError, ProtocolError, TransportError};

/// Errors specific to the HTTP adapter.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The reqwest client could not be built.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// The hub could not be reached.
    #[error("failed to reach hub")]
    Unreachable(#[source] reqwest::Error),

    /// The hub did not answer within the client timeout.
    #[error("no answer from hub within {0:?}")]
    Timeout(Duration),

    /// The request failed after the connection was established.
    #[error("request to hub failed")]
    Request(#[source] reqwest::Error),

    /// The hub answered with a non-success HTTP status.
    #[error("hub answered with an error status")]
    Status(#[source] reqwest::Error),

    /// The answer body was not JSON.
    #[error("hub answered with an invalid body")]
    Body(#[source] reqwest::Error),
}

impl HttpError {
    /// Sort a reqwest failure by what went wrong.
    pub(crate) fn from_request(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Unreachable(err)
        } else {
            Self::Request(err)
        }
    }

    /// Classify a failed registration request. A hub that cannot be reached
    /// at login is a connect error rather than a transport one.
    pub(crate) fn into_login_error(self) -> DomoError {
        match self {
            Self::Unreachable(_) => DomoError::Connect(Box::new(self)),
            other => other.into(),
        }
    }
}

impl From<HttpError> for DomoError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Client(_) => DomoError::Connect(Box::new(err)),
            HttpError::Timeout(limit) => TransportError::Timeout(limit).into(),
            HttpError::Unreachable(_) | HttpError::Request(_) | HttpError::Status(_) => {
                TransportError::Io(Box::new(err)).into()
            }
            HttpError::Body(_) => ProtocolError::InvalidJson(Box::new(err)).into(),
        }
    }
}
