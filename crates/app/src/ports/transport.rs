//! Hub transport port — the black-box RPC client the session manager drives.
//!
//! A transport knows how to frame requests for one hub and how to classify
//! its answers into [`DomoError`]. It holds no session state of its own: the
//! token returned by [`login`](HubTransport::login) is handed back on every
//! call, and the session manager decides when to log in again.

use std::fmt;
use std::future::Future;

use domosync_domain::command::HubCommand;
use domosync_domain::error::DomoError;

/// Opaque session identifier issued by the hub on login.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap the identifier returned by the hub.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Username and password, kept for re-authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Outbound port to a hub.
///
/// Implementations live in adapter crates (`adapter_http`, `adapter_virtual`).
/// Error classification contract:
///
/// - [`login`](Self::login): [`DomoError::Connect`] when the hub cannot be
///   reached, [`DomoError::Auth`] when credentials are refused;
/// - every other call: [`DomoError::SessionExpired`] when the hub no longer
///   knows the token, [`DomoError::Transport`] on I/O failure,
///   [`DomoError::Protocol`] on malformed answers.
pub trait HubTransport: Send + Sync {
    /// Host the transport talks to, for logs.
    fn host(&self) -> &str;

    /// Open a session.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<SessionToken, DomoError>> + Send;

    /// Reset the hub's inactivity timer for `token`.
    fn keep_alive(&self, token: &SessionToken)
    -> impl Future<Output = Result<(), DomoError>> + Send;

    /// Send one command and return the hub's application payload.
    ///
    /// For list commands the payload is the object carrying the `array` of
    /// items; for mutations it is the hub's acknowledgement.
    fn send(
        &self,
        token: &SessionToken,
        command: &HubCommand,
    ) -> impl Future<Output = Result<serde_json::Value, DomoError>> + Send;

    /// Close the session on the hub side.
    fn logout(&self, token: &SessionToken) -> impl Future<Output = Result<(), DomoError>> + Send;
}
