//! Session manager — owns the single authenticated session to a hub.
//!
//! Every hub-bound exchange (keep-alive, list, command, re-login, logout) runs
//! inside one async mutex, so concurrent callers never interleave traffic on
//! the session. Each transport call is bounded by [`SessionOptions::timeout`].

use std::future::Future;
use std::time::Duration;

use domosync_domain::command::HubCommand;
use domosync_domain::error::{DomoError, TransportError};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::ports::{Credentials, HubTransport, SessionToken};

/// Tunables for a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Upper bound for any single transport call.
    pub timeout: Duration,
    /// Log in again once when the hub reports the session as expired.
    pub reauth_on_expiry: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            reauth_on_expiry: true,
        }
    }
}

#[derive(Debug)]
enum SessionState {
    Active(SessionToken),
    Expired,
    LoggedOut,
}

#[derive(Debug)]
struct Session {
    credentials: Credentials,
    state: SessionState,
}

/// Serialized access to one hub session.
pub struct SessionManager<T> {
    transport: T,
    options: SessionOptions,
    session: Mutex<Session>,
}

impl<T: HubTransport> SessionManager<T> {
    /// Log in and return a manager holding the new session.
    ///
    /// # Errors
    ///
    /// Returns [`DomoError::Auth`] when the hub refuses the credentials, and
    /// [`DomoError::Connect`] when it cannot be reached (including a login
    /// that times out). Nothing is retried.
    #[tracing::instrument(skip(transport, credentials, options), fields(host = transport.host()))]
    pub async fn connect(
        transport: T,
        credentials: Credentials,
        options: SessionOptions,
    ) -> Result<Self, DomoError> {
        let token = match bounded(options.timeout, transport.login(&credentials)).await {
            Ok(token) => token,
            Err(DomoError::Transport(err)) => return Err(DomoError::Connect(Box::new(err))),
            Err(err) => return Err(err),
        };
        tracing::info!(username = %credentials.username, "logged in to hub");

        Ok(Self {
            transport,
            options,
            session: Mutex::new(Session {
                credentials,
                state: SessionState::Active(token),
            }),
        })
    }

    /// Host of the underlying transport.
    pub fn host(&self) -> &str {
        self.transport.host()
    }

    /// Whether the session currently holds a valid token.
    pub async fn is_connected(&self) -> bool {
        matches!(self.session.lock().await.state, SessionState::Active(_))
    }

    /// Reset the hub's session inactivity timer.
    ///
    /// # Errors
    ///
    /// Returns [`DomoError::SessionExpired`] if the hub invalidated the
    /// session and it could not be re-established, or a transport error.
    pub async fn keep_alive(&self) -> Result<(), DomoError> {
        self.execute(&[]).await.map(|_| ())
    }

    /// Keep the session alive, then send one command.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn request(&self, command: &HubCommand) -> Result<Value, DomoError> {
        let mut payloads = self.execute(std::slice::from_ref(command)).await?;
        payloads.pop().ok_or_else(|| TransportError::NotConnected.into())
    }

    /// Keep the session alive, then send `commands` in order, all within one
    /// critical section so no other caller's traffic lands in between.
    ///
    /// A session expiry triggers one re-login and one replay of the whole
    /// exchange when [`SessionOptions::reauth_on_expiry`] is set.
    ///
    /// # Errors
    ///
    /// - [`DomoError::SessionExpired`] if the session is stale and recovery is
    ///   disabled or failed;
    /// - [`DomoError::Transport`] on I/O failure, timeout, or after logout;
    /// - [`DomoError::Protocol`] on a malformed answer.
    #[tracing::instrument(
        skip(self, commands),
        fields(host = self.transport.host(), count = commands.len())
    )]
    pub async fn execute(&self, commands: &[HubCommand]) -> Result<Vec<Value>, DomoError> {
        let mut session = self.session.lock().await;

        if matches!(session.state, SessionState::Expired) {
            return if self.options.reauth_on_expiry {
                self.relogin(&mut session).await?;
                self.exchange(&mut session, commands).await
            } else {
                Err(DomoError::SessionExpired)
            };
        }

        match self.exchange(&mut session, commands).await {
            Err(err) if err.is_session_expired() && self.options.reauth_on_expiry => {
                tracing::warn!("hub session expired, logging in again");
                self.relogin(&mut session).await?;
                self.exchange(&mut session, commands).await
            }
            other => other,
        }
    }

    /// Close the session. Later requests fail with
    /// [`TransportError::NotConnected`].
    ///
    /// # Errors
    ///
    /// Propagates the transport's logout failure; the session is considered
    /// closed locally either way.
    #[tracing::instrument(skip(self), fields(host = self.transport.host()))]
    pub async fn logout(&self) -> Result<(), DomoError> {
        let mut session = self.session.lock().await;
        let previous = std::mem::replace(&mut session.state, SessionState::LoggedOut);
        match previous {
            SessionState::Active(token) => {
                bounded(self.options.timeout, self.transport.logout(&token)).await?;
                tracing::info!("logged out from hub");
                Ok(())
            }
            SessionState::Expired | SessionState::LoggedOut => Ok(()),
        }
    }

    async fn exchange(
        &self,
        session: &mut Session,
        commands: &[HubCommand],
    ) -> Result<Vec<Value>, DomoError> {
        let token = match &session.state {
            SessionState::Active(token) => token.clone(),
            SessionState::Expired => return Err(DomoError::SessionExpired),
            SessionState::LoggedOut => return Err(TransportError::NotConnected.into()),
        };

        let result = self.exchange_with(&token, commands).await;
        if matches!(result, Err(DomoError::SessionExpired)) {
            session.state = SessionState::Expired;
        }
        result
    }

    async fn exchange_with(
        &self,
        token: &SessionToken,
        commands: &[HubCommand],
    ) -> Result<Vec<Value>, DomoError> {
        bounded(self.options.timeout, self.transport.keep_alive(token)).await?;

        let mut payloads = Vec::with_capacity(commands.len());
        for command in commands {
            tracing::debug!(%command, "sending hub command");
            let payload = bounded(self.options.timeout, self.transport.send(token, command)).await?;
            payloads.push(payload);
        }
        Ok(payloads)
    }

    async fn relogin(&self, session: &mut Session) -> Result<(), DomoError> {
        match bounded(self.options.timeout, self.transport.login(&session.credentials)).await {
            Ok(token) => {
                tracing::info!("re-established hub session");
                session.state = SessionState::Active(token);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "re-login failed");
                session.state = SessionState::Expired;
                Err(DomoError::SessionExpired)
            }
        }
    }
}

async fn bounded<O, F>(limit: Duration, fut: F) -> Result<O, DomoError>
where
    F: Future<Output = Result<O, DomoError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(limit).into()),
    }
}
