//! Scripted in-memory hub used by the unit tests of this crate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use domosync_domain::category::Category;
use domosync_domain::command::HubCommand;
use domosync_domain::error::{BoxError, DomoError};
use serde_json::{Value, json};

use crate::ports::{Credentials, HubTransport, SessionToken};

/// One call received by the fake hub, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Login,
    KeepAlive,
    Send(HubCommand),
    Logout,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    lists: HashMap<Category, VecDeque<Value>>,
    features: Option<Value>,
    logins: usize,
    keep_alives: usize,
    expired_keep_alives: HashSet<usize>,
    expire_keep_alives_from: Option<usize>,
    reject_relogin: bool,
    unreachable: bool,
    hang_sends: bool,
}

/// Hub double answering list requests from scripted payloads.
///
/// Each category holds a queue of payloads: a fetch pops the front one
/// unless it is the last, which keeps being served.
#[derive(Clone, Default)]
pub struct FakeHub {
    state: Arc<Mutex<State>>,
}

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

pub fn credentials() -> Credentials {
    Credentials::new(USERNAME, PASSWORD)
}

impl FakeHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn push_list(&self, category: Category, items: Value) {
        self.lock()
            .lists
            .entry(category)
            .or_default()
            .push_back(json!({ "array": items }));
    }

    /// Drop any queued payloads and serve `items` from now on.
    pub fn replace_list(&self, category: Category, items: Value) {
        let mut state = self.lock();
        let queue = state.lists.entry(category).or_default();
        queue.clear();
        queue.push_back(json!({ "array": items }));
    }

    /// Drop any queued payloads and serve `payload` verbatim from now on.
    pub fn replace_raw_list(&self, category: Category, payload: Value) {
        let mut state = self.lock();
        let queue = state.lists.entry(category).or_default();
        queue.clear();
        queue.push_back(payload);
    }

    pub fn push_raw_list(&self, category: Category, payload: Value) {
        self.lock()
            .lists
            .entry(category)
            .or_default()
            .push_back(payload);
    }

    pub fn set_features(&self, payload: Value) {
        self.lock().features = Some(payload);
    }

    /// Make the keep-alive with the given 0-based index report an expired session.
    pub fn expire_keep_alive(&self, index: usize) {
        self.lock().expired_keep_alives.insert(index);
    }

    /// Make every keep-alive from the given 0-based index on report an expired session.
    pub fn expire_keep_alives_from(&self, index: usize) {
        self.lock().expire_keep_alives_from = Some(index);
    }

    pub fn reject_relogin(&self) {
        self.lock().reject_relogin = true;
    }

    pub fn set_unreachable(&self) {
        self.lock().unreachable = true;
    }

    pub fn hang_sends(&self) {
        self.lock().hang_sends = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn sends(&self) -> Vec<HubCommand> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub fn logins(&self) -> usize {
        self.lock().logins
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

impl HubTransport for FakeHub {
    fn host(&self) -> &str {
        "fake-hub"
    }

    async fn login(&self, credentials: &Credentials) -> Result<SessionToken, DomoError> {
        let mut state = self.lock();
        state.calls.push(Call::Login);
        if state.unreachable {
            let source: BoxError = "connection refused".into();
            return Err(DomoError::Connect(source));
        }
        if credentials.username != USERNAME || credentials.password() != PASSWORD {
            return Err(DomoError::Auth);
        }
        if state.reject_relogin && state.logins > 0 {
            return Err(DomoError::Auth);
        }
        state.logins += 1;
        Ok(SessionToken::new(format!("token-{}", state.logins)))
    }

    async fn keep_alive(&self, _token: &SessionToken) -> Result<(), DomoError> {
        let expired = {
            let mut state = self.lock();
            state.calls.push(Call::KeepAlive);
            let index = state.keep_alives;
            state.keep_alives += 1;
            state.expired_keep_alives.contains(&index)
                || state.expire_keep_alives_from.is_some_and(|from| index >= from)
        };
        // Give other tasks a chance to run, as a real round-trip would.
        tokio::task::yield_now().await;
        if expired {
            return Err(DomoError::SessionExpired);
        }
        Ok(())
    }

    async fn send(&self, _token: &SessionToken, command: &HubCommand) -> Result<Value, DomoError> {
        let (payload, hang) = {
            let mut state = self.lock();
            state.calls.push(Call::Send(command.clone()));
            let payload = match command {
                HubCommand::ListFeatures => state
                    .features
                    .clone()
                    .unwrap_or_else(|| json!({ "serial": "0000", "list": [] })),
                HubCommand::List { category } => match state.lists.get_mut(category) {
                    Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
                    Some(queue) => queue.front().cloned().unwrap_or_default(),
                    None => json!({ "array": [] }),
                },
                _ => json!({ "ack_reason": 0 }),
            };
            (payload, state.hang_sends)
        };
        tokio::task::yield_now().await;
        if hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(payload)
    }

    async fn logout(&self, _token: &SessionToken) -> Result<(), DomoError> {
        self.lock().calls.push(Call::Logout);
        Ok(())
    }
}

pub fn relay_json(id: u32, name: &str, on: bool) -> Value {
    json!({ "act_id": id, "name": name, "status": on })
}

pub fn zone_json(id: u32, name: &str, mode: u8, season: &str, set_point: i32, temp: i32) -> Value {
    json!({
        "act_id": id,
        "name": name,
        "status": 1,
        "mode": mode,
        "season": season,
        "set_point": set_point,
        "temp": temp,
    })
}
