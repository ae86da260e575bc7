//! # domosync-adapter-http
//!
//! [`HubTransport`] over the hub's JSON-over-HTTP endpoint.
//!
//! ## Protocol
//! Every request is a form post to `http://<host>/domo/` whose `command`
//! field holds a JSON object; see [`protocol`] for the message shapes and how
//! answers are classified.
//!
//! ## Timeouts
//! The reqwest client carries the configured timeout for every request. The
//! session manager applies its own bound on top.

mod error;
pub mod protocol;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use domosync_app::ports::{Credentials, HubTransport, SessionToken};
use domosync_domain::command::HubCommand;
use domosync_domain::error::DomoError;
use serde_json::Value;

pub use error::HttpError;
use protocol::{ENDPOINT_PATH, FORM_FIELD};

/// HTTP client for one hub.
pub struct DomoHttpTransport {
    client: reqwest::Client,
    host: String,
    url: String,
    timeout: Duration,
    cseq: AtomicU64,
}

impl DomoHttpTransport {
    /// Build a transport for the hub at `host` (`address[:port]`).
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Client`] if the HTTP client cannot be built.
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self, HttpError> {
        let host = host.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpError::Client)?;
        let url = format!("http://{host}{ENDPOINT_PATH}");
        Ok(Self {
            client,
            host,
            url,
            timeout,
            cseq: AtomicU64::new(0),
        })
    }

    async fn post(&self, request: &Value) -> Result<Value, HttpError> {
        let response = self
            .client
            .post(&self.url)
            .form(&[(FORM_FIELD, request.to_string())])
            .send()
            .await
            .map_err(|err| HttpError::from_request(err, self.timeout))?
            .error_for_status()
            .map_err(HttpError::Status)?;

        response.json::<Value>().await.map_err(|err| {
            if err.is_timeout() {
                HttpError::Timeout(self.timeout)
            } else {
                HttpError::Body(err)
            }
        })
    }

    fn next_cseq(&self) -> u64 {
        self.cseq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl HubTransport for DomoHttpTransport {
    fn host(&self) -> &str {
        &self.host
    }

    async fn login(&self, credentials: &Credentials) -> Result<SessionToken, DomoError> {
        let response = self
            .post(&protocol::login_request(credentials))
            .await
            .map_err(HttpError::into_login_error)?;
        let client_id = protocol::parse_login(&response)?;
        tracing::debug!(host = %self.host, "registered with hub");
        Ok(SessionToken::new(client_id))
    }

    async fn keep_alive(&self, token: &SessionToken) -> Result<(), DomoError> {
        let response = self
            .post(&protocol::keep_alive_request(token.as_str()))
            .await?;
        protocol::parse_keep_alive(&response)
    }

    async fn send(&self, token: &SessionToken, command: &HubCommand) -> Result<Value, DomoError> {
        let cseq = self.next_cseq();
        let request = protocol::data_request(token.as_str(), cseq, command);
        tracing::trace!(cseq, cmd_name = protocol::command_name(command), "posting data request");
        let response = self.post(&request).await?;
        protocol::parse_data(&response)
    }

    async fn logout(&self, token: &SessionToken) -> Result<(), DomoError> {
        self.post(&protocol::logout_request(token.as_str())).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use domosync_app::services::catalog_fetcher::CatalogFetcher;
    use domosync_app::services::session_manager::{SessionManager, SessionOptions};
    use domosync_domain::category::Category;
    use domosync_domain::error::TransportError;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn answer(server: &MockServer, needle: &str, body: Value) {
        Mock::given(method("POST"))
            .and(path(ENDPOINT_PATH))
            .and(body_string_contains(needle))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn hub() -> MockServer {
        let server = MockServer::start().await;
        answer(
            &server,
            "sl_registration_req",
            json!({ "sl_data_ack_reason": 0, "sl_client_id": "c0ffee" }),
        )
        .await;
        answer(
            &server,
            "sl_keep_alive_req",
            json!({ "sl_data_ack_reason": 0 }),
        )
        .await;
        server
    }

    fn transport(server: &MockServer) -> DomoHttpTransport {
        DomoHttpTransport::new(server.address().to_string(), Duration::from_secs(2)).unwrap()
    }

    fn credentials() -> Credentials {
        Credentials::new("admin", "secret")
    }

    #[tokio::test]
    async fn should_login_with_client_id_from_hub() {
        let server = hub().await;

        let token = transport(&server).login(&credentials()).await.unwrap();

        assert_eq!(token.as_str(), "c0ffee");
    }

    #[tokio::test]
    async fn should_fetch_relays_through_session() {
        let server = hub().await;
        answer(
            &server,
            "relays_list_req",
            json!({
                "sl_data_ack_reason": 0,
                "sl_appl_msg": {
                    "cseq": 1,
                    "array": [{ "act_id": 1, "name": "Kitchen", "status": 1 }],
                },
            }),
        )
        .await;
        let session =
            SessionManager::connect(transport(&server), credentials(), SessionOptions::default())
                .await
                .unwrap();
        let fetcher = CatalogFetcher::new(Arc::new(session));

        let catalog = fetcher.fetch(Category::Relay).await.unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.records[0].display_name(), "Kitchen");
    }

    #[tokio::test]
    async fn should_fail_with_auth_error_when_hub_refuses_login() {
        let server = MockServer::start().await;
        answer(
            &server,
            "sl_registration_req",
            json!({ "sl_data_ack_reason": 1 }),
        )
        .await;

        let result = transport(&server).login(&credentials()).await;

        assert!(matches!(result, Err(DomoError::Auth)));
    }

    #[tokio::test]
    async fn should_fail_with_connect_error_when_hub_is_unreachable() {
        let transport = DomoHttpTransport::new("127.0.0.1:1", Duration::from_secs(2)).unwrap();

        let result =
            SessionManager::connect(transport, credentials(), SessionOptions::default()).await;

        assert!(matches!(result, Err(DomoError::Connect(_))));
    }

    #[tokio::test]
    async fn should_classify_unreachable_hub_at_login_as_connect_error() {
        let transport = DomoHttpTransport::new("127.0.0.1:1", Duration::from_secs(2)).unwrap();

        let login = transport.login(&credentials()).await;
        let keep_alive = transport.keep_alive(&SessionToken::new("c0ffee")).await;

        assert!(matches!(login, Err(DomoError::Connect(_))));
        assert!(matches!(
            keep_alive,
            Err(DomoError::Transport(TransportError::Io(_)))
        ));
    }

    #[tokio::test]
    async fn should_report_expired_session_on_refused_keep_alive() {
        let server = MockServer::start().await;
        answer(
            &server,
            "sl_keep_alive_req",
            json!({ "sl_data_ack_reason": 2 }),
        )
        .await;

        let result = transport(&server)
            .keep_alive(&SessionToken::new("stale"))
            .await;

        assert!(matches!(result, Err(DomoError::SessionExpired)));
    }

    #[tokio::test]
    async fn should_time_out_on_slow_hub() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "sl_data_ack_reason": 0 }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let transport =
            DomoHttpTransport::new(server.address().to_string(), Duration::from_millis(200))
                .unwrap();

        let result = transport.keep_alive(&SessionToken::new("c0ffee")).await;

        assert!(matches!(
            result,
            Err(DomoError::Transport(TransportError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn should_classify_server_error_as_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = transport(&server)
            .keep_alive(&SessionToken::new("c0ffee"))
            .await;

        assert!(matches!(
            result,
            Err(DomoError::Transport(TransportError::Io(_)))
        ));
    }

    #[tokio::test]
    async fn should_classify_non_json_body_as_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let result = transport(&server)
            .keep_alive(&SessionToken::new("c0ffee"))
            .await;

        assert!(matches!(result, Err(DomoError::Protocol(_))));
    }

    #[test]
    fn should_number_data_requests_from_one() {
        let transport = DomoHttpTransport::new("hub.local", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.next_cseq(), 1);
        assert_eq!(transport.next_cseq(), 2);
        assert_eq!(transport.host(), "hub.local");
    }
}
