//! Key server harness for integration tests
//!
//! [`TestKeyServer`] runs a `wiremock` server that answers
//! `GET /keys` carrying `Content-Type: application/json` with a JSON object
//! mapping key ids to PEM documents. Requests without that header get a
//! 404, so tests also check the client sends it.

use serde_json::{Map, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the harness serves keys on.
pub const KEYS_PATH: &str = "/keys";

/// Test harness serving `kid -> PEM` documents
///
/// # Example
/// ```rust,ignore
/// let server = TestKeyServer::start(&[(TEST_KEY_ID_1, keys.public_pem)]).await;
/// let config = Rs256Config::new(TEST_KEY_ID_1, TEST_ISSUER, TEST_AUDIENCE)
///     .with_public_key_url(server.url());
/// // ...
/// assert_eq!(server.request_count().await, 1);
/// ```
pub struct TestKeyServer {
    server: MockServer,
}

impl TestKeyServer {
    /// Serve `keys` with `200 OK`.
    pub async fn start(keys: &[(&str, &str)]) -> Self {
        Self::start_with(ResponseTemplate::new(200).set_body_json(key_document(keys))).await
    }

    /// Serve `keys` with `200 OK` after `delay`.
    pub async fn start_delayed(keys: &[(&str, &str)], delay: Duration) -> Self {
        Self::start_with(
            ResponseTemplate::new(200)
                .set_body_json(key_document(keys))
                .set_delay(delay),
        )
        .await
    }

    /// Answer every request with `status` and an empty body.
    pub async fn start_with_status(status: u16) -> Self {
        Self::start_with(ResponseTemplate::new(status)).await
    }

    /// Answer every request with `200 OK` and `body` verbatim.
    pub async fn start_with_body(body: &str) -> Self {
        Self::start_with(ResponseTemplate::new(200).set_body_string(body)).await
    }

    async fn start_with(response: ResponseTemplate) -> Self {
        let server = MockServer::start().await;
        mount(&server, response).await;
        Self { server }
    }

    /// Replace the served document with `keys`.
    ///
    /// Clears recorded requests as well.
    pub async fn serve_keys(&self, keys: &[(&str, &str)]) {
        self.server.reset().await;
        mount(
            &self.server,
            ResponseTemplate::new(200).set_body_json(key_document(keys)),
        )
        .await;
    }

    /// URL to configure as the public key endpoint.
    pub fn url(&self) -> String {
        format!("{}{KEYS_PATH}", self.server.uri())
    }

    /// Number of requests received so far, matched or not.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}

async fn mount(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(KEYS_PATH))
        .and(header("content-type", "application/json"))
        .respond_with(response)
        .mount(server)
        .await;
}

fn key_document(keys: &[(&str, &str)]) -> Value {
    Value::Object(
        keys.iter()
            .map(|(kid, pem)| ((*kid).to_string(), Value::String((*pem).to_string())))
            .collect::<Map<String, Value>>(),
    )
}
