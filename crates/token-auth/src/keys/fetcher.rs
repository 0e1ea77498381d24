//! Key material download.
//!
//! [`KeyFetcher`] is the only network capability the resolver needs: one GET
//! against the key endpoint. Retries, pooling and TLS are left to the client.

use crate::error::{JwtError, KeyResolutionError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::time::Duration;
use tracing::instrument;

/// Connect timeout for the default HTTP client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw response from the key endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyResponse {
    pub status: u16,
    pub body: Bytes,
}

impl KeyResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Fetches the key document served at a URL.
///
/// Implementations return the status and body as received; interpreting
/// them is the resolver's job. Only failures to complete the exchange are
/// errors.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// GET `url` with `Content-Type: application/json`.
    async fn fetch(&self, url: &str) -> Result<KeyResponse, KeyResolutionError>;
}

/// [`KeyFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestKeyFetcher {
    http_client: reqwest::Client,
}

impl ReqwestKeyFetcher {
    /// Build a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Configuration` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, JwtError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| JwtError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http_client })
    }

    /// Use an existing client.
    #[must_use]
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl KeyFetcher for ReqwestKeyFetcher {
    #[instrument(skip_all)]
    async fn fetch(&self, url: &str) -> Result<KeyResponse, KeyResolutionError> {
        let response = self
            .http_client
            .get(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(target: "token_auth.keys", error = %e, "Key endpoint request failed");
                KeyResolutionError::Transport(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(target: "token_auth.keys", error = %e, status, "Failed to read key endpoint response");
            KeyResolutionError::Transport(e.to_string())
        })?;

        Ok(KeyResponse { status, body })
    }
}

/// Mock key fetcher for testing.
///
/// Serves an in-memory `kid -> PEM` document and counts calls, so tests can
/// assert how many network round-trips a scenario cost.
pub mod mock {

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    #[derive(Debug, Clone)]
    enum Reply {
        Keys(HashMap<String, String>),
        Raw(KeyResponse),
        TransportError,
    }

    /// In-memory [`KeyFetcher`].
    #[derive(Debug)]
    pub struct MockKeyFetcher {
        reply: Mutex<Reply>,
        delay: Option<Duration>,
        call_count: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl MockKeyFetcher {
        fn with_reply(reply: Reply) -> Self {
            Self {
                reply: Mutex::new(reply),
                delay: None,
                call_count: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        /// Serve `keys` as a `200 OK` JSON object.
        pub fn serving<K, V>(keys: impl IntoIterator<Item = (K, V)>) -> Self
        where
            K: Into<String>,
            V: Into<String>,
        {
            Self::with_reply(Reply::Keys(
                keys.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ))
        }

        /// Reply with `status` and `body` verbatim.
        pub fn responding(status: u16, body: impl Into<Bytes>) -> Self {
            Self::with_reply(Reply::Raw(KeyResponse::new(status, body)))
        }

        /// Fail every call at the transport level.
        pub fn failing() -> Self {
            Self::with_reply(Reply::TransportError)
        }

        /// Wait `delay` before answering.
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Replace the served document with `keys`.
        pub fn set_keys<K, V>(&self, keys: impl IntoIterator<Item = (K, V)>)
        where
            K: Into<String>,
            V: Into<String>,
        {
            let keys = keys.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
            *self.reply.lock().unwrap_or_else(PoisonError::into_inner) = Reply::Keys(keys);
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// URLs requested so far, in call order.
        pub fn requested_urls(&self) -> Vec<String> {
            self.urls.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    #[async_trait]
    impl KeyFetcher for MockKeyFetcher {
        async fn fetch(&self, url: &str) -> Result<KeyResponse, KeyResolutionError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.urls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(url.to_string());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let reply = self.reply.lock().unwrap_or_else(PoisonError::into_inner).clone();
            match reply {
                Reply::Keys(keys) => {
                    let body = serde_json::to_vec(&keys)
                        .map_err(|e| KeyResolutionError::Transport(e.to_string()))?;
                    Ok(KeyResponse::new(200, body))
                }
                Reply::Raw(response) => Ok(response),
                Reply::TransportError => Err(KeyResolutionError::Transport(
                    "mock key fetcher error".to_string(),
                )),
            }
        }
    }
}
