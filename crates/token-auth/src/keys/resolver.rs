//! Verification key resolution.
//!
//! Resolution order:
//! 1. A statically configured public key always wins.
//! 2. Otherwise the key endpoint is required, and so is a `kid`.
//! 3. The cache is consulted; an entry that no longer parses is evicted.
//! 4. On a miss, one caller per key fetches the endpoint and stores the
//!    result. Failures are never cached.
//!
//! # Security
//!
//! - The `kid` is untrusted input; it only selects a key, it never grants one
//! - Key material is never logged

use crate::error::{JwtError, KeyResolutionError};
use crate::keys::cache::{cache_key, KeyCache};
use crate::keys::fetcher::KeyFetcher;
use crate::observability::metrics;
use bytes::Bytes;
use jsonwebtoken::DecodingKey;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Resolves the public key a token must verify against.
pub struct KeyResolver {
    static_key: Option<DecodingKey>,
    endpoint: Option<String>,
    fetcher: Arc<dyn KeyFetcher>,
    cache: KeyCache,
}

impl fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyResolver")
            .field("static_key", &self.static_key.as_ref().map(|_| "[CONFIGURED]"))
            .field("endpoint", &self.endpoint)
            .field("cached_keys", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl KeyResolver {
    pub fn new(
        static_key: Option<DecodingKey>,
        endpoint: Option<String>,
        fetcher: Arc<dyn KeyFetcher>,
    ) -> Self {
        Self {
            static_key,
            endpoint,
            fetcher,
            cache: KeyCache::new(),
        }
    }

    /// The key cache, shared by all resolutions on this resolver.
    #[must_use]
    pub fn cache(&self) -> &KeyCache {
        &self.cache
    }

    /// Resolve the key for `kid`.
    ///
    /// # Errors
    ///
    /// - `JwtError::Configuration` if neither a static key nor an endpoint is configured
    /// - `JwtError::KeyResolution` if the key cannot be obtained, or `cancel` fires
    #[instrument(skip_all, fields(kid = kid.unwrap_or("")))]
    pub async fn resolve(
        &self,
        kid: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<DecodingKey, JwtError> {
        if let Some(key) = &self.static_key {
            return Ok(key.clone());
        }

        let endpoint = self.endpoint.as_deref().ok_or_else(|| {
            JwtError::Configuration("no public key or public key URL configured".to_string())
        })?;

        let kid = kid.ok_or(KeyResolutionError::MissingKeyId)?;
        let key = cache_key(endpoint, kid);

        if let Some(decoding_key) = self.cached(&key) {
            return Ok(decoding_key);
        }

        let Some(_permit) = self.cache.acquire(&key, cancel).await else {
            tracing::debug!(target: "token_auth.keys", kid = %kid, "Key resolution cancelled while waiting for fetch");
            return Err(KeyResolutionError::Cancelled.into());
        };

        // Another caller may have stored the key while this one waited.
        if let Some(decoding_key) = self.cached(&key) {
            return Ok(decoding_key);
        }

        let pem = self.fetch(endpoint, kid, cancel).await?;
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            tracing::warn!(target: "token_auth.keys", kid = %kid, error = %e, "Fetched key is not a valid RSA public key");
            KeyResolutionError::InvalidKey {
                kid: kid.to_string(),
                reason: e.to_string(),
            }
        })?;

        self.cache.insert(key, pem.into_bytes());
        tracing::debug!(target: "token_auth.keys", kid = %kid, "Stored fetched key in cache");

        Ok(decoding_key)
    }

    /// Parse the cached material for `key`, evicting it if it no longer parses.
    fn cached(&self, key: &str) -> Option<DecodingKey> {
        let Some(material) = self.cache.get(key) else {
            metrics::record_key_cache("miss");
            return None;
        };

        match DecodingKey::from_rsa_pem(&material) {
            Ok(decoding_key) => {
                metrics::record_key_cache("hit");
                Some(decoding_key)
            }
            Err(e) => {
                self.evict(key, &material, &e);
                None
            }
        }
    }

    fn evict(&self, key: &str, material: &Bytes, error: &jsonwebtoken::errors::Error) {
        if self.cache.remove_if_unchanged(key, material) {
            tracing::warn!(target: "token_auth.keys", error = %error, "Evicted unparseable cached key");
            metrics::record_key_cache("evicted");
        }
    }

    /// Download the endpoint's key document and pick out `kid`.
    async fn fetch(
        &self,
        endpoint: &str,
        kid: &str,
        cancel: &CancellationToken,
    ) -> Result<String, KeyResolutionError> {
        let start = Instant::now();
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(KeyResolutionError::Cancelled),
            response = self.fetcher.fetch(endpoint) => response,
        };

        let status = match &result {
            Ok(response) if response.status == 200 => "success",
            Err(KeyResolutionError::Cancelled) => "cancelled",
            _ => "error",
        };
        metrics::record_key_fetch(status, start.elapsed());

        let response = result?;
        if response.status != 200 {
            tracing::warn!(
                target: "token_auth.keys",
                kid = %kid,
                status = response.status,
                "Key endpoint returned non-success status"
            );
            return Err(KeyResolutionError::KeyNotFound {
                kid: kid.to_string(),
                status: Some(response.status),
            });
        }

        let mut keys: HashMap<String, String> =
            serde_json::from_slice(&response.body).map_err(|e| {
                tracing::warn!(target: "token_auth.keys", error = %e, "Key endpoint returned invalid document");
                KeyResolutionError::InvalidResponse(e.to_string())
            })?;

        keys.remove(kid).ok_or_else(|| {
            tracing::debug!(target: "token_auth.keys", kid = %kid, available = keys.len(), "Key not present in endpoint document");
            KeyResolutionError::KeyNotFound {
                kid: kid.to_string(),
                status: None,
            }
        })
    }
}
