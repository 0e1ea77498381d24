//! Builder patterns for test data construction
//!
//! [`TestTokenBuilder`] writes the header and payload as raw JSON and signs
//! the result directly, so tests can produce tokens a conforming signer
//! never would: foreign algorithms, missing `typ`, non-string claims,
//! unsigned or garbage signatures.

use crate::test_ids::{TEST_AUDIENCE, TEST_ISSUER, TEST_KEY_ID_1, TEST_MAX_AGE_SECONDS};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey};
use serde_json::{json, Map, Value};

/// Builder for raw test tokens
///
/// Defaults to a well-formed RS256 token for [`TEST_ISSUER`] /
/// [`TEST_AUDIENCE`] issued now and valid for an hour.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .with_claim("user_id", 42)
///     .expires_at(now - 10)
///     .sign_rs256(test_rsa_key_pair(1).private_pem);
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    header: Map<String, Value>,
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults, issued at the wall clock.
    pub fn new() -> Self {
        Self::issued_at_time(Utc::now().timestamp())
    }

    /// Create a new token builder with defaults, issued at `now`.
    pub fn issued_at_time(now: i64) -> Self {
        Self {
            header: Map::new(),
            claims: Map::new(),
        }
        .with_header("alg", "RS256")
        .with_header("typ", "JWT")
        .with_header("kid", TEST_KEY_ID_1)
        .with_claim("iss", TEST_ISSUER)
        .with_claim("aud", TEST_AUDIENCE)
        .with_claim("auth_time", now)
        .with_claim("iat", now)
        .with_claim("exp", now + TEST_MAX_AGE_SECONDS)
    }

    /// Set a header field to any JSON value.
    pub fn with_header(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.header.insert(name.to_string(), value.into());
        self
    }

    /// Remove a header field.
    pub fn without_header(mut self, name: &str) -> Self {
        self.header.remove(name);
        self
    }

    /// Set the `alg` header.
    pub fn with_alg(self, alg: &str) -> Self {
        self.with_header("alg", alg)
    }

    /// Set the `kid` header.
    pub fn with_kid(self, kid: &str) -> Self {
        self.with_header("kid", kid)
    }

    /// Set a claim to any JSON value.
    pub fn with_claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name.to_string(), value.into());
        self
    }

    /// Remove a claim.
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    pub fn issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", issuer)
    }

    pub fn audience(self, audience: &str) -> Self {
        self.with_claim("aud", audience)
    }

    pub fn expires_at(self, exp: i64) -> Self {
        self.with_claim("exp", exp)
    }

    pub fn issued_at(self, iat: i64) -> Self {
        self.with_claim("iat", iat)
    }

    pub fn not_before(self, nbf: i64) -> Self {
        self.with_claim("nbf", nbf)
    }

    /// The header as a JSON value
    pub fn header_json(&self) -> Value {
        Value::Object(self.header.clone())
    }

    /// The claims as a JSON value
    pub fn claims_json(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// `base64url(header).base64url(payload)`
    pub fn signing_input(&self) -> String {
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(self.header_json().to_string()),
            URL_SAFE_NO_PAD.encode(self.claims_json().to_string())
        )
    }

    /// Sign with `key` under `algorithm`, whatever the `alg` header says.
    pub fn sign_with(self, key: &EncodingKey, algorithm: Algorithm) -> String {
        let signing_input = self.signing_input();
        let signature = jsonwebtoken::crypto::sign(signing_input.as_bytes(), key, algorithm)
            .expect("test token signing should succeed");
        format!("{signing_input}.{signature}")
    }

    /// Sign with an RSA private key using the algorithm in the `alg` header
    /// (RS256 when the header names something else).
    pub fn sign_rs256(self, private_pem: &str) -> String {
        let algorithm = match self.header.get("alg").and_then(Value::as_str) {
            Some("RS384") => Algorithm::RS384,
            Some("RS512") => Algorithm::RS512,
            _ => Algorithm::RS256,
        };
        let key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .expect("test private key should parse");
        self.sign_with(&key, algorithm)
    }

    /// Sign with HMAC-SHA256 using `secret`.
    pub fn sign_hs256(self, secret: &[u8]) -> String {
        self.sign_with(&EncodingKey::from_secret(secret), Algorithm::HS256)
    }

    /// Attach an arbitrary (invalid) signature.
    pub fn with_fake_signature(self) -> String {
        format!(
            "{}.{}",
            self.signing_input(),
            URL_SAFE_NO_PAD.encode(b"not-a-real-signature")
        )
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A token whose payload segment is `payload` verbatim (not JSON-encoded).
pub fn token_with_raw_payload(payload: &str) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(json!({"alg": "RS256", "typ": "JWT"}).to_string()),
        URL_SAFE_NO_PAD.encode(payload),
        URL_SAFE_NO_PAD.encode(b"signature")
    )
}
