//! Signer/verifier configuration.
//!
//! Configuration is constructor-time only. It can be built in code with the
//! `with_*` methods or loaded from environment variables:
//!
//! | Variable                   | Required | Meaning                                  |
//! |----------------------------|----------|------------------------------------------|
//! | `JWT_KEY_ID`               | yes      | `kid` placed in signed token headers     |
//! | `JWT_ISSUER`               | yes      | `iss` issued and required on verify      |
//! | `JWT_AUDIENCE`             | yes      | `aud` issued and required on verify      |
//! | `JWT_MAX_AGE_SECONDS`      | no       | token lifetime (default 3600)            |
//! | `JWT_PRIVATE_KEY`          | no       | base64-encoded PEM RSA private key       |
//! | `JWT_PUBLIC_KEY`           | no       | base64-encoded PEM RSA public key        |
//! | `JWT_PUBLIC_KEY_URL`       | no       | remote `kid -> PEM` endpoint             |
//! | `JWT_HTTP_TIMEOUT_SECONDS` | no       | key endpoint request timeout (default 10)|

use base64::{engine::general_purpose, Engine as _};
use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default token lifetime (1 hour).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Default timeout for the key endpoint request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

/// Configuration for [`crate::Rs256`].
#[derive(Debug, Clone)]
pub struct Rs256Config {
    /// Key identifier written to the `kid` header of signed tokens.
    pub key_id: String,

    /// Issuer written on sign and required on verify.
    pub issuer: String,

    /// Audience written on sign and required on verify.
    pub audience: String,

    /// Token lifetime added to the issuance time.
    pub max_age: Duration,

    /// PEM RSA private key. Only needed for signing.
    pub private_key_pem: Option<SecretString>,

    /// PEM RSA public key. Takes precedence over the endpoint.
    pub public_key_pem: Option<String>,

    /// Endpoint serving a JSON object of `kid -> PEM` public keys.
    pub public_key_url: Option<String>,

    /// Request timeout for the default HTTP key fetcher.
    pub http_timeout: Duration,
}

impl Rs256Config {
    /// Create a configuration with no key material and default timings.
    #[must_use]
    pub fn new(key_id: impl Into<String>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            max_age: DEFAULT_MAX_AGE,
            private_key_pem: None,
            public_key_pem: None,
            public_key_url: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    #[must_use]
    pub fn with_private_key_pem(mut self, pem: impl Into<String>) -> Self {
        self.private_key_pem = Some(SecretString::from(pem.into()));
        self
    }

    #[must_use]
    pub fn with_public_key_pem(mut self, pem: impl Into<String>) -> Self {
        self.public_key_pem = Some(pem.into());
        self
    }

    #[must_use]
    pub fn with_public_key_url(mut self, url: impl Into<String>) -> Self {
        self.public_key_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// See [`Rs256Config::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing)
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingEnvVar` if `JWT_KEY_ID`, `JWT_ISSUER` or `JWT_AUDIENCE` is unset
    /// - `ConfigError::InvalidValue` for non-numeric durations or non-UTF-8 PEM
    /// - `ConfigError::Base64Error` if a key variable is not valid base64
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let key_id = required(vars, "JWT_KEY_ID")?;
        let issuer = required(vars, "JWT_ISSUER")?;
        let audience = required(vars, "JWT_AUDIENCE")?;

        let max_age = seconds(vars, "JWT_MAX_AGE_SECONDS")?.unwrap_or(DEFAULT_MAX_AGE);
        let http_timeout = seconds(vars, "JWT_HTTP_TIMEOUT_SECONDS")?.unwrap_or(DEFAULT_HTTP_TIMEOUT);

        let private_key_pem = pem(vars, "JWT_PRIVATE_KEY")?.map(SecretString::from);
        let public_key_pem = pem(vars, "JWT_PUBLIC_KEY")?;
        let public_key_url = vars.get("JWT_PUBLIC_KEY_URL").filter(|v| !v.is_empty()).cloned();

        Ok(Rs256Config {
            key_id,
            issuer,
            audience,
            max_age,
            private_key_pem,
            public_key_pem,
            public_key_url,
            http_timeout,
        })
    }
}

fn required(vars: &HashMap<String, String>, var: &str) -> Result<String, ConfigError> {
    vars.get(var)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
}

fn seconds(vars: &HashMap<String, String>, var: &str) -> Result<Option<Duration>, ConfigError> {
    vars.get(var)
        .map(|raw| {
            raw.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::InvalidValue {
                    var: var.to_string(),
                    reason: e.to_string(),
                })
        })
        .transpose()
}

fn pem(vars: &HashMap<String, String>, var: &str) -> Result<Option<String>, ConfigError> {
    let Some(encoded) = vars.get(var).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let decoded = general_purpose::STANDARD.decode(encoded)?;
    String::from_utf8(decoded)
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            reason: "decoded key is not UTF-8 PEM text".to_string(),
        })
}
