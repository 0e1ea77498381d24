//! Error types for token signing and verification.
//!
//! Every rejection carries the offending field, key identifier or HTTP status
//! so callers can diagnose a failure without retrying blindly. Token contents
//! and key material never appear in error messages.

use thiserror::Error;

/// Top-level error returned by [`crate::Rs256`] operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JwtError {
    /// Missing or invalid key material / endpoint. Caller misconfiguration, not retryable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Underlying cryptographic failure while signing.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Token is structurally invalid (size, segments, base64, JSON).
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Header failed validation (algorithm family, type marker).
    #[error("Invalid header: {0}")]
    InvalidHeader(#[from] HeaderError),

    /// Claim set failed validation.
    #[error("Invalid claims: {0}")]
    InvalidClaims(#[from] ClaimsError),

    /// Verification key could not be resolved. May be transient.
    #[error("Key resolution failed: {0}")]
    KeyResolution(#[from] KeyResolutionError),

    /// Signature does not match the header and payload. Terminal.
    #[error("Invalid signature")]
    SignatureInvalid,
}

impl JwtError {
    /// Returns true when the token was rejected only because it is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, JwtError::InvalidClaims(ClaimsError::Expired { .. }))
    }

    /// Returns true when retrying the whole operation may succeed.
    ///
    /// Only network-side key resolution failures qualify; nothing is cached
    /// on failure, so a retry re-attempts the fetch.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            JwtError::KeyResolution(
                KeyResolutionError::KeyNotFound { .. }
                    | KeyResolutionError::Transport(_)
                    | KeyResolutionError::InvalidResponse(_)
                    | KeyResolutionError::Cancelled
            )
        )
    }

    /// Bounded label for metrics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            JwtError::Configuration(_) => "configuration",
            JwtError::Signing(_) => "signing",
            JwtError::MalformedToken(_) => "malformed",
            JwtError::InvalidHeader(_) => "header",
            JwtError::InvalidClaims(ClaimsError::Expired { .. }) => "expired",
            JwtError::InvalidClaims(_) => "claims",
            JwtError::KeyResolution(_) => "key_resolution",
            JwtError::SignatureInvalid => "signature",
        }
    }
}

/// Header validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// `alg` is missing or not a string.
    #[error("missing signing algorithm")]
    MissingAlgorithm,

    /// `alg` is not in the RSA signature family.
    #[error("invalid signing method [{0}]")]
    UnsupportedAlgorithm(String),

    /// `typ` is missing, not a string, or not exactly `JWT`.
    #[error("invalid token type [{}]", display_found(.0))]
    InvalidType(Option<String>),
}

/// Claim validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    /// `exp` is not after the current time.
    #[error("token is expired (exp {exp}, now {now})")]
    Expired { exp: i64, now: i64 },

    /// `iat` is after the current time.
    #[error("token used before issued (iat {iat}, now {now})")]
    IssuedInFuture { iat: i64, now: i64 },

    /// `nbf` is after the current time.
    #[error("token is not valid yet (nbf {nbf}, now {now})")]
    NotYetValid { nbf: i64, now: i64 },

    /// `exp` claim is absent.
    #[error("invalid expiration: missing exp claim")]
    MissingExpiry,

    /// A time claim is present but not a number representable as Unix seconds.
    #[error("invalid timestamp in claim [{claim}]")]
    InvalidTimestamp { claim: &'static str },

    /// `iss` does not equal the configured issuer.
    #[error("invalid issuer [{}]", display_found(.0))]
    InvalidIssuer(Option<String>),

    /// `aud` does not equal the configured audience.
    #[error("invalid audience [{}]", display_found(.0))]
    InvalidAudience(Option<String>),
}

/// Key resolution failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyResolutionError {
    /// Token header has no usable `kid` and no static key is configured.
    #[error("token has no key identifier")]
    MissingKeyId,

    /// The endpoint did not provide the requested key.
    #[error("key identifier [{kid}] is not found{}", display_status(.status))]
    KeyNotFound { kid: String, status: Option<u16> },

    /// The HTTP request could not be completed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a body that is not a `kid -> PEM` JSON object.
    #[error("invalid key endpoint response: {0}")]
    InvalidResponse(String),

    /// The key material for `kid` is not a valid RSA public key.
    #[error("invalid public key for [{kid}]: {reason}")]
    InvalidKey { kid: String, reason: String },

    /// The caller cancelled resolution while it was waiting.
    #[error("key resolution cancelled")]
    Cancelled,
}

fn display_found(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("<missing>")
}

fn display_status(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (http status {code})"))
        .unwrap_or_default()
}
