//! RS256 signer and verifier.
//!
//! [`Rs256`] issues tokens with a configured RSA private key and verifies
//! them against a static public key or a key resolved from the configured
//! endpoint.
//!
//! # Verification order
//!
//! 1. Decode (size limit, three segments, JSON header and payload)
//! 2. Header validation (RSA algorithm family, `typ`)
//! 3. Claim validation (time, then issuer, then audience)
//! 4. Key resolution (static key, cache, then network)
//! 5. Signature verification
//! 6. Expiry extraction
//!
//! Every step runs before any later one; nothing is retried.

use crate::claims::{Claims, AUDIENCE, AUTH_TIME, EXPIRES_AT, ISSUED_AT, ISSUER};
use crate::clock::{Clock, SystemClock};
use crate::config::Rs256Config;
use crate::error::JwtError;
use crate::jwt::{self, TOKEN_TYPE};
use crate::keys::{KeyCache, KeyFetcher, KeyResolver, ReqwestKeyFetcher};
use crate::observability::metrics;
use crate::validation::{validate_claims, validate_header};
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use secrecy::ExposeSecret;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// A freshly issued token.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken {
    /// Compact serialized token.
    pub token: String,
    /// Instant the token stops being valid.
    pub expiry: DateTime<Utc>,
}

impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedToken")
            .field("token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub claims: Claims,
    pub expiry: DateTime<Utc>,
    /// `kid` from the header, if any.
    pub key_id: Option<String>,
    /// The token is past `exp`. Only ever true when expiration was ignored.
    pub expired: bool,
}

impl VerifiedToken {
    #[must_use]
    pub fn into_parts(self) -> (Claims, DateTime<Utc>) {
        (self.claims, self.expiry)
    }
}

/// Token signer and verifier for one issuer/audience pair.
///
/// Safe to share across tasks; all methods take `&self`.
pub struct Rs256 {
    key_id: String,
    issuer: String,
    audience: String,
    max_age: TimeDelta,
    encoding_key: Option<EncodingKey>,
    resolver: KeyResolver,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Rs256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rs256")
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("max_age", &self.max_age)
            .field("encoding_key", &self.encoding_key.as_ref().map(|_| "[REDACTED]"))
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl Rs256 {
    /// Build an instance with an explicit clock and key fetcher.
    ///
    /// PEM material is parsed here, so a bad key fails at startup rather
    /// than on first use.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Configuration` if a configured PEM does not parse
    /// as an RSA key or the max age is out of range.
    pub fn new(
        config: Rs256Config,
        clock: Arc<dyn Clock>,
        fetcher: Arc<dyn KeyFetcher>,
    ) -> Result<Self, JwtError> {
        let max_age = TimeDelta::from_std(config.max_age)
            .map_err(|_| JwtError::Configuration("max age is out of range".to_string()))?;

        let encoding_key = config
            .private_key_pem
            .as_ref()
            .map(|pem| EncodingKey::from_rsa_pem(pem.expose_secret().as_bytes()))
            .transpose()
            .map_err(|e| {
                tracing::error!(target: "token_auth.signer", error = %e, "Invalid private key");
                JwtError::Configuration(format!("invalid private key: {e}"))
            })?;

        let static_key = config
            .public_key_pem
            .as_deref()
            .map(|pem| DecodingKey::from_rsa_pem(pem.as_bytes()))
            .transpose()
            .map_err(|e| {
                tracing::error!(target: "token_auth.verifier", error = %e, "Invalid public key");
                JwtError::Configuration(format!("invalid public key: {e}"))
            })?;

        tracing::debug!(
            target: "token_auth.signer",
            key_id = %config.key_id,
            can_sign = encoding_key.is_some(),
            static_public_key = static_key.is_some(),
            remote_keys = config.public_key_url.is_some(),
            "Initialized RS256 signer/verifier"
        );

        Ok(Self {
            key_id: config.key_id,
            issuer: config.issuer,
            audience: config.audience,
            max_age,
            encoding_key,
            resolver: KeyResolver::new(static_key, config.public_key_url, fetcher),
            clock,
        })
    }

    /// Build an instance using the system clock and a `reqwest` fetcher.
    ///
    /// # Errors
    ///
    /// See [`Rs256::new`]. Also fails if the HTTP client cannot be built.
    pub fn from_config(config: Rs256Config) -> Result<Self, JwtError> {
        let fetcher = ReqwestKeyFetcher::new(config.http_timeout)?;
        Self::new(config, Arc::new(SystemClock), Arc::new(fetcher))
    }

    /// Remote key cache.
    #[must_use]
    pub fn key_cache(&self) -> &KeyCache {
        self.resolver.cache()
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Sign `payload`, overwriting the registered claims.
    ///
    /// `iss`, `aud`, `auth_time`, `iat` and `exp` are always set from
    /// configuration and the clock; any values the caller put there are
    /// replaced.
    ///
    /// # Errors
    ///
    /// - `JwtError::Configuration` if no private key is configured
    /// - `JwtError::Signing` if the cryptographic operation fails or the token
    ///   would exceed [`jwt::MAX_JWT_SIZE_BYTES`]
    #[instrument(skip_all, fields(key_id = %self.key_id))]
    pub fn sign(&self, payload: Claims) -> Result<SignedToken, JwtError> {
        let result = self.sign_claims(payload);
        metrics::record_token_signing(if result.is_ok() { "success" } else { "error" });
        result
    }

    fn sign_claims(&self, mut claims: Claims) -> Result<SignedToken, JwtError> {
        let encoding_key = self.encoding_key.as_ref().ok_or_else(|| {
            tracing::warn!(target: "token_auth.signer", "Sign requested without a private key");
            JwtError::Configuration("no private key configured".to_string())
        })?;

        let issued_at = self.clock.now().trunc_subsecs(0);
        let expiry = issued_at
            .checked_add_signed(self.max_age)
            .ok_or_else(|| JwtError::Signing("expiry is out of range".to_string()))?;

        claims.insert(ISSUER, self.issuer.as_str());
        claims.insert(AUDIENCE, self.audience.as_str());
        claims.insert(AUTH_TIME, issued_at.timestamp());
        claims.insert(ISSUED_AT, issued_at.timestamp());
        claims.insert(EXPIRES_AT, expiry.timestamp());

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());
        header.typ = Some(TOKEN_TYPE.to_string());

        let token = jsonwebtoken::encode(&header, &claims, encoding_key).map_err(|e| {
            tracing::error!(target: "token_auth.signer", error = %e, "Token signing failed");
            JwtError::Signing(e.to_string())
        })?;

        // Never hand out a token that parse would refuse.
        if token.len() > jwt::MAX_JWT_SIZE_BYTES {
            tracing::warn!(
                target: "token_auth.signer",
                token_size = token.len(),
                max_size = jwt::MAX_JWT_SIZE_BYTES,
                "Signed token exceeds maximum size"
            );
            return Err(JwtError::Signing(format!(
                "token exceeds {} bytes",
                jwt::MAX_JWT_SIZE_BYTES
            )));
        }

        tracing::debug!(target: "token_auth.signer", expiry = %expiry, "Signed token");

        Ok(SignedToken { token, expiry })
    }

    /// Verify `token` and return its claims.
    ///
    /// With `ignore_expiration`, time claims are not enforced; an expired
    /// token is returned with [`VerifiedToken::expired`] set. Signature,
    /// issuer and audience are always checked.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; see the module docs for the order.
    pub async fn parse(&self, token: &str, ignore_expiration: bool) -> Result<VerifiedToken, JwtError> {
        self.parse_with_cancellation(token, ignore_expiration, &CancellationToken::new())
            .await
    }

    /// [`Rs256::parse`], abandoning key resolution when `cancel` fires.
    ///
    /// # Errors
    ///
    /// As [`Rs256::parse`], plus `KeyResolutionError::Cancelled`.
    #[instrument(skip_all, fields(ignore_expiration = ignore_expiration))]
    pub async fn parse_with_cancellation(
        &self,
        token: &str,
        ignore_expiration: bool,
        cancel: &CancellationToken,
    ) -> Result<VerifiedToken, JwtError> {
        let result = self.verify(token, ignore_expiration, cancel).await;

        match &result {
            Ok(_) => metrics::record_token_validation("success", None),
            Err(e) => {
                tracing::debug!(target: "token_auth.verifier", error = %e, category = e.category(), "Token rejected");
                metrics::record_token_validation("error", Some(e.category()));
            }
        }

        result
    }

    async fn verify(
        &self,
        token: &str,
        ignore_expiration: bool,
        cancel: &CancellationToken,
    ) -> Result<VerifiedToken, JwtError> {
        let decoded = jwt::decode(token)?;

        let algorithm = validate_header(&decoded.header)?;

        let now = self.clock.now().timestamp();
        let check = validate_claims(
            &decoded.claims,
            &self.issuer,
            &self.audience,
            now,
            ignore_expiration,
        )?;

        let key = self
            .resolver
            .resolve(decoded.header.kid.as_deref(), cancel)
            .await?;

        let valid = jsonwebtoken::crypto::verify(
            decoded.signature,
            decoded.signing_input.as_bytes(),
            &key,
            algorithm,
        )
        .map_err(|e| {
            tracing::debug!(target: "token_auth.verifier", error = %e, "Signature verification errored");
            JwtError::SignatureInvalid
        })?;

        if !valid {
            tracing::warn!(target: "token_auth.verifier", kid = ?decoded.header.kid, "Token signature mismatch");
            return Err(JwtError::SignatureInvalid);
        }

        let expiry = decoded.claims.expires_at()?;

        Ok(VerifiedToken {
            claims: decoded.claims,
            expiry,
            key_id: decoded.header.kid,
            expired: check.expired,
        })
    }
}
