//! Stateless header and claim validation.
//!
//! These checks run on the decoded (not yet verified) token, before any key
//! is resolved. Restricting `alg` to the RSA family here is the defense
//! against algorithm-confusion: an HMAC token whose secret is our public key
//! never reaches signature verification.

use crate::claims::{ClaimValue, Claims, AUDIENCE, EXPIRES_AT, ISSUED_AT, ISSUER, NOT_BEFORE};
use crate::error::{ClaimsError, HeaderError};
use crate::jwt::{TokenHeader, TOKEN_TYPE};
use jsonwebtoken::Algorithm;

/// Outcome of a successful claim check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimsCheck {
    /// The token is past `exp`. Only ever true when expiration was ignored.
    pub expired: bool,
}

/// Validate the header and return the RSA algorithm it names.
///
/// # Errors
///
/// - `HeaderError::MissingAlgorithm` - `alg` absent or not a string
/// - `HeaderError::UnsupportedAlgorithm` - `alg` outside `RS256`/`RS384`/`RS512`
/// - `HeaderError::InvalidType` - `typ` absent or not exactly `JWT`
pub fn validate_header(header: &TokenHeader) -> Result<Algorithm, HeaderError> {
    let alg = header.alg.as_deref().ok_or(HeaderError::MissingAlgorithm)?;
    let algorithm = rsa_algorithm(alg).ok_or_else(|| {
        tracing::debug!(target: "token_auth.validation", alg = %alg, "Token rejected: non-RSA signing method");
        HeaderError::UnsupportedAlgorithm(alg.to_string())
    })?;

    if header.typ.as_deref() != Some(TOKEN_TYPE) {
        tracing::debug!(target: "token_auth.validation", typ = ?header.typ, "Token rejected: invalid type");
        return Err(HeaderError::InvalidType(header.typ.clone()));
    }

    Ok(algorithm)
}

/// Validate time, issuer and audience claims against `now` (Unix seconds).
///
/// With `ignore_expiration` the time comparisons are skipped; whether the
/// token is past `exp` is still reported in [`ClaimsCheck::expired`].
///
/// # Errors
///
/// - `ClaimsError::Expired` - `now >= exp`
/// - `ClaimsError::MissingExpiry` - no `exp` while expiration is enforced
/// - `ClaimsError::IssuedInFuture` / `ClaimsError::NotYetValid` - `iat` / `nbf` after `now`
/// - `ClaimsError::InvalidTimestamp` - a time claim that is not a number
/// - `ClaimsError::InvalidIssuer` / `ClaimsError::InvalidAudience` - mismatch with configuration
pub fn validate_claims(
    claims: &Claims,
    issuer: &str,
    audience: &str,
    now: i64,
    ignore_expiration: bool,
) -> Result<ClaimsCheck, ClaimsError> {
    let check = if ignore_expiration {
        let expired = matches!(claims.timestamp(EXPIRES_AT), Ok(Some(exp)) if now >= exp);
        if expired {
            tracing::debug!(target: "token_auth.validation", "Expired token accepted for inspection");
        }
        ClaimsCheck { expired }
    } else {
        validate_times(claims, now)?;
        ClaimsCheck::default()
    };

    if !matches_string(claims.get(ISSUER), issuer) {
        return Err(ClaimsError::InvalidIssuer(
            claims.get(ISSUER).map(ClaimValue::describe),
        ));
    }

    if !matches_string(claims.get(AUDIENCE), audience) {
        return Err(ClaimsError::InvalidAudience(
            claims.get(AUDIENCE).map(ClaimValue::describe),
        ));
    }

    Ok(check)
}

fn validate_times(claims: &Claims, now: i64) -> Result<(), ClaimsError> {
    let exp = claims
        .timestamp(EXPIRES_AT)?
        .ok_or(ClaimsError::MissingExpiry)?;
    if now >= exp {
        tracing::debug!(target: "token_auth.validation", exp = exp, now = now, "Token rejected: expired");
        return Err(ClaimsError::Expired { exp, now });
    }

    if let Some(iat) = claims.timestamp(ISSUED_AT)? {
        if now < iat {
            tracing::debug!(target: "token_auth.validation", iat = iat, now = now, "Token rejected: used before issued");
            return Err(ClaimsError::IssuedInFuture { iat, now });
        }
    }

    if let Some(nbf) = claims.timestamp(NOT_BEFORE)? {
        if now < nbf {
            tracing::debug!(target: "token_auth.validation", nbf = nbf, now = now, "Token rejected: not valid yet");
            return Err(ClaimsError::NotYetValid { nbf, now });
        }
    }

    Ok(())
}

fn matches_string(value: Option<&ClaimValue>, expected: &str) -> bool {
    value.and_then(ClaimValue::as_str) == Some(expected)
}

fn rsa_algorithm(alg: &str) -> Option<Algorithm> {
    match alg {
        "RS256" => Some(Algorithm::RS256),
        "RS384" => Some(Algorithm::RS384),
        "RS512" => Some(Algorithm::RS512),
        _ => None,
    }
}
