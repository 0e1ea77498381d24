//! Compact token decoding.
//!
//! Splits a token into its three base64url segments and decodes the header
//! and payload. Nothing here verifies a signature; the decoded header and
//! claims are untrusted until [`crate::Rs256::parse`] has verified them.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE any decoding (DoS prevention)
//! - Header fields are read as untyped JSON so an unexpected `alg` or `typ`
//!   surfaces as a header validation failure, not a decoding failure

use crate::claims::Claims;
use crate::error::JwtError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

/// Maximum allowed token size in bytes (8KB).
///
/// Tokens larger than this are rejected before base64 decoding or any
/// cryptographic work.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Required value of the `typ` header.
pub const TOKEN_TYPE: &str = "JWT";

/// Header fields consumed by validation.
///
/// A field that is absent or not a JSON string is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenHeader {
    pub alg: Option<String>,
    pub typ: Option<String>,
    pub kid: Option<String>,
}

/// A token split into its decoded parts.
#[derive(Debug)]
pub(crate) struct DecodedToken<'a> {
    pub header: TokenHeader,
    pub claims: Claims,
    /// `header.payload`, the bytes covered by the signature.
    pub signing_input: &'a str,
    /// Signature segment, still base64url-encoded.
    pub signature: &'a str,
}

/// Decode the header of a token without verifying anything.
///
/// Useful for routing (e.g. reading `kid`) before full verification.
///
/// # Errors
///
/// Returns `JwtError::MalformedToken` if the token is oversized, does not
/// have three segments, or its header is not a base64url JSON object.
pub fn decode_header(token: &str) -> Result<TokenHeader, JwtError> {
    let (header_b64, _, _) = split(token)?;
    parse_header(header_b64)
}

/// Split and decode all three segments.
pub(crate) fn decode(token: &str) -> Result<DecodedToken<'_>, JwtError> {
    let (header_b64, payload_b64, signature) = split(token)?;

    let header = parse_header(header_b64)?;

    let payload_bytes = decode_segment(payload_b64, "payload")?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "token_auth.jwt", error = %e, "Failed to parse token payload JSON");
        JwtError::MalformedToken("payload is not valid JSON".to_string())
    })?;
    let claims = Claims::from_json(payload)
        .map_err(|_| JwtError::MalformedToken("payload is not a JSON object".to_string()))?;

    decode_segment(signature, "signature")?;

    let signing_input_len = header_b64.len() + 1 + payload_b64.len();
    let signing_input = token
        .get(..signing_input_len)
        .ok_or_else(|| JwtError::MalformedToken("invalid token structure".to_string()))?;

    Ok(DecodedToken {
        header,
        claims,
        signing_input,
        signature,
    })
}

fn split(token: &str) -> Result<(&str, &str, &str), JwtError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "token_auth.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtError::MalformedToken(format!(
            "token exceeds {MAX_JWT_SIZE_BYTES} bytes"
        )));
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok((header, payload, signature))
        }
        _ => {
            tracing::debug!(target: "token_auth.jwt", "Token rejected: invalid JWT format");
            Err(JwtError::MalformedToken(
                "token must have three non-empty segments".to_string(),
            ))
        }
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, JwtError> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "token_auth.jwt", segment = name, error = %e, "Failed to decode token segment");
        JwtError::MalformedToken(format!("{name} is not valid base64url"))
    })
}

fn parse_header(header_b64: &str) -> Result<TokenHeader, JwtError> {
    let header_bytes = decode_segment(header_b64, "header")?;
    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "token_auth.jwt", error = %e, "Failed to parse token header JSON");
        JwtError::MalformedToken("header is not valid JSON".to_string())
    })?;
    let fields = header
        .as_object()
        .ok_or_else(|| JwtError::MalformedToken("header is not a JSON object".to_string()))?;

    let string_field = |name: &str| {
        fields
            .get(name)
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string)
    };

    Ok(TokenHeader {
        alg: string_field("alg"),
        typ: string_field("typ"),
        // Empty kid is treated as absent
        kid: string_field("kid").filter(|kid| !kid.is_empty()),
    })
}
