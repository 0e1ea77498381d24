//! Custom assertions for raw token strings
//!
//! Decodes header and payload without verifying anything, for checking
//! what a signer actually put on the wire.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Assertions on a compact token string.
pub trait TokenAssertions {
    /// Decoded header JSON; panics if the token is malformed.
    fn header_json(&self) -> Value;

    /// Decoded payload JSON; panics if the token is malformed.
    fn claims_json(&self) -> Value;

    /// Assert the header field `name` is the string `expected`.
    fn assert_header(&self, name: &str, expected: &str) -> &Self;

    /// Assert the claim `name` equals `expected`.
    fn assert_claim(&self, name: &str, expected: impl Into<Value>) -> &Self;

    /// Assert the claim `name` is absent.
    fn assert_no_claim(&self, name: &str) -> &Self;
}

fn decode_segment(token: &str, index: usize) -> Value {
    let segment = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("token has no segment {index}"));
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .unwrap_or_else(|e| panic!("segment {index} is not base64url: {e}"));
    serde_json::from_slice(&bytes).unwrap_or_else(|e| panic!("segment {index} is not JSON: {e}"))
}

impl<T: AsRef<str>> TokenAssertions for T {
    fn header_json(&self) -> Value {
        decode_segment(self.as_ref(), 0)
    }

    fn claims_json(&self) -> Value {
        decode_segment(self.as_ref(), 1)
    }

    fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let header = self.header_json();
        assert_eq!(
            header.get(name).and_then(Value::as_str),
            Some(expected),
            "header field {name} mismatch in {header}"
        );
        self
    }

    fn assert_claim(&self, name: &str, expected: impl Into<Value>) -> &Self {
        let claims = self.claims_json();
        let expected = expected.into();
        assert_eq!(
            claims.get(name),
            Some(&expected),
            "claim {name} mismatch"
        );
        self
    }

    fn assert_no_claim(&self, name: &str) -> &Self {
        assert!(
            self.claims_json().get(name).is_none(),
            "claim {name} should be absent"
        );
        self
    }
}
