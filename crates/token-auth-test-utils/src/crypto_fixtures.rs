//! Fixed cryptographic fixtures for testing
//!
//! RSA-2048 key pairs stored as PEM under `fixtures/`. Private keys are
//! PKCS#8 (`PRIVATE KEY`), public keys SPKI (`PUBLIC KEY`). Key pair 1 is
//! also available as a PKCS#1 (`RSA PUBLIC KEY`) document.
//!
//! These keys are public test material. Never use them outside tests.

use jsonwebtoken::{DecodingKey, EncodingKey};
use thiserror::Error;

pub const TEST_RSA_PRIVATE_PEM_1: &str = include_str!("../fixtures/rsa_private_1.pem");
pub const TEST_RSA_PUBLIC_PEM_1: &str = include_str!("../fixtures/rsa_public_1.pem");
pub const TEST_RSA_PUBLIC_PKCS1_PEM_1: &str = include_str!("../fixtures/rsa_public_1_pkcs1.pem");
pub const TEST_RSA_PRIVATE_PEM_2: &str = include_str!("../fixtures/rsa_private_2.pem");
pub const TEST_RSA_PUBLIC_PEM_2: &str = include_str!("../fixtures/rsa_public_2.pem");

/// Shared secret for crafting HMAC tokens in algorithm confusion tests.
pub const TEST_HMAC_SECRET: &[u8] = b"test-hmac-secret-not-for-production";

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("No RSA fixture with index {0}")]
    UnknownKeyPair(u8),

    #[error("Fixture key failed to parse: {0}")]
    InvalidKey(String),
}

/// One fixture key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestRsaKeyPair {
    pub private_pem: &'static str,
    pub public_pem: &'static str,
}

impl TestRsaKeyPair {
    /// Signing key for `jsonwebtoken`.
    pub fn encoding_key(&self) -> Result<EncodingKey, FixtureError> {
        EncodingKey::from_rsa_pem(self.private_pem.as_bytes())
            .map_err(|e| FixtureError::InvalidKey(e.to_string()))
    }

    /// Verification key for `jsonwebtoken`.
    pub fn decoding_key(&self) -> Result<DecodingKey, FixtureError> {
        DecodingKey::from_rsa_pem(self.public_pem.as_bytes())
            .map_err(|e| FixtureError::InvalidKey(e.to_string()))
    }
}

/// Look up fixture key pair `index` (1 or 2).
///
/// # Example
/// ```rust,ignore
/// let keys = rsa_key_pair(1)?;
/// assert_ne!(keys, rsa_key_pair(2)?);
/// ```
pub fn rsa_key_pair(index: u8) -> Result<TestRsaKeyPair, FixtureError> {
    match index {
        1 => Ok(TestRsaKeyPair {
            private_pem: TEST_RSA_PRIVATE_PEM_1,
            public_pem: TEST_RSA_PUBLIC_PEM_1,
        }),
        2 => Ok(TestRsaKeyPair {
            private_pem: TEST_RSA_PRIVATE_PEM_2,
            public_pem: TEST_RSA_PUBLIC_PEM_2,
        }),
        other => Err(FixtureError::UnknownKeyPair(other)),
    }
}

/// [`rsa_key_pair`] that panics on an unknown index.
pub fn test_rsa_key_pair(index: u8) -> TestRsaKeyPair {
    rsa_key_pair(index).unwrap_or_else(|e| panic!("{e}"))
}
