//! # Token Auth Test Utilities
//!
//! Shared test utilities for the `token-auth` crate.
//!
//! This crate provides:
//! - Fixed RSA key pairs (PEM fixtures checked into `fixtures/`)
//! - A raw token builder for crafting valid, forged and malformed tokens
//! - A key server harness (`TestKeyServer`) serving `kid -> PEM` documents
//! - Fixed test identifiers
//! - Assertions on raw token strings
//!
//! ## Usage
//!
//! ```rust,ignore
//! use token_auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let keys = test_rsa_key_pair(1);
//!     let server = TestKeyServer::start(&[(TEST_KEY_ID_1, keys.public_pem)]).await;
//!
//!     let token = TestTokenBuilder::new()
//!         .with_claim("user_id", 42)
//!         .sign_rs256(keys.private_pem);
//!
//!     token.assert_header("alg", "RS256");
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
