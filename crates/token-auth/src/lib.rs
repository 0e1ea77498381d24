//! RS256 token signing and verification.
//!
//! Issues signed bearer tokens and verifies them against a statically
//! configured RSA public key or a key fetched (and cached) from a remote
//! key-distribution endpoint.

#![warn(clippy::pedantic)]

/// Module for error types
pub mod error;

/// Module for loosely-typed token claims
pub mod claims;

/// Module for the time source used for issuance and expiry
pub mod clock;

/// Module for environment configuration
pub mod config;

/// Module for compact token decoding (size limits, segments, header)
pub mod jwt;

/// Module for stateless header and claim validation
pub mod validation;

/// Module for public key resolution, fetching and caching
pub mod keys;

/// Module for the RS256 signer/verifier
pub mod rs256;

/// Module for metrics
pub mod observability;

pub use claims::{ClaimValue, Claims};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Rs256Config;
pub use error::{ClaimsError, HeaderError, JwtError, KeyResolutionError};
pub use keys::{KeyFetcher, ReqwestKeyFetcher};
pub use rs256::{Rs256, SignedToken, VerifiedToken};
