//! Observability for token signing and verification.
//!
//! All entry points use `#[instrument(skip_all)]`; token strings, claim
//! values and key material are never recorded as span fields or labels.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `token_auth_tokens_signed_total` | Counter | `status` | Signing outcomes |
//! | `token_auth_token_validations_total` | Counter | `status`, `error_category` | Verification outcomes |
//! | `token_auth_key_fetch_total` | Counter | `status` | Key endpoint calls |
//! | `token_auth_key_fetch_duration_seconds` | Histogram | `status` | Key endpoint latency |
//! | `token_auth_key_cache_total` | Counter | `result` | Cache hit / miss / eviction |

pub mod metrics;
