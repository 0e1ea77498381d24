//! Metrics definitions.
//!
//! All metrics follow Prometheus naming conventions:
//! - `token_auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: success, error, cancelled
//! - `error_category`: bounded by [`crate::JwtError::category`]
//! - `result`: hit, miss, evicted
//!
//! Key identifiers and issuers are never used as labels; both come from
//! untrusted tokens.

use metrics::{counter, histogram};
use std::time::Duration;

/// Record a `sign` call.
///
/// Metric: `token_auth_tokens_signed_total`
/// Labels: `status`
pub fn record_token_signing(status: &'static str) {
    counter!("token_auth_tokens_signed_total", "status" => status).increment(1);
}

/// Record a `parse` call.
///
/// Metric: `token_auth_token_validations_total`
/// Labels: `status`, `error_category` ("none" on success)
pub fn record_token_validation(status: &'static str, error_category: Option<&'static str>) {
    counter!("token_auth_token_validations_total",
        "status" => status,
        "error_category" => error_category.unwrap_or("none")
    )
    .increment(1);
}

/// Record a key endpoint round-trip.
///
/// Metric: `token_auth_key_fetch_total`, `token_auth_key_fetch_duration_seconds`
/// Labels: `status`
pub fn record_key_fetch(status: &'static str, duration: Duration) {
    histogram!("token_auth_key_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("token_auth_key_fetch_total", "status" => status).increment(1);
}

/// Record a key cache lookup outcome.
///
/// Metric: `token_auth_key_cache_total`
/// Labels: `result`
pub fn record_key_cache(result: &'static str) {
    counter!("token_auth_key_cache_total", "result" => result).increment(1);
}
