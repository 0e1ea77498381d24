//! Fixed test identifiers for deterministic tests.

/// Issuer configured on test instances.
pub const TEST_ISSUER: &str = "svc-a";

/// Audience configured on test instances.
pub const TEST_AUDIENCE: &str = "svc-b";

// Key IDs, one per fixture key pair
pub const TEST_KEY_ID_1: &str = "test-key-2025-01";
pub const TEST_KEY_ID_2: &str = "test-key-2025-02";

/// Unknown to every key server in the tests.
pub const TEST_KEY_ID_UNKNOWN: &str = "test-key-unknown";

/// Fixed "now" for clock-driven tests (2023-11-14T22:13:20Z).
pub const TEST_NOW: i64 = 1_700_000_000;

/// Signed tokens live this long by default.
pub const TEST_MAX_AGE_SECONDS: i64 = 3600;
