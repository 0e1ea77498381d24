//! Shared setup for integration tests.

use std::sync::Arc;
use std::time::Duration;
use token_auth::keys::fetcher::mock::MockKeyFetcher;
use token_auth::{Clock, FixedClock, KeyFetcher, ReqwestKeyFetcher, Rs256, Rs256Config};
use token_auth_test_utils::{
    test_rsa_key_pair, TEST_AUDIENCE, TEST_ISSUER, TEST_KEY_ID_1, TEST_NOW,
};

/// Clock pinned at `TEST_NOW`.
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(TEST_NOW))
}

/// Signing and static verification with fixture key pair 1.
pub fn static_config() -> Rs256Config {
    let keys = test_rsa_key_pair(1);
    Rs256Config::new(TEST_KEY_ID_1, TEST_ISSUER, TEST_AUDIENCE)
        .with_private_key_pem(keys.private_pem)
        .with_public_key_pem(keys.public_pem)
}

/// Signing with fixture key pair 1, verification via `url`.
pub fn remote_config(url: &str) -> Rs256Config {
    let keys = test_rsa_key_pair(1);
    Rs256Config::new(TEST_KEY_ID_1, TEST_ISSUER, TEST_AUDIENCE)
        .with_private_key_pem(keys.private_pem)
        .with_public_key_url(url)
}

/// Instance whose network fetches always fail.
pub fn offline(config: Rs256Config, clock: &Arc<FixedClock>) -> Result<Rs256, anyhow::Error> {
    let fetcher: Arc<dyn KeyFetcher> = Arc::new(MockKeyFetcher::failing());
    Ok(Rs256::new(config, Arc::clone(clock) as Arc<dyn Clock>, fetcher)?)
}

/// Instance fetching keys over real HTTP.
pub fn online(config: Rs256Config, clock: &Arc<FixedClock>) -> Result<Rs256, anyhow::Error> {
    let fetcher: Arc<dyn KeyFetcher> = Arc::new(ReqwestKeyFetcher::new(Duration::from_secs(5))?);
    Ok(Rs256::new(config, Arc::clone(clock) as Arc<dyn Clock>, fetcher)?)
}
