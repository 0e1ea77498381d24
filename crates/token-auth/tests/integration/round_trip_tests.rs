//! Sign-then-parse round trips through the public API.

use crate::common::{fixed_clock, offline, static_config};
use std::time::Duration;
use token_auth::claims::{AUDIENCE, AUTH_TIME, EXPIRES_AT, ISSUED_AT, ISSUER};
use token_auth::{ClaimValue, Claims, Rs256Config};
use token_auth_test_utils::{
    test_rsa_key_pair, TokenAssertions, TEST_KEY_ID_1, TEST_MAX_AGE_SECONDS, TEST_NOW,
};

/// Issuer `svc-a`, audience `svc-b`, max age one hour, payload `user_id = 42`.
#[tokio::test]
async fn test_service_token_scenario() -> Result<(), anyhow::Error> {
    let clock = fixed_clock();
    let keys = test_rsa_key_pair(1);
    let config = Rs256Config::new("svc-a-key", "svc-a", "svc-b")
        .with_max_age(Duration::from_secs(3600))
        .with_private_key_pem(keys.private_pem)
        .with_public_key_pem(keys.public_pem);
    let rs256 = offline(config, &clock)?;

    let signed = rs256.sign(Claims::new().with("user_id", 42))?;
    let verified = rs256.parse(&signed.token, false).await?;

    assert_eq!(verified.claims.get("user_id").and_then(ClaimValue::as_i64), Some(42));
    assert_eq!(verified.claims.issuer(), Some("svc-a"));
    assert_eq!(verified.claims.audience(), Some("svc-b"));
    let iat = verified.claims.timestamp(ISSUED_AT)?.unwrap_or_default();
    let exp = verified.claims.timestamp(EXPIRES_AT)?.unwrap_or_default();
    assert_eq!(exp - iat, 3600);
    assert_eq!(verified.expiry.timestamp(), TEST_NOW + 3600);
    assert_eq!(verified.key_id.as_deref(), Some("svc-a-key"));

    Ok(())
}

#[tokio::test]
async fn test_round_trip_preserves_application_claims() -> Result<(), anyhow::Error> {
    let clock = fixed_clock();
    let rs256 = offline(static_config(), &clock)?;

    let payload = Claims::new()
        .with("sub", "user-123")
        .with("admin", true)
        .with("score", 9.5)
        .with("roles", serde_json::json!(["reader", "writer"]))
        .with("profile", serde_json::json!({"region": "eu", "tier": 2}))
        .with("nothing", serde_json::Value::Null);

    let signed = rs256.sign(payload.clone())?;
    let (claims, expiry) = rs256.parse(&signed.token, false).await?.into_parts();

    for (name, value) in payload.iter() {
        assert_eq!(claims.get(name), Some(value), "claim {name} changed in transit");
    }
    assert_eq!(expiry, signed.expiry);

    Ok(())
}

#[tokio::test]
async fn test_signed_token_wire_format() -> Result<(), anyhow::Error> {
    let clock = fixed_clock();
    let rs256 = offline(static_config(), &clock)?;

    let signed = rs256.sign(Claims::new().with(ISSUER, "someone-else"))?;

    signed
        .token
        .assert_header("alg", "RS256")
        .assert_header("typ", "JWT")
        .assert_header("kid", TEST_KEY_ID_1)
        .assert_claim(ISSUER, "svc-a")
        .assert_claim(AUDIENCE, "svc-b")
        .assert_claim(AUTH_TIME, TEST_NOW)
        .assert_claim(ISSUED_AT, TEST_NOW)
        .assert_claim(EXPIRES_AT, TEST_NOW + TEST_MAX_AGE_SECONDS)
        .assert_no_claim("nbf");
    assert_eq!(signed.token.split('.').count(), 3);
    assert!(!signed.token.contains('='), "segments must be unpadded");

    Ok(())
}

#[tokio::test]
async fn test_custom_max_age() -> Result<(), anyhow::Error> {
    let clock = fixed_clock();
    let rs256 = offline(static_config().with_max_age(Duration::from_secs(90)), &clock)?;

    let signed = rs256.sign(Claims::new())?;
    assert_eq!(signed.expiry.timestamp(), TEST_NOW + 90);

    clock.advance(89);
    assert!(rs256.parse(&signed.token, false).await.is_ok());

    clock.advance(1);
    let err = rs256.parse(&signed.token, false).await.unwrap_err();
    assert!(err.is_expired());

    Ok(())
}

#[tokio::test]
async fn test_verifier_without_private_key_accepts_signer_tokens() -> Result<(), anyhow::Error> {
    let clock = fixed_clock();
    let signer = offline(static_config(), &clock)?;
    let keys = test_rsa_key_pair(1);
    let verifier = offline(
        Rs256Config::new(TEST_KEY_ID_1, "svc-a", "svc-b").with_public_key_pem(keys.public_pem),
        &clock,
    )?;

    let signed = signer.sign(Claims::new().with("user_id", 7))?;
    let verified = verifier.parse(&signed.token, false).await?;
    assert_eq!(verified.claims.get("user_id"), Some(&ClaimValue::Integer(7)));

    Ok(())
}

#[tokio::test]
async fn test_system_clock_round_trip() -> Result<(), anyhow::Error> {
    let rs256 = token_auth::Rs256::from_config(static_config())?;

    let signed = rs256.sign(Claims::new())?;
    let verified = rs256.parse(&signed.token, false).await?;
    assert_eq!(verified.expiry, signed.expiry);
    assert!(!verified.expired);

    Ok(())
}
