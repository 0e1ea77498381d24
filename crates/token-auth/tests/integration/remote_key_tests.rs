//! Remote key resolution over HTTP.
//!
//! These tests run a `wiremock` key server and verify through the real
//! `reqwest` fetcher.

use crate::common::{fixed_clock, offline, online, remote_config};
use token_auth::keys::cache_key;
use token_auth::{Claims, JwtError, KeyResolutionError, Rs256Config};
use token_auth_test_utils::{
    test_rsa_key_pair, TestKeyServer, TestTokenBuilder, TEST_AUDIENCE, TEST_ISSUER, TEST_KEY_ID_1,
    TEST_KEY_ID_2, TEST_KEY_ID_UNKNOWN, TEST_NOW, TEST_RSA_PUBLIC_PKCS1_PEM_1,
};

#[tokio::test]
async fn test_fetched_key_verifies_and_is_cached() -> Result<(), anyhow::Error> {
    let keys = test_rsa_key_pair(1);
    let server = TestKeyServer::start(&[(TEST_KEY_ID_1, keys.public_pem)]).await;
    let clock = fixed_clock();
    let rs256 = online(remote_config(&server.url()), &clock)?;

    let signed = rs256.sign(Claims::new().with("user_id", 42))?;
    rs256.parse(&signed.token, false).await?;

    assert_eq!(server.request_count().await, 1);
    assert!(rs256
        .key_cache()
        .contains(&cache_key(&server.url(), TEST_KEY_ID_1)));

    // Served from cache from now on
    for _ in 0..3 {
        rs256.parse(&signed.token, false).await?;
    }
    assert_eq!(server.request_count().await, 1);

    Ok(())
}

#[tokio::test]
async fn test_pkcs1_public_key_accepted() -> Result<(), anyhow::Error> {
    let server = TestKeyServer::start(&[(TEST_KEY_ID_1, TEST_RSA_PUBLIC_PKCS1_PEM_1)]).await;
    let clock = fixed_clock();
    let rs256 = online(remote_config(&server.url()), &clock)?;

    let signed = rs256.sign(Claims::new())?;
    rs256.parse(&signed.token, false).await?;

    Ok(())
}

#[tokio::test]
async fn test_selects_key_by_kid() -> Result<(), anyhow::Error> {
    let first = test_rsa_key_pair(1);
    let second = test_rsa_key_pair(2);
    let server = TestKeyServer::start(&[
        (TEST_KEY_ID_1, first.public_pem),
        (TEST_KEY_ID_2, second.public_pem),
    ])
    .await;
    let clock = fixed_clock();
    let rs256 = online(remote_config(&server.url()), &clock)?;

    let token = TestTokenBuilder::issued_at_time(TEST_NOW)
        .with_kid(TEST_KEY_ID_2)
        .sign_rs256(second.private_pem);
    let verified = rs256.parse(&token, false).await?;
    assert_eq!(verified.key_id.as_deref(), Some(TEST_KEY_ID_2));

    // Key 2's kid with key 1's signature
    let token = TestTokenBuilder::issued_at_time(TEST_NOW)
        .with_kid(TEST_KEY_ID_2)
        .sign_rs256(first.private_pem);
    assert_eq!(rs256.parse(&token, false).await.unwrap_err(), JwtError::SignatureInvalid);

    Ok(())
}

#[tokio::test]
async fn test_non_200_response_is_key_not_found() -> Result<(), anyhow::Error> {
    let server = TestKeyServer::start_with_status(500).await;
    let clock = fixed_clock();
    let rs256 = online(remote_config(&server.url()), &clock)?;

    let signed = rs256.sign(Claims::new())?;
    let err = rs256.parse(&signed.token, false).await.unwrap_err();

    assert_eq!(
        err,
        JwtError::KeyResolution(KeyResolutionError::KeyNotFound {
            kid: TEST_KEY_ID_1.to_string(),
            status: Some(500),
        })
    );
    assert!(err.is_transient());
    assert!(rs256.key_cache().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unknown_kid_is_not_cached() -> Result<(), anyhow::Error> {
    let keys = test_rsa_key_pair(1);
    let server = TestKeyServer::start(&[(TEST_KEY_ID_1, keys.public_pem)]).await;
    let clock = fixed_clock();
    let rs256 = online(remote_config(&server.url()), &clock)?;

    let token = TestTokenBuilder::issued_at_time(TEST_NOW)
        .with_kid(TEST_KEY_ID_UNKNOWN)
        .sign_rs256(keys.private_pem);

    for _ in 0..2 {
        let err = rs256.parse(&token, false).await.unwrap_err();
        assert!(matches!(
            err,
            JwtError::KeyResolution(KeyResolutionError::KeyNotFound { status: None, .. })
        ));
    }

    // Every attempt goes back to the network
    assert_eq!(server.request_count().await, 2);
    assert!(rs256.key_cache().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_key_published_after_miss_is_picked_up() -> Result<(), anyhow::Error> {
    let keys = test_rsa_key_pair(1);
    let server = TestKeyServer::start(&[]).await;
    let clock = fixed_clock();
    let rs256 = online(remote_config(&server.url()), &clock)?;
    let signed = rs256.sign(Claims::new())?;

    assert!(rs256.parse(&signed.token, false).await.is_err());

    server.serve_keys(&[(TEST_KEY_ID_1, keys.public_pem)]).await;
    rs256.parse(&signed.token, false).await?;

    Ok(())
}

#[tokio::test]
async fn test_invalid_document_is_invalid_response() -> Result<(), anyhow::Error> {
    let server = TestKeyServer::start_with_body("<html>not json</html>").await;
    let clock = fixed_clock();
    let rs256 = online(remote_config(&server.url()), &clock)?;

    let signed = rs256.sign(Claims::new())?;
    assert!(matches!(
        rs256.parse(&signed.token, false).await,
        Err(JwtError::KeyResolution(KeyResolutionError::InvalidResponse(_)))
    ));

    Ok(())
}

#[tokio::test]
async fn test_unparseable_served_key_is_invalid_key() -> Result<(), anyhow::Error> {
    let server = TestKeyServer::start(&[(TEST_KEY_ID_1, "not a pem document")]).await;
    let clock = fixed_clock();
    let rs256 = online(remote_config(&server.url()), &clock)?;

    let signed = rs256.sign(Claims::new())?;
    assert!(matches!(
        rs256.parse(&signed.token, false).await,
        Err(JwtError::KeyResolution(KeyResolutionError::InvalidKey { .. }))
    ));
    assert!(rs256.key_cache().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_bad_cached_entry_self_heals() -> Result<(), anyhow::Error> {
    let keys = test_rsa_key_pair(1);
    let server = TestKeyServer::start(&[(TEST_KEY_ID_1, keys.public_pem)]).await;
    let clock = fixed_clock();
    let rs256 = online(remote_config(&server.url()), &clock)?;
    let key = cache_key(&server.url(), TEST_KEY_ID_1);

    rs256.key_cache().insert(key.clone(), b"corrupted".to_vec());

    let signed = rs256.sign(Claims::new())?;
    rs256.parse(&signed.token, false).await?;

    assert_eq!(server.request_count().await, 1);
    assert_eq!(
        rs256.key_cache().get(&key).as_deref(),
        Some(keys.public_pem.as_bytes())
    );

    Ok(())
}

#[tokio::test]
async fn test_missing_kid_with_remote_keys() -> Result<(), anyhow::Error> {
    let keys = test_rsa_key_pair(1);
    let server = TestKeyServer::start(&[(TEST_KEY_ID_1, keys.public_pem)]).await;
    let clock = fixed_clock();
    let rs256 = online(remote_config(&server.url()), &clock)?;

    let token = TestTokenBuilder::issued_at_time(TEST_NOW)
        .without_header("kid")
        .sign_rs256(keys.private_pem);
    assert_eq!(
        rs256.parse(&token, false).await.unwrap_err(),
        JwtError::KeyResolution(KeyResolutionError::MissingKeyId)
    );

    // An empty kid counts as missing
    let token = TestTokenBuilder::issued_at_time(TEST_NOW)
        .with_kid("")
        .sign_rs256(keys.private_pem);
    assert_eq!(
        rs256.parse(&token, false).await.unwrap_err(),
        JwtError::KeyResolution(KeyResolutionError::MissingKeyId)
    );
    assert_eq!(server.request_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_static_key_wins_over_endpoint() -> Result<(), anyhow::Error> {
    let keys = test_rsa_key_pair(1);
    let server = TestKeyServer::start(&[(TEST_KEY_ID_1, test_rsa_key_pair(2).public_pem)]).await;
    let clock = fixed_clock();
    let rs256 = online(
        remote_config(&server.url()).with_public_key_pem(keys.public_pem),
        &clock,
    )?;

    let signed = rs256.sign(Claims::new())?;
    rs256.parse(&signed.token, false).await?;

    assert_eq!(server.request_count().await, 0);
    assert!(rs256.key_cache().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_no_key_source_is_configuration_error() -> Result<(), anyhow::Error> {
    let keys = test_rsa_key_pair(1);
    let clock = fixed_clock();
    let rs256 = offline(
        Rs256Config::new(TEST_KEY_ID_1, TEST_ISSUER, TEST_AUDIENCE).with_private_key_pem(keys.private_pem),
        &clock,
    )?;

    let signed = rs256.sign(Claims::new())?;
    assert!(matches!(
        rs256.parse(&signed.token, false).await,
        Err(JwtError::Configuration(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() -> Result<(), anyhow::Error> {
    // Nothing listens on the TCP port multiplexer port
    let clock = fixed_clock();
    let rs256 = online(remote_config("http://127.0.0.1:1/keys"), &clock)?;

    let signed = rs256.sign(Claims::new())?;
    let err = rs256.parse(&signed.token, false).await.unwrap_err();
    assert!(matches!(
        err,
        JwtError::KeyResolution(KeyResolutionError::Transport(_))
    ));
    assert!(err.is_transient());

    Ok(())
}
