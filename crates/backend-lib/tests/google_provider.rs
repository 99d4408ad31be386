//! Google ID-token verification against a local JWKS endpoint.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use backend_lib::auth::{
    AuthService, BcryptHasher, GoogleIdentityProvider, IdentityError, IdentityProvider,
    TokenCodec,
};
use backend_lib::directory::MemoryDirectory;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

const CLIENT_ID: &str = "client-123.apps.googleusercontent.com";
const KID: &str = "test-key-1";
const TEST_KEY_PEM: &[u8] = include_bytes!("fixtures/google_test_key.pem");
// Public half of the fixture key
const TEST_KEY_N: &str = "6t0P08mB0dxDd250dgyb1zFCLdKZF8GxBzHgianJ88mPage8NR1nti723oJCbKhaUPv6g0D9x2OZa8fmugSBatpUxHU5SwUtbD9G_OfvNlkB_IfClSTHw9BOYatnNyBcxNjRL7nHO21lrF5vKHgNo8jVXTUqYq1-NcH0RfxpwdEdKwQaJL5wR5zlEj24sIXaXr8l_wGFI4XsdEZ5AY6d-_jFse7TbwWMr7TJqkbNb-8r9hMTNjRPlYgVdJunmKVts1xZSgIRdKf6VQIKo9xU0jKW3nJNbwW4tzXn_oJPWFiuhlH__bICB0jn1o9vMjhjYWPodAJw9bOoU9aAzSI9MQ";
const TEST_KEY_E: &str = "AQAB";

/// Serve a JWKS document on an ephemeral port, counting fetches
async fn spawn_jwks_server() -> (String, Arc<AtomicUsize>) {
    let fetches = Arc::new(AtomicUsize::new(0));
    let counter = fetches.clone();
    let app = Router::new().route(
        "/certs",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "keys": [
                        { "kid": "ec-key", "kty": "EC", "crv": "P-256", "x": "AA", "y": "AA" },
                        {
                            "kid": KID,
                            "kty": "RSA",
                            "alg": "RS256",
                            "use": "sig",
                            "n": TEST_KEY_N,
                            "e": TEST_KEY_E
                        }
                    ]
                }))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/certs"), fetches)
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn sign(kid: &str, claims: serde_json::Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM).unwrap();
    encode(&header, &claims, &key).unwrap()
}

fn google_claims() -> serde_json::Value {
    json!({
        "iss": "https://accounts.google.com",
        "aud": CLIENT_ID,
        "sub": "109876543210",
        "email": "gina@example.com",
        "email_verified": true,
        "name": "Gina G",
        "picture": "https://lh3.googleusercontent.com/gina",
        "iat": now(),
        "exp": now() + 3600,
    })
}

#[tokio::test]
async fn test_valid_token_verified_and_keys_cached() {
    let (url, fetches) = spawn_jwks_server().await;
    let provider = GoogleIdentityProvider::with_certs_url(url);
    let token = sign(KID, google_claims());

    let claims = provider.verify_id_token(&token, CLIENT_ID).await.unwrap();
    assert_eq!(claims.subject, "109876543210");
    assert_eq!(claims.email.as_deref(), Some("gina@example.com"));
    assert_eq!(claims.name.as_deref(), Some("Gina G"));
    assert_eq!(
        claims.picture.as_deref(),
        Some("https://lh3.googleusercontent.com/gina")
    );

    provider.verify_id_token(&token, CLIENT_ID).await.unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_short_issuer_form_accepted() {
    let (url, _) = spawn_jwks_server().await;
    let provider = GoogleIdentityProvider::with_certs_url(url);
    let mut claims = google_claims();
    claims["iss"] = json!("accounts.google.com");

    assert!(provider
        .verify_id_token(&sign(KID, claims), CLIENT_ID)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_rejections() {
    let (url, _) = spawn_jwks_server().await;
    let provider = GoogleIdentityProvider::with_certs_url(url);

    let mut wrong_audience = google_claims();
    wrong_audience["aud"] = json!("someone-else");

    let mut expired = google_claims();
    expired["exp"] = json!(now() - 3600);

    let mut wrong_issuer = google_claims();
    wrong_issuer["iss"] = json!("https://evil.example.com");

    for claims in [wrong_audience, expired, wrong_issuer] {
        let err = provider
            .verify_id_token(&sign(KID, claims), CLIENT_ID)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)), "{err:?}");
    }
}

#[tokio::test]
async fn test_unknown_key_refetches_once() {
    let (url, fetches) = spawn_jwks_server().await;
    let provider = GoogleIdentityProvider::with_certs_url(url);

    let err = provider
        .verify_id_token(&sign("rotated-away", google_claims()), CLIENT_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::UnknownKey(ref kid) if kid == "rotated-away"));
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    // A known key is then served from the cache
    provider
        .verify_id_token(&sign(KID, google_claims()), CLIENT_ID)
        .await
        .unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tampered_signature_rejected() {
    let (url, _) = spawn_jwks_server().await;
    let provider = GoogleIdentityProvider::with_certs_url(url);

    let token = sign(KID, google_claims());
    let forged_payload = {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
        let mut claims = google_claims();
        claims["sub"] = json!("someone-else");
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap())
    };
    let mut parts: Vec<&str> = token.split('.').collect();
    parts[1] = &forged_payload;

    let err = provider
        .verify_id_token(&parts.join("."), CLIENT_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidToken(_)));
}

#[tokio::test]
async fn test_service_signs_in_google_user_end_to_end() {
    let (url, _) = spawn_jwks_server().await;
    let directory = Arc::new(MemoryDirectory::new());
    let auth = AuthService::new(
        directory.clone(),
        Arc::new(BcryptHasher::new(4)),
        TokenCodec::new("end-to-end-test-secret").unwrap(),
    )
    .with_identity_provider(Arc::new(GoogleIdentityProvider::with_certs_url(url)), CLIENT_ID);

    let token = sign(KID, google_claims());
    let user = auth.verify_google_token(&token).await.unwrap();
    assert_eq!(user.fullname, "Gina G");
    assert_eq!(user.email.as_deref(), Some("gina@example.com"));

    let again = auth.verify_google_token(&token).await.unwrap();
    assert_eq!(again.id, user.id);
    assert_eq!(directory.len().await, 1);

    let login_token = auth.get_login_token(&user).unwrap();
    assert_eq!(auth.validate_token(&login_token).unwrap().id, user.id);
}
