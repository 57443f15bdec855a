//! Middleware integration tests.
//!
//! Spins up a real axum server protected by `require_auth` against a
//! mocked identity provider, then drives it with an HTTP client to check
//! the status codes, headers, and bodies a caller actually sees.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use auth_gate::auth::jwks::JwksClient;
use auth_gate::{require_auth, AuthState, Claims, TokenVerifier};
use auth_gate_test_utils::{TestKeypair, TestTokenBuilder};
use axum::extract::Extension;
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUDIENCE: &str = "org.acme.registry.id-mapper";

async fn me(Extension(claims): Extension<Claims>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "sub": claims.sub,
        "audiences": claims.aud.iter().collect::<Vec<_>>(),
    }))
}

fn build_app(auth_state: Arc<AuthState>) -> Router {
    let protected = Router::new()
        .route("/api/v1/me", get(me))
        .layer(axum::middleware::from_fn_with_state(auth_state, require_auth));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
}

/// A protected service wired against a mocked provider.
struct TestAuthServer {
    addr: SocketAddr,
    _server_handle: JoinHandle<()>,
    keypair: TestKeypair,
    // Kept alive for the duration of the test
    _mock_server: MockServer,
}

impl TestAuthServer {
    async fn spawn() -> Result<Self> {
        let mock_server = MockServer::start().await;
        let keypair = TestKeypair::new(1, "test-key-01");

        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(keypair.jwks_json()))
            .mount(&mock_server)
            .await;

        let jwks_url = format!("{}/certs", mock_server.uri());
        Self::spawn_with_jwks_url(jwks_url, keypair, mock_server).await
    }

    /// Spawn with a broken JWKS endpoint to exercise the 503 path.
    async fn spawn_with_unreachable_provider() -> Result<Self> {
        let mock_server = MockServer::start().await;
        let keypair = TestKeypair::new(1, "test-key-01");
        Self::spawn_with_jwks_url("http://127.0.0.1:1/certs".to_string(), keypair, mock_server)
            .await
    }

    async fn spawn_with_jwks_url(
        jwks_url: String,
        keypair: TestKeypair,
        mock_server: MockServer,
    ) -> Result<Self> {
        let jwks_client = Arc::new(JwksClient::new(
            reqwest::Client::new(),
            jwks_url,
            Duration::from_secs(300),
        ));
        let verifier = Arc::new(TokenVerifier::new(
            jwks_client,
            AUDIENCE.to_string(),
            None,
            Duration::from_secs(60),
        ));
        let auth_state = Arc::new(AuthState { verifier });

        let app = build_app(auth_state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let server_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {e}");
            }
        });

        Ok(Self {
            addr,
            _server_handle: server_handle,
            keypair,
            _mock_server: mock_server,
        })
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn valid_token(&self) -> String {
        self.keypair
            .sign(&TestTokenBuilder::new().with_audience(AUDIENCE).build())
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        self._server_handle.abort();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn me_endpoint_requires_auth() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    assert!(
        response.headers().get("www-authenticate").is_some(),
        "Should include WWW-Authenticate header"
    );
    Ok(())
}

#[tokio::test]
async fn me_endpoint_rejects_non_bearer_scheme() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", "Basic abc123")
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn me_endpoint_rejects_empty_bearer_token() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", "Bearer ")
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn me_endpoint_accepts_valid_token() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", format!("Bearer {}", server.valid_token()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["sub"], "test-subject");
    assert_eq!(body["audiences"], serde_json::json!([AUDIENCE]));
    Ok(())
}

#[tokio::test]
async fn me_endpoint_accepts_sequence_audience_token() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.keypair.sign(
        &TestTokenBuilder::new()
            .with_audiences(&["org.acme.portal", AUDIENCE])
            .build(),
    );

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn audience_mismatch_is_forbidden_not_unauthorized() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.keypair.sign(
        &TestTokenBuilder::new()
            .with_audience("org.acme.global.scheduler")
            .build(),
    );

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await?;

    assert_eq!(response.status(), 403);
    assert!(
        response.headers().get("www-authenticate").is_none(),
        "A well-signed token should not get a challenge"
    );

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn me_endpoint_rejects_expired_token() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.keypair.sign(
        &TestTokenBuilder::new()
            .with_audience(AUDIENCE)
            .expires_in(-3600)
            .build(),
    );

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn me_endpoint_rejects_malformed_token() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn me_endpoint_rejects_oversized_token() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let oversized = "a".repeat(9000);

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", format!("Bearer {oversized}"))
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn me_endpoint_rejects_unknown_kid() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let unknown = TestKeypair::new(2, "unpublished-key");
    let token = unknown.sign(&TestTokenBuilder::new().with_audience(AUDIENCE).build());

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn token_with_alg_none_is_rejected() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let now = chrono::Utc::now().timestamp();
    let header = r#"{"alg":"none","typ":"JWT","kid":"test-key-01"}"#;
    let claims = format!(
        r#"{{"sub":"attacker","exp":{},"iat":{},"aud":"{AUDIENCE}"}}"#,
        now + 3600,
        now
    );

    let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims.as_bytes());
    // alg:none tokens typically carry an empty signature
    let malicious = format!("{header_b64}..{claims_b64}");

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", format!("Bearer {malicious}"))
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn token_with_hs256_signature_is_rejected() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    // Algorithm-confusion attempt: HMAC signature under the published kid
    let now = chrono::Utc::now().timestamp();
    let header = r#"{"alg":"HS256","typ":"JWT","kid":"test-key-01"}"#;
    let claims = format!(
        r#"{{"sub":"attacker","exp":{},"iat":{},"aud":"{AUDIENCE}"}}"#,
        now + 3600,
        now
    );

    let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims.as_bytes());
    let fake_signature = URL_SAFE_NO_PAD.encode(b"fake_hmac_signature_attempt");
    let malicious = format!("{header_b64}.{claims_b64}.{fake_signature}");

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", format!("Bearer {malicious}"))
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn health_endpoint_is_public() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/health", server.url())).send().await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");
    Ok(())
}

#[tokio::test]
async fn auth_error_response_format() -> Result<()> {
    let server = TestAuthServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await?;
    assert!(body["error"]["code"].is_string());
    assert!(body["error"]["message"].is_string());
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    Ok(())
}

#[tokio::test]
async fn provider_outage_maps_to_service_unavailable() -> Result<()> {
    let server = TestAuthServer::spawn_with_unreachable_provider().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/v1/me", server.url()))
        .header("Authorization", format!("Bearer {}", server.valid_token()))
        .send()
        .await?;

    assert_eq!(response.status(), 503);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    Ok(())
}
