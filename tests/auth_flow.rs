//! End-to-end router tests over in-memory fakes.

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use async_trait::async_trait;
use tasca::{
    admission::AdmissionConfig,
    api,
    audit::{RecordingAuditSink, SecurityEventKind},
    directory::{MemoryDirectory, Principal},
    revocation::{MemoryStore, RevocationStore},
    state::AuthState,
    token::{TokenConfig, TokenService},
};

const IP: &str = "203.0.113.7";

struct Harness {
    router: Router,
    store: Arc<MemoryStore>,
    directory: Arc<MemoryDirectory>,
    audit: Arc<RecordingAuditSink>,
    alice: Principal,
}

/// Limits high enough that functional tests never trip a gate.
fn relaxed_limits() -> AdmissionConfig {
    AdmissionConfig::new()
        .with_general_limit(Duration::from_secs(900), 10_000)
        .with_auth_limit(Duration::from_secs(900), 10_000)
        .with_slow_down(10_000, Duration::from_millis(1), Duration::from_millis(1))
}

fn token_service() -> Result<TokenService> {
    Ok(TokenService::new(TokenConfig::new(
        SecretString::from("access-secret".to_string()),
        SecretString::from("refresh-secret".to_string()),
    ))?)
}

fn harness(limits: AdmissionConfig) -> Result<Harness> {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    let audit = Arc::new(RecordingAuditSink::new());

    let alice = Principal {
        id: Uuid::new_v4(),
        email: "alice@example.com".to_string(),
        username: "alice".to_string(),
        is_active: true,
    };
    directory.insert(alice.clone(), "hunter2-hunter2");

    let state = Arc::new(AuthState::new(
        token_service()?,
        store.clone(),
        directory.clone(),
        audit.clone(),
        limits,
    ));

    Ok(Harness {
        router: api::router(state),
        store,
        directory,
        audit,
        alice,
    })
}

fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", IP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_bearer(path: &str, body: &Value, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header("x-forwarded-for", IP)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_from(path: &str, body: &Value, ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, "tasca-tests/1.0")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Direct client: no proxy headers, identified only by its socket address.
fn get_from_peer(path: &str, peer: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .unwrap();
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn get_request(path: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(path)
        .header("x-forwarded-for", IP);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn login(harness: &Harness) -> (String, String) {
    let (status, body) = send(
        &harness.router,
        post_json(
            "/auth/login",
            &json!({"email": "alice@example.com", "password": "hunter2-hunter2"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    let access = body["data"]["accessToken"].as_str().unwrap().to_string();
    let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();
    (access, refresh)
}

#[tokio::test]
async fn register_then_login_and_profile() -> Result<()> {
    let harness = harness(relaxed_limits())?;

    let (status, body) = send(
        &harness.router,
        post_json(
            "/auth/register",
            &json!({
                "email": "bob@example.com",
                "username": "bob",
                "password": "correct-horse-battery",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["user"]["email"], json!("bob@example.com"));
    assert_eq!(body["data"]["user"]["isActive"], json!(true));

    let access = body["data"]["accessToken"].as_str().unwrap();
    let (status, body) = send(&harness.router, get_request("/auth/profile", Some(access))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], json!("bob"));

    // Duplicate registration is rejected.
    let (status, body) = send(
        &harness.router,
        post_json(
            "/auth/register",
            &json!({
                "email": "bob@example.com",
                "username": "bob2",
                "password": "correct-horse-battery",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));

    Ok(())
}

#[tokio::test]
async fn register_validates_payload() -> Result<()> {
    let harness = harness(relaxed_limits())?;

    let (status, _) = send(
        &harness.router,
        post_json(
            "/auth/register",
            &json!({"email": "not-an-email", "username": "x", "password": "long-enough"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &harness.router,
        post_json(
            "/auth/register",
            &json!({"email": "ok@example.com", "username": "x", "password": "short"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn logout_revokes_both_tokens() -> Result<()> {
    let harness = harness(relaxed_limits())?;
    let (access, refresh) = login(&harness).await;

    let (status, _) = send(
        &harness.router,
        post_json_bearer("/auth/logout", &json!({"refreshToken": refresh}), &access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The access token verifies cryptographically but is now blacklisted.
    let (status, body) = send(
        &harness.router,
        get_request("/auth/profile", Some(&access)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("INVALID_TOKEN"));

    // Same for the refresh token.
    let (status, body) = send(
        &harness.router,
        post_json("/auth/refresh", &json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("INVALID_REFRESH_TOKEN"));

    let kinds: Vec<SecurityEventKind> = harness
        .audit
        .events()
        .into_iter()
        .map(|event| event.kind)
        .collect();
    assert!(kinds.contains(&SecurityEventKind::BlacklistedTokenAccess));
    assert!(kinds.contains(&SecurityEventKind::BlacklistedRefreshToken));

    Ok(())
}

#[tokio::test]
async fn refresh_rotates_and_spends_the_old_token() -> Result<()> {
    let harness = harness(relaxed_limits())?;
    let (_, refresh) = login(&harness).await;

    let (status, body) = send(
        &harness.router,
        post_json("/auth/refresh", &json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_access = body["data"]["accessToken"].as_str().unwrap().to_string();
    let new_refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, refresh);

    // The new pair works.
    let (status, _) = send(
        &harness.router,
        get_request("/auth/profile", Some(&new_access)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Replaying the spent refresh token fails.
    let (status, body) = send(
        &harness.router,
        post_json("/auth/refresh", &json!({"refreshToken": refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("INVALID_REFRESH_TOKEN"));

    Ok(())
}

#[tokio::test]
async fn missing_and_malformed_credentials() -> Result<()> {
    let harness = harness(relaxed_limits())?;

    let (status, body) = send(&harness.router, get_request("/auth/profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("MISSING_TOKEN"));
    assert_eq!(body["success"], json!(false));

    let (status, body) = send(
        &harness.router,
        get_request("/auth/profile", Some("not-a-jwt")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("INVALID_TOKEN"));

    let (status, body) = send(&harness.router, post_json("/auth/refresh", &json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("MISSING_REFRESH_TOKEN"));

    // An access token presented as a refresh token fails verification under
    // the refresh key.
    let (access, _) = login(&harness).await;
    let (status, body) = send(
        &harness.router,
        post_json("/auth/refresh", &json!({"refreshToken": access})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("INVALID_REFRESH_TOKEN"));

    Ok(())
}

#[tokio::test]
async fn disabled_and_unknown_principals() -> Result<()> {
    let harness = harness(relaxed_limits())?;
    let (access, _) = login(&harness).await;

    harness.directory.set_active(harness.alice.id, false);
    let (status, body) = send(
        &harness.router,
        get_request("/auth/profile", Some(&access)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("ACCOUNT_DISABLED"));

    // A valid signature over a subject the directory does not know.
    let orphan = token_service()?.issue_access(Uuid::new_v4())?;
    let (status, body) = send(
        &harness.router,
        get_request("/auth/profile", Some(&orphan)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!("USER_NOT_FOUND"));

    Ok(())
}

#[tokio::test]
async fn general_rate_limit_trips_and_spares_diagnostics() -> Result<()> {
    let limits = relaxed_limits().with_general_limit(Duration::from_secs(900), 3);
    let harness = harness(limits)?;

    for _ in 0..3 {
        let (status, _) = send(&harness.router, get_request("/", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&harness.router, get_request("/", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], json!("RATE_LIMIT_EXCEEDED"));
    assert_eq!(body["retryAfter"], json!(15));
    assert_eq!(body["success"], json!(false));

    // Allowlisted paths keep answering.
    let (status, _) = send(&harness.router, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);

    let kinds: Vec<SecurityEventKind> = harness
        .audit
        .events()
        .into_iter()
        .map(|event| event.kind)
        .collect();
    assert!(kinds.contains(&SecurityEventKind::RateLimitExceeded));

    Ok(())
}

#[tokio::test]
async fn auth_rate_limit_is_stricter() -> Result<()> {
    let limits = relaxed_limits().with_auth_limit(Duration::from_secs(900), 2);
    let harness = harness(limits)?;

    for _ in 0..2 {
        let (status, _) = send(
            &harness.router,
            post_json(
                "/auth/login",
                &json!({"email": "alice@example.com", "password": "wrong"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = send(
        &harness.router,
        post_json(
            "/auth/login",
            &json!({"email": "alice@example.com", "password": "wrong"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], json!("AUTH_RATE_LIMIT_EXCEEDED"));
    assert_eq!(body["retryAfter"], json!(15));

    // Non-auth traffic is unaffected.
    let (status, _) = send(&harness.router, get_request("/", None)).await;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn lockout_after_repeated_failures_then_recovery() -> Result<()> {
    let limits = relaxed_limits().with_lockout(
        5,
        Duration::from_secs(300),
        Duration::from_secs(3600),
        Duration::from_secs(86400),
    );
    let harness = harness(limits)?;

    for _ in 0..5 {
        let (status, body) = send(
            &harness.router,
            post_json(
                "/auth/login",
                &json!({"email": "alice@example.com", "password": "wrong"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "body: {body}");
    }

    // The sixth request is rejected before credentials are even checked.
    let (status, body) = send(
        &harness.router,
        post_json(
            "/auth/login",
            &json!({"email": "alice@example.com", "password": "hunter2-hunter2"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], json!("BRUTE_FORCE_DETECTED"));
    assert!(body["nextValidRequest"].is_string());

    let kinds: Vec<SecurityEventKind> = harness
        .audit
        .events()
        .into_iter()
        .map(|event| event.kind)
        .collect();
    assert!(kinds.contains(&SecurityEventKind::BruteForceDetected));

    // Once the wait elapses, a correct login succeeds and consumes the record.
    harness.store.advance(Duration::from_secs(301));
    let (status, _) = send(
        &harness.router,
        post_json(
            "/auth/login",
            &json!({"email": "alice@example.com", "password": "hunter2-hunter2"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // And the failure history is gone: one bad attempt does not re-lock.
    let (status, _) = send(
        &harness.router,
        post_json(
            "/auth/login",
            &json!({"email": "alice@example.com", "password": "wrong"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        &harness.router,
        post_json(
            "/auth/login",
            &json!({"email": "alice@example.com", "password": "hunter2-hunter2"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn headerless_clients_are_limited_per_peer() -> Result<()> {
    let limits = relaxed_limits().with_general_limit(Duration::from_secs(900), 1);
    let harness = harness(limits)?;

    let (status, _) = send(&harness.router, get_from_peer("/", "192.0.2.10:40001")).await;
    assert_eq!(status, StatusCode::OK);

    // A different peer gets its own bucket.
    let (status, _) = send(&harness.router, get_from_peer("/", "192.0.2.11:40002")).await;
    assert_eq!(status, StatusCode::OK);

    // Same peer on a new source port still counts against its address.
    let (status, body) = send(&harness.router, get_from_peer("/", "192.0.2.10:40003")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], json!("RATE_LIMIT_EXCEEDED"));

    Ok(())
}

#[tokio::test]
async fn lockout_follows_the_account_across_addresses() -> Result<()> {
    let limits = relaxed_limits().with_lockout(
        5,
        Duration::from_secs(300),
        Duration::from_secs(3600),
        Duration::from_secs(86400),
    );
    let harness = harness(limits)?;

    // Five failures against one account, each from a different forwarded
    // address, so no single per-IP counter ever reaches the threshold.
    for octet in 1..=5 {
        let (status, _) = send(
            &harness.router,
            post_json_from(
                "/auth/login",
                &json!({"email": "alice@example.com", "password": "wrong"}),
                &format!("198.51.100.{octet}"),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // A fresh address does not help: the lock keys on the credential.
    let (status, body) = send(
        &harness.router,
        post_json_from(
            "/auth/login",
            &json!({"email": "alice@example.com", "password": "hunter2-hunter2"}),
            "198.51.100.6",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], json!("BRUTE_FORCE_DETECTED"));

    let event = harness
        .audit
        .events()
        .into_iter()
        .find(|event| event.kind == SecurityEventKind::BruteForceDetected)
        .expect("lockout event");
    assert_eq!(event.user_agent.as_deref(), Some("tasca-tests/1.0"));

    Ok(())
}

/// Store double simulating a full Redis outage.
struct OutageStore;

#[async_trait]
impl RevocationStore for OutageStore {
    async fn blacklist(&self, _token: &str, _ttl_seconds: i64) {}
    async fn is_blacklisted(&self, _token: &str) -> bool {
        false
    }
    async fn increment(&self, _key: &str, _window: Duration) -> i64 {
        0
    }
    async fn get(&self, _key: &str) -> Option<i64> {
        None
    }
    async fn set(&self, _key: &str, _value: i64, _ttl: Duration) {}
    async fn delete(&self, _key: &str) {}
    async fn expire(&self, _key: &str, _ttl: Duration) {}
    async fn ping(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn store_outage_fails_open() -> Result<()> {
    let directory = Arc::new(MemoryDirectory::new());
    let alice = Principal {
        id: Uuid::new_v4(),
        email: "alice@example.com".to_string(),
        username: "alice".to_string(),
        is_active: true,
    };
    directory.insert(alice.clone(), "hunter2-hunter2");

    let state = Arc::new(AuthState::new(
        token_service()?,
        Arc::new(OutageStore),
        directory,
        Arc::new(RecordingAuditSink::new()),
        // Tight limits that would trip instantly if counters worked.
        AdmissionConfig::new().with_general_limit(Duration::from_secs(900), 1),
    ));
    let router = api::router(state);

    // Counters degrade to zero, so nothing rate-limits.
    for _ in 0..5 {
        let (status, _) = send(&router, get_request("/", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    // Login and session verification still work without the store.
    let (status, body) = send(
        &router,
        post_json(
            "/auth/login",
            &json!({"email": "alice@example.com", "password": "hunter2-hunter2"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["data"]["accessToken"].as_str().unwrap().to_string();

    let (status, _) = send(&router, get_request("/auth/profile", Some(&access))).await;
    assert_eq!(status, StatusCode::OK);

    // Logout cannot persist the revocation, but the request itself succeeds.
    let (status, _) = send(
        &router,
        post_json_bearer("/auth/logout", &json!({}), &access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], json!("down"));

    Ok(())
}

#[tokio::test]
async fn optional_session_passes_through_silently() -> Result<()> {
    let harness = harness(relaxed_limits())?;

    // Anonymous, garbage, and authenticated requests all reach the handler.
    let (status, _) = send(&harness.router, get_request("/", None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&harness.router, get_request("/", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::OK);

    let (access, _) = login(&harness).await;
    let response = harness
        .router
        .clone()
        .oneshot(get_request("/", Some(&access)))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let text = String::from_utf8(bytes.to_vec())?;
    assert!(text.contains("alice"), "got: {text}");

    Ok(())
}

#[tokio::test]
async fn responses_carry_a_request_id() -> Result<()> {
    let harness = harness(relaxed_limits())?;

    let response = harness
        .router
        .clone()
        .oneshot(get_request("/health", None))
        .await?;
    assert!(response.headers().contains_key("x-request-id"));

    Ok(())
}

#[tokio::test]
async fn health_reports_build_metadata() -> Result<()> {
    let harness = harness(relaxed_limits())?;

    let (status, body) = send(&harness.router, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], json!("tasca"));
    assert_eq!(body["store"], json!("up"));
    assert!(body["version"].is_string());

    Ok(())
}
