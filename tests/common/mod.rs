#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Once, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use campus_api_rust::app::app;
use campus_api_rust::auth::credentials::hash_password;
use campus_api_rust::auth::role::Role;
use campus_api_rust::directory::{MemoryDirectory, SubjectProfile};
use campus_api_rust::session::memory::MemorySessionStore;
use campus_api_rust::state::AppState;

// Seeded fixtures shared by the router tests
pub const SCHOOL_ONE: &str = "SCH0001";
pub const SCHOOL_TWO: &str = "SCH0002";
pub const ADMIN_ONE: &str = "admin@one.school";
pub const TEACHER_ONE: &str = "teacher@one.school";
pub const PARENT_ONE: &str = "parent@one.school";
pub const ADMIN_TWO: &str = "admin@two.school";
pub const OPERATOR: &str = "ops@campus.example";
pub const PASSWORD: &str = "correct-horse-battery";
pub const OPERATOR_PASSWORD: &str = "operator-battery";

static ENV_SETUP: Once = Once::new();

/// Point the config singleton at test-friendly settings before anything
/// touches it. Must run before the first `config::config()` call in the
/// test binary, so every helper below goes through here.
pub fn setup_env() {
    ENV_SETUP.call_once(|| {
        std::env::set_var("APP_ENV", "development");
        std::env::set_var("SESSION_BACKEND", "memory");
        std::env::set_var("PLATFORM_OPERATOR_EMAIL", OPERATOR);
        std::env::set_var(
            "PLATFORM_OPERATOR_PASSWORD_HASH",
            hash_password(OPERATOR_PASSWORD),
        );
    });
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemorySessionStore>,
    pub directory: Arc<MemoryDirectory>,
}

fn subject(school: &str, email: &str, role: Role) -> SubjectProfile {
    SubjectProfile {
        id: Uuid::new_v4(),
        role,
        school_id: school.to_string(),
        email: email.to_string(),
        name: None,
        password_hash: hash_password(PASSWORD),
        active: true,
    }
}

/// Router wired to in-memory store and directory, seeded with two schools
/// and a spread of roles.
pub async fn test_app() -> TestApp {
    setup_env();
    let cfg = campus_api_rust::config::config();

    let store = Arc::new(MemorySessionStore::new());
    let directory = Arc::new(MemoryDirectory::new());

    directory.add_school(SCHOOL_ONE).await;
    directory.add_school(SCHOOL_TWO).await;
    directory
        .add_subject(subject(SCHOOL_ONE, ADMIN_ONE, Role::SchoolAdmin))
        .await;
    directory
        .add_subject(subject(SCHOOL_ONE, TEACHER_ONE, Role::Teacher))
        .await;
    directory
        .add_subject(subject(SCHOOL_ONE, PARENT_ONE, Role::Parent))
        .await;
    directory
        .add_subject(subject(SCHOOL_TWO, ADMIN_TWO, Role::SchoolAdmin))
        .await;

    let state = AppState::assemble(cfg, store.clone(), directory.clone());
    TestApp {
        app: app(state.clone()),
        state,
        store,
        directory,
    }
}

/// One request through the router; returns status, parsed JSON body (or
/// Null) and response headers.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value, HeaderMap) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router never errors");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value, headers)
}

/// Log a seeded tenant user in; returns the response data plus the
/// `name=value` cookie pair from Set-Cookie.
pub async fn login(
    app: &Router,
    school: &str,
    email: &str,
    password: &str,
) -> (Value, Option<String>) {
    let (status, body, headers) = send(
        app,
        "POST",
        "/auth/login",
        &[],
        Some(json!({ "school_id": school, "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    (body["data"].clone(), cookie_pair(&headers))
}

pub async fn platform_login(app: &Router) -> (Value, Option<String>) {
    let (status, body, headers) = send(
        app,
        "POST",
        "/auth/platform/login",
        &[],
        Some(json!({ "email": OPERATOR, "password": OPERATOR_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "platform login failed: {}", body);

    (body["data"].clone(), cookie_pair(&headers))
}

/// First Set-Cookie header reduced to its `name=value` pair.
pub fn cookie_pair(headers: &HeaderMap) -> Option<String> {
    headers
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Whether the response carries a cookie-clearing Set-Cookie.
pub fn clears_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("campus_session=;") && v.contains("Max-Age=0"))
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

// ---------------------------------------------------------------------
// Spawned-binary harness for the smoke test

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        let mut cmd = Command::new("target/debug/campus-api-rust");
        cmd.env("CAMPUS_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("SESSION_BACKEND", "memory")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
