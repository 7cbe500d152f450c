#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use lawdesk::auth::{Role, TokenIssuer};
use lawdesk::backend::{Backend, MemoryBackend, NewUser, Table};
use lawdesk::config::AppConfig;
use lawdesk::models::{self, Case, CaseStatus};
use lawdesk::{router, AppState};

pub const PASSWORD: &str = "password1";

/// The router driven in-process over a fresh memory backend.
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    /// `name=value` of the Set-Cookie header, ready to send back.
    pub fn cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }

    pub fn notices(&self) -> Vec<String> {
        self.body["notices"]
            .as_array()
            .map(|n| n.iter().filter_map(|n| n["message"].as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::development())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let tokens = TokenIssuer::new("integration-test-secret", 1).expect("token issuer");
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new(tokens));
        let state = AppState::new(config, backend);
        Self { router: router(state.clone()), state }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.state.backend.as_ref()
    }

    pub async fn create_user(&self, email: &str, name: &str, role: Role) -> Uuid {
        self.backend()
            .admin_create_user(NewUser {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                full_name: name.to_string(),
                role,
            })
            .await
            .expect("create user")
            .id
    }

    /// Signs in over HTTP with the shared test password and returns the
    /// bearer token.
    pub async fn sign_in(&self, email: &str) -> String {
        self.sign_in_with(email, PASSWORD).await
    }

    pub async fn sign_in_with(&self, email: &str, password: &str) -> String {
        let res = self
            .request(Method::POST, "/auth/sign-in", None, Some(serde_json::json!({ "email": email, "password": password })))
            .await;
        assert_eq!(res.status, StatusCode::SEE_OTHER, "sign-in failed: {}", res.body);
        res.body["data"]["access_token"].as_str().expect("token in body").to_string()
    }

    pub async fn user_with_token(&self, email: &str, name: &str, role: Role) -> (Uuid, String) {
        let id = self.create_user(email, name, role).await;
        (id, self.sign_in(email).await)
    }

    pub async fn insert_case(&self, title: &str, client: Uuid, lawyer: Option<Uuid>, status: CaseStatus, hearing: Option<NaiveDate>) -> Case {
        let case = Case {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            client_id: client,
            lawyer_id: lawyer,
            case_status: status,
            next_hearing_date: hearing,
            created_at: Utc::now(),
        };
        self.backend()
            .insert(Table::Cases, models::to_row(&case).expect("case row"))
            .await
            .expect("insert case");
        case
    }

    pub async fn request(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    pub async fn with_cookie(&self, method: Method, path: &str, cookie: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("request");
        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, path, token, Some(body)).await
    }

    /// POST with a body sent as-is, for malformed payloads.
    pub async fn post_raw(&self, path: &str, token: &str, body: &'static str) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, headers, body }
    }
}

/// The server binary on a free port, killed on drop.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_lawdesk"))
            .env("LAWDESK_PORT", port.to_string())
            .env("LAWDESK_HOST", "127.0.0.1")
            .env("LAWDESK_BACKEND", "memory")
            .env("APP_ENV", "development")
            .env("RUST_LOG", "lawdesk=warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        let server = Self { port, base_url, child };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Client that keeps cookies and leaves redirects to the test.
    pub fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .cookie_store(true)
            .build()
            .expect("client")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
