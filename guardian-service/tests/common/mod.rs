//! Test helpers for guardian-service integration tests.
//!
//! Every app runs on in-memory repositories, an in-memory challenge store,
//! a capturing mailer and a temporary upload directory.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use guardian_service::{
    build_router,
    config::{
        CookieConfig, DatabaseConfig, Environment, FilesConfig, GuardianConfig, JwtConfig,
        MfaConfig, RateLimitConfig, RedisConfig, SecurityConfig, SmtpConfig,
    },
    db::Repository,
    services::{LocalStorage, MockEmailService},
    AppState, Backends,
};
use http_body_util::BodyExt;
use secrecy::Secret;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const PASSWORD: &str = "correct-horse-battery";
/// Seeded into the officer list; registering it yields an officer.
pub const OFFICER_EMAIL: &str = "duty.officer@guardian.test";
/// Peer address attached to every request that does not set its own.
pub const CLIENT_ADDR: &str = "192.0.2.10:51000";

pub fn test_config(upload_dir: PathBuf) -> GuardianConfig {
    GuardianConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "guardian-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new("postgres://localhost/guardian_test".to_string()),
            max_connections: 1,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: Secret::new("redis://localhost:6379".to_string()),
        },
        jwt: JwtConfig {
            access_secret: Secret::new("test-access-secret".to_string()),
            refresh_secret: Secret::new("test-refresh-secret".to_string()),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
        },
        mfa: MfaConfig {
            secret: Secret::new("test-mfa-secret".to_string()),
            token_expiry_seconds: 300,
            code_length: 6,
            max_attempts: 3,
        },
        files: FilesConfig {
            secret: Secret::new("test-files-secret".to_string()),
            token_ttl_seconds: 300,
            upload_dir,
            max_upload_bytes: 1024,
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: Secret::new(String::new()),
            from: "Guardian <no-reply@guardian.local>".to_string(),
        },
        cookies: CookieConfig { secure: false },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:8081".to_string()],
            officer_emails: vec![OFFICER_EMAIL.to_string()],
            trust_forwarded_for: false,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
            mfa_attempts: 100,
            mfa_window_seconds: 60,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    /// Every `Set-Cookie` header value.
    pub fn cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.cookies().into_iter().find(|c| c.starts_with(&prefix))
    }
}

/// A signed-in account.
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub email: Arc<MockEmailService>,
    _uploads: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut GuardianConfig)) -> Self {
        let uploads = TempDir::new().expect("Failed to create upload dir");
        let mut config = test_config(uploads.path().to_path_buf());
        configure(&mut config);

        let storage = LocalStorage::new(uploads.path().to_path_buf())
            .await
            .expect("Failed to create storage");
        let email = Arc::new(MockEmailService::new());

        let state = AppState::new(
            config,
            Backends::in_memory(email.clone(), Arc::new(storage)),
        );

        Self {
            router: build_router(state.clone()),
            state,
            email,
            _uploads: uploads,
        }
    }

    pub async fn send(&self, mut request: Request<Body>) -> TestResponse {
        if request.extensions().get::<ConnectInfo<SocketAddr>>().is_none() {
            let addr: SocketAddr = CLIENT_ADDR.parse().expect("Invalid client address");
            request.extensions_mut().insert(ConnectInfo(addr));
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes()
            .to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            bytes,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn register(&self, email: &str) -> String {
        let response = self
            .post(
                "/api/v1/auth/register",
                None,
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "full_name": "Test Person",
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["user_id"]
            .as_str()
            .expect("user_id missing")
            .to_string()
    }

    /// Password login; returns the MFA token.
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .post(
                "/api/v1/auth/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        assert_eq!(response.body["mfa_required"], true);
        response.body["mfa_token"]
            .as_str()
            .expect("mfa_token missing")
            .to_string()
    }

    pub async fn verify(&self, mfa_token: &str, code: &str) -> TestResponse {
        self.post(
            "/api/v1/mfa/verify-code",
            None,
            json!({ "mfa_token": mfa_token, "code": code }),
        )
        .await
    }

    pub fn last_code(&self, email: &str) -> String {
        self.email.last_code_for(email).expect("No code was mailed")
    }

    /// Grant the officer role straight through the user store.
    pub async fn promote(&self, user_id: &str) {
        let id = uuid::Uuid::parse_str(user_id).expect("Invalid user id");
        let mut user = self
            .state
            .users
            .find_by_id(id)
            .await
            .expect("User lookup failed")
            .expect("User not found");
        user.is_officer = true;
        self.state.users.save(&user).await.expect("Failed to save user");
    }

    /// Log in and complete MFA for an existing account.
    pub async fn sign_in_existing(&self, email: &str, user_id: String) -> Session {
        let mfa_token = self.login(email).await;
        let response = self.verify(&mfa_token, &self.last_code(email)).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

        Session {
            user_id,
            access_token: response.body["accessToken"].as_str().unwrap().to_string(),
            refresh_token: response.body["refreshToken"].as_str().unwrap().to_string(),
        }
    }

    /// Register, log in and complete MFA.
    pub async fn sign_in(&self, email: &str) -> Session {
        let user_id = self.register(email).await;
        self.sign_in_existing(email, user_id).await
    }

    pub async fn citizen(&self) -> Session {
        self.sign_in(&format!("citizen-{}@example.com", uuid::Uuid::new_v4()))
            .await
    }

    pub async fn officer(&self) -> Session {
        let email = format!("officer-{}@example.com", uuid::Uuid::new_v4());
        let user_id = self.register(&email).await;
        self.promote(&user_id).await;
        self.sign_in_existing(&email, user_id).await
    }
}
