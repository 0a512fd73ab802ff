pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{ip_rate_limit_middleware, IpRateLimit, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use sqlx::PgPool;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{openapi::security::SecurityScheme, Modify, OpenApi};

use crate::config::{GuardianConfig, SecurityConfig};
use crate::db::{MemoryRepository, PgRepository, Repository};
use crate::models::{Alert, LostArticle, PersonalDetails, Report, User};
use crate::services::{
    AlertService, AuthService, ChallengeStore, EmailProvider, FileTokenService, JwtService,
    LostArticleService, MemoryChallengeStore, MfaService, PersonalDetailsService, ReportService,
    Storage,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::mfa::verify_code,
        handlers::mfa::resend_code,
        handlers::files::upload,
        handlers::files::create_token,
        handlers::files::serve,
        handlers::personal_details::get_details,
        handlers::personal_details::put_details,
        handlers::personal_details::delete_details,
        handlers::reports::create_report,
        handlers::reports::list_reports,
        handlers::reports::get_report,
        handlers::reports::update_report_status,
        handlers::reports::delete_report,
        handlers::lost_articles::create_article,
        handlers::lost_articles::list_own_articles,
        handlers::lost_articles::list_found_articles,
        handlers::lost_articles::get_article,
        handlers::lost_articles::update_article_status,
        handlers::lost_articles::delete_article,
        handlers::alerts::create_alert,
        handlers::alerts::list_alerts,
        handlers::alerts::delete_alert,
        handlers::users::update_mfa,
        handlers::users::update_role,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::RegisterResponse,
            dtos::auth::LoginRequest,
            dtos::auth::MfaRequiredResponse,
            dtos::auth::TokenResponse,
            dtos::auth::RefreshRequest,
            dtos::mfa::VerifyCodeRequest,
            dtos::mfa::ResendCodeRequest,
            dtos::mfa::ResendCodeResponse,
            dtos::files::UploadResponse,
            dtos::files::FileTokenRequest,
            dtos::files::FileTokenResponse,
            dtos::personal_details::PersonalDetailsRequest,
            dtos::reports::CreateReportRequest,
            dtos::reports::UpdateReportStatusRequest,
            dtos::lost_articles::CreateLostArticleRequest,
            dtos::lost_articles::UpdateLostArticleStatusRequest,
            dtos::alerts::CreateAlertRequest,
            dtos::users::UpdateMfaRequest,
            dtos::users::UpdateRoleRequest,
            models::User,
            models::PersonalDetails,
            models::Report,
            models::ReportStatus,
            models::LostArticle,
            models::LostArticleStatus,
            models::Alert,
            models::AlertSeverity,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and session tokens"),
        (name = "MFA", description = "Email one-time code verification"),
        (name = "Account", description = "Account settings and officer roles"),
        (name = "Files", description = "Attachment upload and token-gated download"),
        (name = "Personal Details", description = "The caller's contact details"),
        (name = "Reports", description = "Incident reports"),
        (name = "Lost and Found", description = "Lost and found articles"),
        (name = "Alerts", description = "Safety alerts from officers"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Storage and delivery backends the services run on.
pub struct Backends {
    pub users: Arc<dyn Repository<User>>,
    pub personal_details: Arc<dyn Repository<PersonalDetails>>,
    pub reports: Arc<dyn Repository<Report>>,
    pub lost_articles: Arc<dyn Repository<LostArticle>>,
    pub alerts: Arc<dyn Repository<Alert>>,
    pub challenges: Arc<dyn ChallengeStore>,
    pub email: Arc<dyn EmailProvider>,
    pub storage: Arc<dyn Storage>,
}

impl Backends {
    pub fn postgres(
        pool: PgPool,
        challenges: Arc<dyn ChallengeStore>,
        email: Arc<dyn EmailProvider>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            users: Arc::new(PgRepository::<User>::new(pool.clone())),
            personal_details: Arc::new(PgRepository::<PersonalDetails>::new(pool.clone())),
            reports: Arc::new(PgRepository::<Report>::new(pool.clone())),
            lost_articles: Arc::new(PgRepository::<LostArticle>::new(pool.clone())),
            alerts: Arc::new(PgRepository::<Alert>::new(pool)),
            challenges,
            email,
            storage,
        }
    }

    /// Process-local repositories and challenge store.
    pub fn in_memory(email: Arc<dyn EmailProvider>, storage: Arc<dyn Storage>) -> Self {
        Self {
            users: Arc::new(MemoryRepository::<User>::new()),
            personal_details: Arc::new(MemoryRepository::<PersonalDetails>::new()),
            reports: Arc::new(MemoryRepository::<Report>::new()),
            lost_articles: Arc::new(MemoryRepository::<LostArticle>::new()),
            alerts: Arc::new(MemoryRepository::<Alert>::new()),
            challenges: Arc::new(MemoryChallengeStore::new()),
            email,
            storage,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GuardianConfig>,
    pub auth: Arc<AuthService>,
    pub mfa: Arc<MfaService>,
    pub file_tokens: FileTokenService,
    pub storage: Arc<dyn Storage>,
    pub personal_details: Arc<PersonalDetailsService>,
    pub reports: Arc<ReportService>,
    pub lost_articles: Arc<LostArticleService>,
    pub alerts: Arc<AlertService>,
    pub users: Arc<dyn Repository<User>>,
    pub challenges: Arc<dyn ChallengeStore>,
    pub login_rate_limiter: IpRateLimit,
    pub mfa_rate_limiter: IpRateLimit,
    pub ip_rate_limiter: IpRateLimit,
}

impl AppState {
    pub fn new(config: GuardianConfig, backends: Backends) -> Self {
        let mfa = Arc::new(MfaService::new(
            &config.mfa,
            backends.challenges.clone(),
            backends.email,
        ));
        let auth = Arc::new(AuthService::new(
            backends.users.clone(),
            JwtService::new(&config.jwt),
            mfa.clone(),
            &config.security.officer_emails,
        ));
        let limits = &config.rate_limit;
        let trust_forwarded_for = config.security.trust_forwarded_for;
        let storage = backends.storage;

        Self {
            login_rate_limiter: IpRateLimit::new(
                limits.login_attempts,
                limits.login_window_seconds,
                trust_forwarded_for,
            ),
            mfa_rate_limiter: IpRateLimit::new(
                limits.mfa_attempts,
                limits.mfa_window_seconds,
                trust_forwarded_for,
            ),
            ip_rate_limiter: IpRateLimit::new(
                limits.global_ip_limit,
                limits.global_ip_window_seconds,
                trust_forwarded_for,
            ),
            file_tokens: FileTokenService::new(&config.files),
            storage: storage.clone(),
            personal_details: Arc::new(PersonalDetailsService::new(backends.personal_details)),
            reports: Arc::new(ReportService::new(backends.reports, storage.clone())),
            lost_articles: Arc::new(LostArticleService::new(
                backends.lost_articles,
                storage,
            )),
            alerts: Arc::new(AlertService::new(backends.alerts)),
            users: backends.users,
            challenges: backends.challenges,
            auth,
            mfa,
            config: Arc::new(config),
        }
    }

    /// Every per-IP limiter, for periodic pruning.
    pub fn rate_limiters(&self) -> Vec<IpRateLimiter> {
        vec![
            self.login_rate_limiter.limiter.clone(),
            self.mfa_rate_limiter.limiter.clone(),
            self.ip_rate_limiter.limiter.clone(),
        ]
    }
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-request-id"),
        ]);

    if security.allowed_origins.iter().any(|o| o == "*") {
        // Credentials cannot be combined with a wildcard origin.
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = security
        .allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(origins).allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    let login_route = Router::new()
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let mfa_routes = Router::new()
        .route("/api/v1/mfa/verify-code", post(handlers::mfa::verify_code))
        .route("/api/v1/mfa/resend-code", post(handlers::mfa::resend_code))
        .layer(from_fn_with_state(
            state.mfa_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    // Multipart framing adds a little on top of the file itself.
    let upload_limit = state.config.files.max_upload_bytes + 64 * 1024;

    let protected = Router::new()
        .route(
            "/api/v1/files",
            post(handlers::files::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/files/token", post(handlers::files::create_token))
        .route(
            "/api/v1/personal-details",
            get(handlers::personal_details::get_details)
                .put(handlers::personal_details::put_details)
                .delete(handlers::personal_details::delete_details),
        )
        .route(
            "/api/v1/reports",
            post(handlers::reports::create_report).get(handlers::reports::list_reports),
        )
        .route(
            "/api/v1/reports/:id",
            get(handlers::reports::get_report).delete(handlers::reports::delete_report),
        )
        .route(
            "/api/v1/reports/:id/status",
            patch(handlers::reports::update_report_status),
        )
        .route(
            "/api/v1/lost-articles",
            post(handlers::lost_articles::create_article)
                .get(handlers::lost_articles::list_own_articles),
        )
        .route(
            "/api/v1/lost-articles/found",
            get(handlers::lost_articles::list_found_articles),
        )
        .route(
            "/api/v1/lost-articles/:id",
            get(handlers::lost_articles::get_article)
                .delete(handlers::lost_articles::delete_article),
        )
        .route(
            "/api/v1/lost-articles/:id/status",
            patch(handlers::lost_articles::update_article_status),
        )
        .route(
            "/api/v1/alerts",
            post(handlers::alerts::create_alert).get(handlers::alerts::list_alerts),
        )
        .route("/api/v1/alerts/:id", axum::routing::delete(handlers::alerts::delete_alert))
        .route("/api/v1/account/mfa", put(handlers::users::update_mfa))
        .route("/api/v1/users/:id/role", put(handlers::users::update_role))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/.well-known/openapi.json", get(openapi_json))
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/refresh", post(handlers::auth::refresh))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route("/api/v1/files/:token", get(handlers::files::serve))
        .merge(login_route)
        .merge(mfa_routes)
        .merge(protected)
        // Route layer so the matched route template is known when labelling.
        .route_layer(from_fn(metrics_middleware))
        .with_state(state.clone())
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");

            tracing::info_span!(
                "http_request",
                request_id = %request_id,
                method = %request.method(),
                path = %request.uri().path(),
                user_id = tracing::field::Empty,
            )
        }))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security))
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "A dependency is down")
    ),
    tag = "Observability"
)]
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let database = state.users.health_check().await;
    let cache = state.challenges.health_check().await;

    if let Err(e) = &database {
        tracing::error!(error = %e, "Database health check failed");
    }
    if let Err(e) = &cache {
        tracing::error!(error = %e, "Challenge store health check failed");
    }

    let up = |ok: bool| if ok { "up" } else { "down" };
    let healthy = database.is_ok() && cache.is_ok();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Ok((
        status,
        Json(serde_json::json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "service": state.config.service_name,
            "version": state.config.service_version,
            "environment": format!("{:?}", state.config.environment),
            "checks": {
                "database": up(database.is_ok()),
                "cache": up(cache.is_ok()),
            }
        })),
    ))
}
