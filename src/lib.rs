use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Infrastructure adapters (hosted database, auth platform, CDN) and configuration.
pub mod auth;
pub mod config;
pub mod media;
pub mod repository;

// Domain: entities, CRUD controllers, presentation transforms, audit trail.
pub mod activity;
pub mod controllers;
pub mod models;
pub mod public;
pub mod slug;

// HTTP boundary.
pub mod error;
pub mod gate;
pub mod handlers;
pub mod session;

// Module for routing segregation (Public, Admin).
pub mod routes;
use routes::{admin, public as public_routes};

// --- Public Re-exports ---

pub use activity::ActivityLogger;
pub use auth::{AuthState, MockAuthProvider, SupabaseAuthClient};
pub use config::AppConfig;
pub use media::{MediaService, MockCdnClient};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for the non-generic endpoints, served at `/api-docs/openapi.json`.
/// The per-resource CRUD routes share one generic handler set under
/// `/admin/api/<resource>` and are not listed individually.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login, handlers::auth::logout, handlers::auth::get_session,
        handlers::auth::get_me, handlers::users::update_me,
        handlers::users::create_user, handlers::users::update_user, handlers::users::delete_user,
        handlers::media::upload_image, handlers::media::upload_document,
        handlers::media::upload_gallery, handlers::media::add_youtube,
        handlers::dashboard::get_dashboard, handlers::dashboard::get_activity,
        handlers::public::get_home, handlers::public::list_news, handlers::public::get_news,
        handlers::public::list_services, handlers::public::get_service,
        handlers::public::list_documents, handlers::public::get_structure,
        handlers::public::list_notes, handlers::public::get_revenue,
    ),
    components(
        schemas(
            models::Role, models::Profile, models::ProfileDraft, models::NewsItem,
            models::NewsItemDraft, models::Document, models::DocumentDraft, models::Service,
            models::ServiceDraft, models::StaffMember, models::StaffMemberDraft, models::Note,
            models::NoteDraft, models::SiteStatistic, models::SiteStatisticDraft,
            models::RevenueStatistic, models::RevenueStatisticDraft, models::ActivityAction,
            models::ActivityLogEntry, models::LoginRequest, models::CreateUserRequest,
            models::SelfProfileUpdate, session::SessionUser, session::Section,
            media::UploadedMedia, media::YoutubeVideo,
        )
    ),
    tags(
        (name = "revenue-portal", description = "Revenue agency website and admin API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of services and configuration, cloned into every
/// request. Every service is behind an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Tabular data API of the hosted database.
    pub repo: RepositoryState,
    /// Hosted auth platform.
    pub auth: AuthState,
    /// Upload adapter in front of the media CDN.
    pub media: MediaService,
    /// Fire-and-forget audit trail.
    pub activity: ActivityLogger,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        repo: RepositoryState,
        auth: AuthState,
        media: MediaService,
        config: AppConfig,
    ) -> Self {
        Self {
            activity: ActivityLogger::new(repo.clone(), auth.clone()),
            repo,
            auth,
            media,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(app_state: &AppState) -> AuthState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the public tree, the gated `/admin` tree and the Swagger UI, then wraps
/// everything in the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public_routes::public_routes())
        // Every /admin path, matched or not, goes through the role gate.
        .nest(
            "/admin",
            admin::admin_routes(state.media.limits()).layer(middleware::from_fn_with_state(
                state.clone(),
                gate::role_gate,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// One span per request carrying method, path and `x-request-id`. The query string is
/// left out so login redirects and search terms do not end up in the logs.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
    )
}
