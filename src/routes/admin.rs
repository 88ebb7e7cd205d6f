use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::{
    AppState,
    error::AppError,
    handlers::{auth, content, dashboard, media, users},
    media::{MAX_DOCUMENT_BYTES, MAX_IMAGE_BYTES, MediaLimits},
    models::{
        Document, NewsItem, Note, Profile, Resource, RevenueStatistic, Service, SiteStatistic,
        StaffMember,
    },
};

/// Room for multipart boundaries, headers and the small text fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Request body ceiling on the single-file routes. Oversized images still fit, so they
/// get the descriptive per-file error instead of a bare 413.
pub const UPLOAD_BODY_LIMIT: usize = MAX_DOCUMENT_BYTES + 10 * MULTIPART_OVERHEAD;

/// Request body ceiling on the gallery route: a full batch of maximum-size images.
pub fn gallery_body_limit(limits: &MediaLimits) -> usize {
    (limits.gallery_cap * MAX_IMAGE_BYTES + MULTIPART_OVERHEAD).max(UPLOAD_BODY_LIMIT)
}

/// Admin Router Module
///
/// Everything under `/admin`. The whole tree sits behind the role gate (see
/// `create_router`); only `/login` and `/logout` are let through without a session.
/// Per-screen restrictions (users, activity log) are checked inside the handlers
/// against the navigation table.
pub fn admin_routes(limits: MediaLimits) -> Router<AppState> {
    Router::new()
        // POST /admin/login
        // Password sign-in; sets the session cookie for admin and editor roles only.
        .route("/login", post(auth::login))
        // POST /admin/logout
        // Ends the platform session and clears the cookie.
        .route("/logout", post(auth::logout))
        // GET /admin/session
        // Current user and the navigation their role may see.
        .route("/session", get(auth::get_session))
        .nest("/api", api_routes(limits))
        // Unknown admin paths still pass the role gate before answering 404.
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::NotFound("Page".to_string())
}

fn api_routes(limits: MediaLimits) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        // Admin only.
        .route("/activity", get(dashboard::get_activity))
        .route("/me", get(auth::get_me).put(users::update_me))
        // --- Content resources ---
        .nest("/news", resource_routes::<NewsItem>())
        .nest("/documents", resource_routes::<Document>())
        .nest("/services", resource_routes::<Service>())
        .nest("/personnel", resource_routes::<StaffMember>())
        .nest("/did-you-know", resource_routes::<Note>())
        .nest("/site-statistics", resource_routes::<SiteStatistic>())
        .nest("/revenue", resource_routes::<RevenueStatistic>())
        // --- Staff accounts (admin only) ---
        // Creation goes through the auth platform; deletion removes the profile row only.
        .route(
            "/users",
            get(content::list::<Profile>).post(users::create_user),
        )
        .route(
            "/users/{id}",
            get(content::get_one::<Profile>)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // --- Media ---
        .nest("/uploads", upload_routes(&limits))
        .route("/videos/youtube", post(media::add_youtube))
}

/// The six CRUD routes every content resource exposes.
fn resource_routes<T: Resource>() -> Router<AppState> {
    Router::new()
        .route("/", get(content::list::<T>).post(content::create::<T>))
        .route(
            "/{id}",
            get(content::get_one::<T>)
                .put(content::update::<T>)
                .delete(content::delete::<T>),
        )
        .route("/{id}/toggle/{flag}", post(content::toggle::<T>))
}

fn upload_routes(limits: &MediaLimits) -> Router<AppState> {
    Router::new()
        .route(
            "/image",
            post(media::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/document",
            post(media::upload_document).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/gallery",
            post(media::upload_gallery).layer(DefaultBodyLimit::max(gallery_body_limit(limits))),
        )
}
