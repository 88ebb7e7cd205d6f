use crate::{AppState, handlers::public};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only endpoints for the institutional website. No session is read here.
///
/// Every content query goes through `public::published`, which applies the type's
/// visibility flag (`publie` or `actif`), so unpublished rows never leave the database.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        .route("/api/home", get(public::get_home))
        // GET /api/news?categorie=...&limit=...
        .route("/api/news", get(public::list_news))
        .route("/api/news/{slug}", get(public::get_news))
        .route("/api/services", get(public::list_services))
        .route("/api/services/{slug}", get(public::get_service))
        // GET /api/documents?categorie=...
        .route("/api/documents", get(public::list_documents))
        // GET /api/structure
        // Active personnel grouped by team.
        .route("/api/structure", get(public::get_structure))
        .route("/api/did-you-know", get(public::list_notes))
        .route("/api/revenue", get(public::get_revenue))
}
