use axum::{
    extract::{OriginalUri, Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    session::{SessionState, resolve_session},
};

pub const LOGIN_PATH: &str = "/admin/login";

/// Admin paths reachable without a session.
const OPEN_PATHS: &[&str] = &[LOGIN_PATH, "/admin/logout"];

/// role_gate
///
/// Middleware in front of the whole `/admin` tree.
///
/// 1. The login and logout paths pass through untouched.
/// 2. Every other path needs a live session whose profile role is admin or editor.
/// 3. Anything else (no session, no profile, reader role, lookup failure) is sent
///    to the login page with the requested path and query as `redirect`.
///
/// On success the resolved `SessionUser` is stored in the request extensions.
pub async fn role_gate(
    State(state): State<AppState>,
    OriginalUri(original): OriginalUri,
    mut req: Request,
    next: Next,
) -> Response {
    if OPEN_PATHS.contains(&original.path()) {
        return next.run(req).await;
    }

    let session = resolve_session(
        req.headers(),
        state.repo.as_ref(),
        state.auth.as_ref(),
        &state.config,
    )
    .await;

    match session {
        SessionState::Active(user) if user.role.is_staff() => {
            tracing::debug!(
                user_id = %user.id,
                role = %user.role,
                path = %original.path(),
                "admin request admitted"
            );
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        SessionState::Active(user) => {
            tracing::info!(
                user_id = %user.id,
                role = %user.role,
                "non-staff role refused at the admin gate"
            );
            login_redirect(&original).into_response()
        }
        SessionState::Unauthorized { user_id } => {
            tracing::info!(%user_id, "session without a valid profile refused at the admin gate");
            login_redirect(&original).into_response()
        }
        SessionState::Anonymous => login_redirect(&original).into_response(),
    }
}

/// login_redirect
///
/// `303 See Other` to the login page, carrying the requested path and query.
pub fn login_redirect(requested: &Uri) -> Redirect {
    let target = requested
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| requested.path());

    if target == LOGIN_PATH || target.starts_with("/admin/login?") {
        return Redirect::to(LOGIN_PATH);
    }

    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    Redirect::to(&format!("{LOGIN_PATH}?redirect={encoded}"))
}

/// safe_redirect
///
/// Post-login destination: only same-site admin paths are honoured, so the
/// `redirect` parameter cannot bounce a user to another origin or back to login.
pub fn safe_redirect(requested: Option<&str>) -> String {
    match requested.map(str::trim) {
        Some(path)
            if path.starts_with("/admin")
                && !path.starts_with("//")
                && !path.contains("://")
                && !path.starts_with(LOGIN_PATH) =>
        {
            path.to_string()
        }
        _ => "/admin".to_string(),
    }
}
