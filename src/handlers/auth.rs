use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    AppState,
    activity::{ActivityEvent, Actor},
    auth::{ACCESS_TOKEN_COOKIE, access_token},
    error::{AppError, FieldErrors, Result},
    gate::safe_redirect,
    models::{ActivityAction, LoginRequest, Profile, Resource, Role},
    repository::{RepoError, find_as},
    session::{NavItem, SessionUser, navigation_for, resolve_session},
};

/// LoginResponse
///
/// The signed-in staff member and the admin path the client should navigate to.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: SessionUser,
    pub redirect: String,
}

/// SessionResponse
///
/// Current user plus the navigation entries their role may see.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user: SessionUser,
    #[schema(value_type = Vec<Object>)]
    pub navigation: Vec<NavItem>,
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// login
///
/// [Public Route] Password sign-in for staff.
///
/// The password goes to the auth platform only. A first sign-in without a profile
/// provisions one with the `reader` role; readers (and any role outside admin/editor)
/// are refused with 403 and no cookie is set.
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "No admin access"),
        (status = 422, description = "Missing email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();
    let mut fields = FieldErrors::new();
    if email.is_empty() {
        fields.insert("email".to_string(), "Email is required".to_string());
    }
    if payload.password.is_empty() {
        fields.insert("password".to_string(), "Password is required".to_string());
    }
    AppError::check(fields)?;

    let session = state.auth.sign_in(&email, &payload.password).await?;
    let user_id = session.user.id;

    let profile = match find_as::<Profile>(state.repo.as_ref(), Profile::TABLE, user_id).await? {
        Some(profile) => profile,
        None => provision_reader(&state, user_id, &session.user.email, &email).await?,
    };

    let user = match SessionUser::try_from(profile) {
        Ok(user) if user.role.is_staff() => user,
        _ => {
            tracing::info!(%user_id, "sign-in refused: no admin role");
            if let Err(e) = state.auth.sign_out(&session.access_token).await {
                tracing::warn!(error = %e, "could not revoke refused session");
            }
            return Err(AppError::Forbidden);
        }
    };

    state.activity.record(
        ActivityEvent::new(ActivityAction::Login, Profile::ENTITY)
            .entity(user.id)
            .details(json!({ "role": user.role })),
        Some(Actor::from(&user)),
        None,
    );
    tracing::info!(user_id = %user.id, role = %user.role, "staff signed in");

    let jar = jar.add(session_cookie(session.access_token, state.config.secure_cookies));
    let body = LoginResponse {
        redirect: safe_redirect(payload.redirect.as_deref()),
        user,
    };
    Ok((jar, Json(body)))
}

/// A `reader` profile for a platform user signing in for the first time. A profile
/// written in the meantime (an admin creating the account) is kept as is.
async fn provision_reader(
    state: &AppState,
    user_id: Uuid,
    platform_email: &str,
    typed_email: &str,
) -> Result<Profile> {
    let now = Utc::now();
    let email = if platform_email.is_empty() {
        typed_email
    } else {
        platform_email
    };
    let profile = Profile {
        id: user_id,
        email: email.to_string(),
        display_name: None,
        role: Role::Reader.to_string(),
        avatar_url: None,
        created_at: now,
        updated_at: now,
    };
    let row = serde_json::to_value(&profile).map_err(RepoError::from)?;

    if state.repo.insert_if_absent(Profile::TABLE, row).await?.is_some() {
        tracing::info!(%user_id, "profile provisioned on first sign-in");
        return Ok(profile);
    }

    find_as::<Profile>(state.repo.as_ref(), Profile::TABLE, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))
}

/// logout
///
/// [Public Route] Ends the platform session (best effort) and clears the cookie.
/// Always succeeds, even without a live session.
#[utoipa::path(
    post,
    path = "/admin/logout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let session = resolve_session(
        &headers,
        state.repo.as_ref(),
        state.auth.as_ref(),
        &state.config,
    )
    .await;

    if let Some(token) = access_token(&headers) {
        if let Err(e) = state.auth.sign_out(&token).await {
            tracing::warn!(error = %e, "sign-out call failed, clearing the cookie anyway");
        }
    }

    if let Some(user) = session.user() {
        state.activity.record(
            ActivityEvent::new(ActivityAction::Logout, Profile::ENTITY).entity(user.id),
            Some(Actor::from(user)),
            None,
        );
    }

    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"));
    (StatusCode::NO_CONTENT, jar)
}

/// get_session
///
/// [Admin Route] The resolved session and its role-filtered navigation.
#[utoipa::path(
    get,
    path = "/admin/session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 303, description = "Not signed in, redirected to login")
    )
)]
pub async fn get_session(user: SessionUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        navigation: navigation_for(user.role),
        user,
    })
}

/// get_me
///
/// [Admin Route] The caller's own profile row.
#[utoipa::path(
    get,
    path = "/admin/api/me",
    responses((status = 200, description = "Own profile", body = Profile))
)]
pub async fn get_me(user: SessionUser, State(state): State<AppState>) -> Result<Json<Profile>> {
    let profile = find_as::<Profile>(state.repo.as_ref(), Profile::TABLE, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile".to_string()))?;
    Ok(Json(profile))
}
