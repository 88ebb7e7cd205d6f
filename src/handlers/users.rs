use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    activity::{ActivityEvent, Actor},
    controllers::ResourceController,
    error::{AppError, FieldErrors, Result},
    handlers::content::DeleteParams,
    models::{
        ActivityAction, CreateUserRequest, Profile, ProfileDraft, Resource, Role, SelfProfileUpdate,
    },
    session::{Section, SessionUser},
};

pub const MIN_PASSWORD_CHARS: usize = 8;

/// create_user
///
/// [Admin Route] Creates a staff account: the auth user first (server-side, with the
/// service-role credential), then its profile row carrying the chosen role.
///
/// Everything checkable locally is checked before the auth platform is called.
#[utoipa::path(
    post,
    path = "/admin/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = Profile),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Invalid fields"),
        (status = 503, description = "Service-role key not configured")
    )
)]
pub async fn create_user(
    user: SessionUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Profile>)> {
    user.require(Section::Users)?;

    let email = payload.email.trim().to_lowercase();
    let mut fields = FieldErrors::new();
    if !email.contains('@') {
        fields.insert("email".to_string(), "Enter a valid email address".to_string());
    }
    if payload.password.chars().count() < MIN_PASSWORD_CHARS {
        fields.insert(
            "password".to_string(),
            format!("Password must be at least {MIN_PASSWORD_CHARS} characters"),
        );
    }
    if payload.role.parse::<Role>().is_err() {
        fields.insert(
            "role".to_string(),
            "Role must be one of admin, editor or reader".to_string(),
        );
    }
    AppError::check(fields)?;

    let identity = state.auth.create_user(&email, &payload.password).await?;

    let draft = ProfileDraft {
        email: Some(email),
        display_name: payload.display_name,
        role: Some(payload.role),
        avatar_url: None,
    };
    let mut controller = ResourceController::<Profile>::new(state.repo.clone());
    let profile = match controller.create_with_id(identity.id, draft, None).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(
                auth_user_id = %identity.id,
                error = %e,
                "auth user created but profile write failed"
            );
            return Err(e);
        }
    };

    state.activity.record(
        ActivityEvent::new(ActivityAction::Create, Profile::ENTITY)
            .entity(profile.id)
            .details(json!({ "email": profile.email, "role": profile.role })),
        Some(Actor::from(&user)),
        None,
    );
    Ok((StatusCode::CREATED, Json(profile)))
}

/// update_user
///
/// [Admin Route] Name, role and avatar of any staff member. An admin cannot change
/// their own role.
#[utoipa::path(
    put,
    path = "/admin/api/users/{id}",
    request_body = ProfileDraft,
    responses(
        (status = 200, description = "User updated", body = Profile),
        (status = 404, description = "Not found"),
        (status = 422, description = "Invalid fields")
    )
)]
pub async fn update_user(
    user: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut draft): Json<ProfileDraft>,
) -> Result<Json<Profile>> {
    user.require(Section::Users)?;
    if id == user.id && draft.role.as_deref().is_some_and(|role| role != user.role.as_str()) {
        return Err(AppError::field("role", "You cannot change your own role"));
    }
    // The email mirrors the auth account and is not editable here.
    draft.email = None;

    let mut controller = ResourceController::<Profile>::new(state.repo.clone());
    let profile = controller.update(id, draft.clone()).await?;

    state.activity.record(
        ActivityEvent::new(ActivityAction::Update, Profile::ENTITY)
            .entity(id)
            .details(json!({ "role": draft.role })),
        Some(Actor::from(&user)),
        None,
    );
    Ok(Json(profile))
}

/// delete_user
///
/// [Admin Route] Removes the profile row only; the auth account is left in place and
/// can no longer pass the role gate. Requires `?confirm=true`.
#[utoipa::path(
    delete,
    path = "/admin/api/users/{id}",
    params(("confirm" = bool, Query, description = "Must be true")),
    responses(
        (status = 204, description = "Profile deleted"),
        (status = 422, description = "Cannot delete yourself"),
        (status = 428, description = "Confirmation required")
    )
)]
pub async fn delete_user(
    user: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode> {
    user.require(Section::Users)?;
    if id == user.id {
        return Err(AppError::field("id", "You cannot delete your own account"));
    }

    let mut controller = ResourceController::<Profile>::new(state.repo.clone());
    controller.delete(id, params.confirm).await?;

    state.activity.record(
        ActivityEvent::new(ActivityAction::Delete, Profile::ENTITY).entity(id),
        Some(Actor::from(&user)),
        None,
    );
    Ok(StatusCode::NO_CONTENT)
}

/// update_me
///
/// [Admin Route] Self-service edit of display name and avatar. The role is never
/// taken from this payload.
#[utoipa::path(
    put,
    path = "/admin/api/me",
    request_body = SelfProfileUpdate,
    responses((status = 200, description = "Profile updated", body = Profile))
)]
pub async fn update_me(
    user: SessionUser,
    State(state): State<AppState>,
    Json(payload): Json<SelfProfileUpdate>,
) -> Result<Json<Profile>> {
    user.require(Section::Account)?;
    let draft = ProfileDraft {
        display_name: payload.display_name,
        avatar_url: payload.avatar_url,
        ..ProfileDraft::default()
    };

    let mut controller = ResourceController::<Profile>::new(state.repo.clone());
    let profile = controller.update(user.id, draft).await?;

    state.activity.record(
        ActivityEvent::new(ActivityAction::Update, Profile::ENTITY).entity(user.id),
        Some(Actor::from(&user)),
        None,
    );
    Ok(Json(profile))
}
