use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    activity::{ActivityEvent, Actor},
    controllers::{ListFilter, ListResponse, ResourceController},
    error::Result,
    models::{ActivityAction, Resource},
    session::{SessionUser, section_path},
};

// Generic admin CRUD handlers, mounted once per resource type in `routes::admin`.

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

/// CreatedResponse
///
/// The stored row and the admin list it belongs to, also sent as `Location`.
#[derive(Debug, Serialize)]
pub struct CreatedResponse<T> {
    pub item: T,
    pub redirect: &'static str,
}

fn controller_for<T: Resource>(state: &AppState) -> ResourceController<T> {
    ResourceController::new(state.repo.clone()).with_limits(state.media.limits())
}

/// list
///
/// [Admin Route] The full table in display order, narrowed by `search` and `facet`.
pub async fn list<T: Resource>(
    user: SessionUser,
    State(state): State<AppState>,
    Query(filter): Query<ListFilter>,
) -> Result<Json<ListResponse<T>>> {
    user.require(T::SECTION)?;
    let mut controller = controller_for::<T>(&state);
    controller.load().await?;

    Ok(Json(ListResponse {
        items: controller.visible(&filter).into_iter().cloned().collect(),
        total: controller.items().len(),
    }))
}

/// get_one
///
/// [Admin Route] A single row, whatever its visibility.
pub async fn get_one<T: Resource>(
    user: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<T>> {
    user.require(T::SECTION)?;
    let controller = controller_for::<T>(&state);
    Ok(Json(controller.find(id).await?))
}

/// create
///
/// [Admin Route] Validates and stores a new row, then records a CREATE entry.
/// Responds 201 with the list path in `Location`.
pub async fn create<T: Resource>(
    user: SessionUser,
    State(state): State<AppState>,
    Json(draft): Json<T::Draft>,
) -> Result<impl IntoResponse> {
    user.require(T::SECTION)?;
    let mut controller = controller_for::<T>(&state);
    let item = controller.create(draft, Some(user.id)).await?;

    state.activity.record(
        ActivityEvent::new(ActivityAction::Create, T::ENTITY).entity(item.id()),
        Some(Actor::from(&user)),
        None,
    );

    let redirect = section_path(T::SECTION);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, redirect)],
        Json(CreatedResponse { item, redirect }),
    ))
}

/// update
///
/// [Admin Route] Applies the fields present in the body to an existing row.
pub async fn update<T: Resource>(
    user: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(draft): Json<T::Draft>,
) -> Result<Json<T>> {
    user.require(T::SECTION)?;
    let changed: Vec<String> = match serde_json::to_value(&draft) {
        Ok(serde_json::Value::Object(fields)) => fields.keys().cloned().collect(),
        _ => Vec::new(),
    };

    let mut controller = controller_for::<T>(&state);
    let item = controller.update(id, draft).await?;

    state.activity.record(
        ActivityEvent::new(ActivityAction::Update, T::ENTITY)
            .entity(id)
            .details(json!({ "fields": changed })),
        Some(Actor::from(&user)),
        None,
    );
    Ok(Json(item))
}

/// delete
///
/// [Admin Route] Removes a row. Requires `?confirm=true`, otherwise 428.
pub async fn delete<T: Resource>(
    user: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode> {
    user.require(T::SECTION)?;
    let mut controller = controller_for::<T>(&state);
    controller.delete(id, params.confirm).await?;

    state.activity.record(
        ActivityEvent::new(ActivityAction::Delete, T::ENTITY).entity(id),
        Some(Actor::from(&user)),
        None,
    );
    Ok(StatusCode::NO_CONTENT)
}

/// toggle
///
/// [Admin Route] Flips a boolean flag (`publie`, `actif`, `en_vedette`...).
pub async fn toggle<T: Resource>(
    user: SessionUser,
    State(state): State<AppState>,
    Path((id, flag)): Path<(Uuid, String)>,
) -> Result<Json<T>> {
    user.require(T::SECTION)?;
    let mut controller = controller_for::<T>(&state);
    let item = controller.toggle(id, &flag).await?;

    let value = serde_json::to_value(&item)
        .ok()
        .and_then(|row| row.get(&flag).cloned())
        .unwrap_or_default();
    state.activity.record(
        ActivityEvent::new(ActivityAction::Update, T::ENTITY)
            .entity(id)
            .details(json!({ "toggle": flag, "value": value })),
        Some(Actor::from(&user)),
        None,
    );
    Ok(Json(item))
}
