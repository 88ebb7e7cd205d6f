use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{Document, NewsItem, Note, RevenueStatistic, Service, SiteStatistic, StaffMember},
    public::{
        DocumentView, HomePage, NewsCard, NewsDetail, NoteView, RevenueSummary, ServiceView,
        StatisticView, TeamView, group_by_team, published, summarize_revenue,
    },
};

pub const HOME_FEATURED: i64 = 3;
pub const HOME_LATEST: i64 = 6;
pub const MAX_PAGE: i64 = 100;

/// NewsFilter
///
/// Query parameters of the public news list.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NewsFilter {
    /// Category code, e.g. `communique`.
    pub categorie: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DocumentFilter {
    pub categorie: Option<String>,
}

fn category_filter(category: Option<&str>) -> Vec<(&'static str, Value)> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| vec![("categorie", Value::from(c))])
        .unwrap_or_default()
}

/// get_home
///
/// [Public Route] Featured and latest published news, active key figures, published
/// notes and services.
#[utoipa::path(
    get,
    path = "/api/home",
    responses((status = 200, description = "Home page content", body = HomePage))
)]
pub async fn get_home(State(state): State<AppState>) -> Result<Json<HomePage>> {
    let repo = state.repo.as_ref();

    let featured: Vec<NewsItem> =
        published(repo, &[("en_vedette", Value::Bool(true))], Some(HOME_FEATURED)).await?;
    let latest: Vec<NewsItem> = published(repo, &[], Some(HOME_LATEST)).await?;
    let statistics: Vec<SiteStatistic> = published(repo, &[], None).await?;
    let notes: Vec<Note> = published(repo, &[], None).await?;
    let services: Vec<Service> = published(repo, &[], None).await?;

    Ok(Json(HomePage {
        featured: featured.iter().map(NewsCard::from).collect(),
        latest: latest.iter().map(NewsCard::from).collect(),
        statistics: statistics.iter().map(StatisticView::from).collect(),
        notes: notes.iter().map(NoteView::from).collect(),
        services: services.iter().map(ServiceView::from).collect(),
    }))
}

/// list_news
///
/// [Public Route] Published news, newest publication first.
#[utoipa::path(
    get,
    path = "/api/news",
    params(NewsFilter),
    responses((status = 200, description = "Published news", body = [NewsCard]))
)]
pub async fn list_news(
    State(state): State<AppState>,
    Query(filter): Query<NewsFilter>,
) -> Result<Json<Vec<NewsCard>>> {
    let limit = filter.limit.map(|l| l.clamp(1, MAX_PAGE));
    let items: Vec<NewsItem> = published(
        state.repo.as_ref(),
        &category_filter(filter.categorie.as_deref()),
        limit,
    )
    .await?;
    Ok(Json(items.iter().map(NewsCard::from).collect()))
}

/// get_news
///
/// [Public Route] One published article by slug. Unpublished articles are 404.
#[utoipa::path(
    get,
    path = "/api/news/{slug}",
    responses(
        (status = 200, description = "Article", body = NewsDetail),
        (status = 404, description = "Not found or not published")
    )
)]
pub async fn get_news(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<NewsDetail>> {
    let items: Vec<NewsItem> =
        published(state.repo.as_ref(), &[("slug", Value::from(slug))], Some(1)).await?;
    items
        .first()
        .map(|item| Json(NewsDetail::from(item)))
        .ok_or_else(|| AppError::NotFound("News article".to_string()))
}

/// list_services
///
/// [Public Route] Published services in display order.
#[utoipa::path(
    get,
    path = "/api/services",
    responses((status = 200, description = "Services", body = [ServiceView]))
)]
pub async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<ServiceView>>> {
    let services: Vec<Service> = published(state.repo.as_ref(), &[], None).await?;
    Ok(Json(services.iter().map(ServiceView::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/services/{slug}",
    responses(
        (status = 200, description = "Service", body = ServiceView),
        (status = 404, description = "Not found or not published")
    )
)]
pub async fn get_service(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ServiceView>> {
    let services: Vec<Service> =
        published(state.repo.as_ref(), &[("slug", Value::from(slug))], Some(1)).await?;
    services
        .first()
        .map(|service| Json(ServiceView::from(service)))
        .ok_or_else(|| AppError::NotFound("Service".to_string()))
}

/// list_documents
///
/// [Public Route] Published legal texts and forms, optionally for one category.
#[utoipa::path(
    get,
    path = "/api/documents",
    params(DocumentFilter),
    responses((status = 200, description = "Documents", body = [DocumentView]))
)]
pub async fn list_documents(
    State(state): State<AppState>,
    Query(filter): Query<DocumentFilter>,
) -> Result<Json<Vec<DocumentView>>> {
    let documents: Vec<Document> = published(
        state.repo.as_ref(),
        &category_filter(filter.categorie.as_deref()),
        None,
    )
    .await?;
    Ok(Json(documents.iter().map(DocumentView::from).collect()))
}

/// get_structure
///
/// [Public Route] Active personnel grouped by team.
#[utoipa::path(
    get,
    path = "/api/structure",
    responses((status = 200, description = "Organisational structure", body = [TeamView]))
)]
pub async fn get_structure(State(state): State<AppState>) -> Result<Json<Vec<TeamView>>> {
    let staff: Vec<StaffMember> = published(state.repo.as_ref(), &[], None).await?;
    Ok(Json(group_by_team(&staff)))
}

#[utoipa::path(
    get,
    path = "/api/did-you-know",
    responses((status = 200, description = "Published notes", body = [NoteView]))
)]
pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<NoteView>>> {
    let notes: Vec<Note> = published(state.repo.as_ref(), &[], None).await?;
    Ok(Json(notes.iter().map(NoteView::from).collect()))
}

/// get_revenue
///
/// [Public Route] Revenue statistics aggregated per currency, year, type and month.
#[utoipa::path(
    get,
    path = "/api/revenue",
    responses((status = 200, description = "Revenue summary", body = RevenueSummary))
)]
pub async fn get_revenue(State(state): State<AppState>) -> Result<Json<RevenueSummary>> {
    let rows: Vec<RevenueStatistic> = published(state.repo.as_ref(), &[], None).await?;
    Ok(Json(summarize_revenue(&rows)))
}
