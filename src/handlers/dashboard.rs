use axum::{
    Json,
    extract::{Query, State},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    activity::ActivityFilter,
    error::Result,
    models::{
        ActivityLogEntry, Document, NewsItem, Note, Resource, RevenueStatistic, Service,
        SiteStatistic, StaffMember,
    },
    public::{RevenueSummary, summarize_revenue},
    repository::{RepoError, Repository, TableQuery, select_as},
    session::{Section, SessionUser, allowed},
};

pub const RECENT_ACTIVITY: i64 = 10;

/// Row counts for one content table. `visible` is the number the public site shows.
#[derive(Debug, Serialize, ToSchema)]
pub struct TableCount {
    pub table: String,
    pub label: String,
    pub total: i64,
    pub visible: i64,
}

/// DashboardStats
///
/// Landing data for the admin home. `recent_activity` is only filled for admins.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub counts: Vec<TableCount>,
    pub revenue: RevenueSummary,
    pub recent_activity: Option<Vec<ActivityLogEntry>>,
}

async fn count_of<T: Resource>(
    repo: &dyn Repository,
) -> std::result::Result<TableCount, RepoError> {
    let total = repo.count(&TableQuery::new(T::TABLE)).await?;
    let visible = match T::VISIBILITY {
        Some(flag) => repo.count(&TableQuery::new(T::TABLE).eq(flag, true)).await?,
        None => total,
    };
    Ok(TableCount {
        table: T::TABLE.to_string(),
        label: T::LABEL.to_string(),
        total,
        visible,
    })
}

/// get_dashboard
///
/// [Admin Route] Per-table counts, the revenue summary and, for admins, the latest
/// activity entries.
#[utoipa::path(
    get,
    path = "/admin/api/dashboard",
    responses((status = 200, description = "Dashboard", body = DashboardStats))
)]
pub async fn get_dashboard(
    user: SessionUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>> {
    user.require(Section::Dashboard)?;
    let repo = state.repo.as_ref();

    let counts = vec![
        count_of::<NewsItem>(repo).await?,
        count_of::<Document>(repo).await?,
        count_of::<Service>(repo).await?,
        count_of::<StaffMember>(repo).await?,
        count_of::<Note>(repo).await?,
        count_of::<SiteStatistic>(repo).await?,
        count_of::<RevenueStatistic>(repo).await?,
    ];

    let revenue_rows: Vec<RevenueStatistic> = select_as(
        repo,
        &TableQuery::new(RevenueStatistic::TABLE).order_by(RevenueStatistic::ORDER),
    )
    .await?;

    let recent_activity = if allowed(user.role, Section::Activity) {
        let filter = ActivityFilter {
            limit: Some(RECENT_ACTIVITY),
            ..ActivityFilter::default()
        };
        Some(state.activity.recent(&filter).await?)
    } else {
        None
    };

    Ok(Json(DashboardStats {
        counts,
        revenue: summarize_revenue(&revenue_rows),
        recent_activity,
    }))
}

/// get_activity
///
/// [Admin Route] Newest activity log entries, filterable by action and entity type.
/// Admin only.
#[utoipa::path(
    get,
    path = "/admin/api/activity",
    params(ActivityFilter),
    responses(
        (status = 200, description = "Activity log", body = [ActivityLogEntry]),
        (status = 403, description = "Admin only")
    )
)]
pub async fn get_activity(
    user: SessionUser,
    State(state): State<AppState>,
    Query(filter): Query<ActivityFilter>,
) -> Result<Json<Vec<ActivityLogEntry>>> {
    user.require(Section::Activity)?;
    Ok(Json(state.activity.recent(&filter).await?))
}
