use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    media::{youtube_id, youtube_thumbnail},
    models::{
        Document, NewsItem, Note, Resource, RevenueStatistic, Service, SiteStatistic, StaffMember,
    },
    repository::{RepoError, Repository, TableQuery, select_as},
};

pub const EXCERPT_CHARS: usize = 180;

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Display labels for the category codes stored in `categorie`.
const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("actualite", "Actualité"),
    ("communique", "Communiqué"),
    ("evenement", "Événement"),
    ("fiscalite", "Fiscalité"),
    ("sensibilisation", "Sensibilisation"),
    ("loi", "Lois et édits"),
    ("edit", "Édits provinciaux"),
    ("arrete", "Arrêtés"),
    ("decision", "Décisions"),
    ("formulaire", "Formulaires"),
    ("rapport", "Rapports"),
    ("guide", "Guides pratiques"),
];

/// format_date_fr
///
/// French long date, e.g. `1 mars 2026`.
pub fn format_date_fr(date: DateTime<Utc>) -> String {
    format!(
        "{} {} {}",
        date.day(),
        MONTHS_FR[date.month0() as usize],
        date.year()
    )
}

pub fn month_name_fr(month: i32) -> Option<&'static str> {
    usize::try_from(month - 1).ok().and_then(|i| MONTHS_FR.get(i)).copied()
}

/// excerpt
///
/// At most `max_chars` characters of `text` (counted as chars, never splitting one),
/// followed by `…` when something was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
    }
}

/// category_label
///
/// Known codes map to their label; anything else is shown with separators turned
/// into spaces and the first letter capitalised.
pub fn category_label(code: &str) -> String {
    if let Some((_, label)) = CATEGORY_LABELS.iter().find(|(known, _)| *known == code) {
        return label.to_string();
    }
    let spaced = code.replace(['_', '-'], " ");
    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// published
///
/// Rows of `T` passing its visibility flag, in the type's display order, with any
/// extra equality filters. This is the only way public handlers read content.
pub async fn published<T: Resource>(
    repo: &dyn Repository,
    filters: &[(&'static str, serde_json::Value)],
    limit: Option<i64>,
) -> Result<Vec<T>, RepoError> {
    let mut query = TableQuery::new(T::TABLE).order_by(T::ORDER);
    if let Some(flag) = T::VISIBILITY {
        query = query.eq(flag, true);
    }
    for (column, value) in filters {
        query = query.eq(*column, value.clone());
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    select_as(repo, &query).await
}

// --- Public view models ---

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct NewsCard {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub category: String,
    pub category_label: String,
    pub image_url: Option<String>,
    pub featured: bool,
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    pub published_on: Option<String>,
}

impl From<&NewsItem> for NewsCard {
    fn from(item: &NewsItem) -> Self {
        let source = item.summary.as_deref().unwrap_or(&item.content);
        NewsCard {
            title: item.title.clone(),
            slug: item.slug.clone(),
            excerpt: excerpt(source, EXCERPT_CHARS),
            category: item.category.clone(),
            category_label: category_label(&item.category),
            image_url: item.image_url.clone(),
            featured: item.featured,
            published_at: item.published_at,
            published_on: item.published_at.map(format_date_fr),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct VideoView {
    pub url: String,
    pub video_id: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct NewsDetail {
    #[serde(flatten)]
    pub card: NewsCard,
    pub content: String,
    pub gallery: Vec<String>,
    pub videos: Vec<VideoView>,
}

impl From<&NewsItem> for NewsDetail {
    fn from(item: &NewsItem) -> Self {
        NewsDetail {
            card: NewsCard::from(item),
            content: item.content.clone(),
            gallery: item.gallery.clone(),
            videos: item
                .videos
                .iter()
                .filter_map(|url| {
                    youtube_id(url).map(|video_id| VideoView {
                        url: url.clone(),
                        thumbnail_url: youtube_thumbnail(&video_id),
                        video_id,
                    })
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct ServiceView {
    pub title: String,
    pub slug: String,
    pub summary: String,
    pub description: String,
    pub icon: Option<String>,
    pub image_url: Option<String>,
}

impl From<&Service> for ServiceView {
    fn from(service: &Service) -> Self {
        ServiceView {
            title: service.title.clone(),
            slug: service.slug.clone(),
            summary: service
                .summary
                .clone()
                .unwrap_or_else(|| excerpt(&service.description, EXCERPT_CHARS)),
            description: service.description.clone(),
            icon: service.icon.clone(),
            image_url: service.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct DocumentView {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub category: String,
    pub category_label: String,
    pub file_url: String,
    pub file_size: Option<i64>,
}

impl From<&Document> for DocumentView {
    fn from(document: &Document) -> Self {
        DocumentView {
            title: document.title.clone(),
            slug: document.slug.clone(),
            description: document.description.clone(),
            category: document.category.clone(),
            category_label: category_label(&document.category),
            file_url: document.file_url.clone(),
            file_size: document.file_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct StaffView {
    pub name: String,
    pub position_title: String,
    pub biography: Option<String>,
    pub photo_url: Option<String>,
    pub email: Option<String>,
}

/// A team and its active members, in display order.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct TeamView {
    pub team: String,
    pub members: Vec<StaffView>,
}

/// group_by_team
///
/// Teams appear in the order of their first member; members keep their order.
pub fn group_by_team(staff: &[StaffMember]) -> Vec<TeamView> {
    let mut teams: Vec<TeamView> = Vec::new();
    for member in staff {
        let view = StaffView {
            name: member.name.clone(),
            position_title: member.position_title.clone(),
            biography: member.biography.clone(),
            photo_url: member.photo_url.clone(),
            email: member.email.clone(),
        };
        match teams.iter_mut().find(|t| t.team == member.team) {
            Some(team) => team.members.push(view),
            None => teams.push(TeamView {
                team: member.team.clone(),
                members: vec![view],
            }),
        }
    }
    teams
}

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct NoteView {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
}

impl From<&Note> for NoteView {
    fn from(note: &Note) -> Self {
        NoteView {
            title: note.title.clone(),
            content: note.content.clone(),
            category: note.category.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct StatisticView {
    pub label: String,
    pub value: String,
    pub icon: Option<String>,
}

impl From<&SiteStatistic> for StatisticView {
    fn from(stat: &SiteStatistic) -> Self {
        StatisticView {
            label: stat.label.clone(),
            value: stat.value.clone(),
            icon: stat.icon.clone(),
        }
    }
}

// --- Revenue aggregation ---

#[derive(Debug, Clone, Serialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct AmountByCurrency {
    pub currency: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct YearTotal {
    pub year: i32,
    pub totals: Vec<AmountByCurrency>,
}

#[derive(Debug, Clone, Serialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct TypeTotal {
    pub revenue_type: String,
    pub totals: Vec<AmountByCurrency>,
}

#[derive(Debug, Clone, Serialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MonthTotal {
    pub month: i32,
    pub month_name: String,
    pub totals: Vec<AmountByCurrency>,
}

/// RevenueSummary
///
/// Revenue statistics summed in memory. Amounts are never added across currencies.
#[derive(Debug, Clone, Serialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct RevenueSummary {
    pub totals: Vec<AmountByCurrency>,
    /// Newest year first.
    pub by_year: Vec<YearTotal>,
    pub by_type: Vec<TypeTotal>,
    pub latest_year: Option<i32>,
    /// Monthly breakdown of `latest_year`, January first.
    pub latest_year_by_month: Vec<MonthTotal>,
}

fn amounts(sums: BTreeMap<String, f64>) -> Vec<AmountByCurrency> {
    sums.into_iter()
        .map(|(currency, total)| AmountByCurrency { currency, total })
        .collect()
}

pub fn summarize_revenue(rows: &[RevenueStatistic]) -> RevenueSummary {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_year: BTreeMap<i32, BTreeMap<String, f64>> = BTreeMap::new();
    let mut by_type: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();

    for row in rows {
        *totals.entry(row.currency.clone()).or_default() += row.amount;
        *by_year
            .entry(row.year)
            .or_default()
            .entry(row.currency.clone())
            .or_default() += row.amount;
        *by_type
            .entry(row.revenue_type.clone())
            .or_default()
            .entry(row.currency.clone())
            .or_default() += row.amount;
    }

    let latest_year = by_year.keys().next_back().copied();

    let mut by_month: BTreeMap<i32, BTreeMap<String, f64>> = BTreeMap::new();
    for row in rows.iter().filter(|r| Some(r.year) == latest_year) {
        if let Some(month) = row.month {
            *by_month
                .entry(month)
                .or_default()
                .entry(row.currency.clone())
                .or_default() += row.amount;
        }
    }

    RevenueSummary {
        totals: amounts(totals),
        by_year: by_year
            .into_iter()
            .rev()
            .map(|(year, sums)| YearTotal {
                year,
                totals: amounts(sums),
            })
            .collect(),
        by_type: by_type
            .into_iter()
            .map(|(revenue_type, sums)| TypeTotal {
                revenue_type,
                totals: amounts(sums),
            })
            .collect(),
        latest_year,
        latest_year_by_month: by_month
            .into_iter()
            .map(|(month, sums)| MonthTotal {
                month,
                month_name: month_name_fr(month).unwrap_or_default().to_string(),
                totals: amounts(sums),
            })
            .collect(),
    }
}

/// HomePage
///
/// Everything the public home page needs in one call.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct HomePage {
    pub featured: Vec<NewsCard>,
    pub latest: Vec<NewsCard>,
    pub statistics: Vec<StatisticView>,
    pub notes: Vec<NoteView>,
    pub services: Vec<ServiceView>,
}
