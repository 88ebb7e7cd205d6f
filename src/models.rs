use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::FieldErrors,
    media::{MediaLimits, youtube_id},
    repository::SortKey,
    session::Section,
};

// --- Roles ---

/// Role
///
/// The closed set of staff roles stored in `profiles.role`. Any other value is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    /// Full access, including user management and the activity log.
    Admin,
    /// Content management.
    Editor,
    /// Read-only; never admitted to the admin screens.
    Reader,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Editor, Role::Reader];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Reader => "reader",
        }
    }

    /// Roles admitted past the role gate.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Editor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact match only: `"Admin"` or `" admin"` are not roles.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

// --- Resource contract ---

/// Resource
///
/// Describes one administrable table to the generic CRUD controller: where it lives,
/// which fields are mandatory, how its slug is derived, which booleans can be toggled,
/// which flag governs public visibility and how admin lists are ordered.
///
/// JSON keys equal column names, so an entity round-trips through the repository as-is.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    /// Partial payload used by both create and update; absent fields are left untouched.
    type Draft: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static;

    const TABLE: &'static str;
    /// Entity type recorded in the activity log.
    const ENTITY: &'static str;
    /// Human-readable name used in error messages.
    const LABEL: &'static str;
    const SECTION: Section;
    const REQUIRED: &'static [&'static str];
    const SLUG_SOURCE: Option<&'static str> = None;
    const TOGGLES: &'static [&'static str] = &[];
    /// Column that must be true for the row to be visible publicly.
    const VISIBILITY: Option<&'static str> = None;
    /// Column filled with the creating staff member's id.
    const AUTHOR_COLUMN: Option<&'static str> = None;
    const ORDER: &'static [SortKey];

    fn id(&self) -> Uuid;

    /// Fields matched by the free-text search.
    fn search_text(&self) -> Vec<&str>;

    /// Category / team value matched by the facet filter.
    fn facet(&self) -> Option<&str> {
        None
    }

    /// Derived fields, applied before every write.
    fn normalize(&mut self, _now: DateTime<Utc>) {}

    /// Entity-specific rules beyond required fields.
    fn validate(&self, _errors: &mut FieldErrors, _limits: &MediaLimits) {}
}

fn blank_to_none(value: &mut Option<String>) {
    if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
        *value = None;
    }
}

fn default_true() -> bool {
    true
}

// --- Profiles ---

/// Profile
///
/// The staff identity record in `profiles`. `id` mirrors the auth platform user id.
/// `role` is kept as stored so an out-of-range value can be detected and refused.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    #[serde(rename = "nom_complet", default)]
    pub display_name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProfileDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "nom_complet", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Resource for Profile {
    type Draft = ProfileDraft;
    const TABLE: &'static str = "profiles";
    const ENTITY: &'static str = "utilisateur";
    const LABEL: &'static str = "User";
    const SECTION: Section = Section::Users;
    const REQUIRED: &'static [&'static str] = &["email", "role"];
    const ORDER: &'static [SortKey] = &[SortKey::asc("email"), SortKey::asc("created_at")];

    fn id(&self) -> Uuid {
        self.id
    }

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.email.as_str()];
        text.extend(self.display_name.as_deref());
        text
    }

    fn facet(&self) -> Option<&str> {
        Some(&self.role)
    }

    fn normalize(&mut self, _now: DateTime<Utc>) {
        self.email = self.email.trim().to_lowercase();
        blank_to_none(&mut self.display_name);
        blank_to_none(&mut self.avatar_url);
    }

    fn validate(&self, errors: &mut FieldErrors, _limits: &MediaLimits) {
        if self.role.parse::<Role>().is_err() {
            errors.insert(
                "role".to_string(),
                "Role must be one of admin, editor or reader".to_string(),
            );
        }
        if !self.email.contains('@') {
            errors.insert("email".to_string(), "Enter a valid email address".to_string());
        }
    }
}

// --- News ---

/// NewsItem
///
/// A news article from `actualites`. Public only while `publie` is true.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct NewsItem {
    pub id: Uuid,
    #[serde(rename = "titre")]
    pub title: String,
    pub slug: String,
    #[serde(rename = "resume", default)]
    pub summary: Option<String>,
    #[serde(rename = "contenu")]
    pub content: String,
    #[serde(rename = "categorie")]
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(rename = "galerie", default)]
    pub gallery: Vec<String>,
    /// YouTube URLs, in display order.
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(rename = "publie", default)]
    pub published: bool,
    #[serde(rename = "en_vedette", default)]
    pub featured: bool,
    #[serde(rename = "date_publication", default)]
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(rename = "auteur_id", default)]
    pub author_id: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NewsItemDraft {
    #[serde(rename = "titre", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(rename = "resume", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "contenu", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "categorie", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "galerie", skip_serializing_if = "Option::is_none")]
    pub gallery: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<String>>,
    #[serde(rename = "publie", skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(rename = "en_vedette", skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(rename = "date_publication", skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Resource for NewsItem {
    type Draft = NewsItemDraft;
    const TABLE: &'static str = "actualites";
    const ENTITY: &'static str = "actualite";
    const LABEL: &'static str = "News article";
    const SECTION: Section = Section::News;
    const REQUIRED: &'static [&'static str] = &["titre", "contenu", "categorie"];
    const SLUG_SOURCE: Option<&'static str> = Some("titre");
    const TOGGLES: &'static [&'static str] = &["publie", "en_vedette"];
    const VISIBILITY: Option<&'static str> = Some("publie");
    const AUTHOR_COLUMN: Option<&'static str> = Some("auteur_id");
    const ORDER: &'static [SortKey] = &[
        SortKey::desc("date_publication"),
        SortKey::desc("created_at"),
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.title.as_str(), self.content.as_str()];
        text.extend(self.summary.as_deref());
        text
    }

    fn facet(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn normalize(&mut self, now: DateTime<Utc>) {
        blank_to_none(&mut self.summary);
        blank_to_none(&mut self.image_url);
        if self.published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
    }

    fn validate(&self, errors: &mut FieldErrors, limits: &MediaLimits) {
        if self.videos.len() > limits.video_cap {
            errors.insert(
                "videos".to_string(),
                format!("At most {} videos can be attached", limits.video_cap),
            );
        } else {
            let mut ids = Vec::with_capacity(self.videos.len());
            for url in &self.videos {
                match youtube_id(url) {
                    Some(id) if ids.contains(&id) => {
                        errors.insert(
                            "videos".to_string(),
                            format!("Video `{id}` is attached twice"),
                        );
                        break;
                    }
                    Some(id) => ids.push(id),
                    None => {
                        errors.insert(
                            "videos".to_string(),
                            format!("`{url}` is not a YouTube link"),
                        );
                        break;
                    }
                }
            }
        }

        if self.gallery.len() > limits.gallery_cap {
            errors.insert(
                "galerie".to_string(),
                format!("The gallery is limited to {} images", limits.gallery_cap),
            );
        } else if self
            .gallery
            .iter()
            .enumerate()
            .any(|(i, url)| self.gallery[..i].contains(url))
        {
            errors.insert(
                "galerie".to_string(),
                "An image appears twice in the gallery".to_string(),
            );
        }
    }
}

// --- Documents ---

/// Document
///
/// A downloadable legal text or form from `documents`. The file itself lives on the CDN.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Document {
    pub id: Uuid,
    #[serde(rename = "titre")]
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "categorie")]
    pub category: String,
    #[serde(rename = "fichier_url")]
    pub file_url: String,
    #[serde(rename = "taille_octets", default)]
    pub file_size: Option<i64>,
    #[serde(rename = "publie", default)]
    pub published: bool,
    #[serde(rename = "ordre", default)]
    pub position: i32,
    #[serde(rename = "auteur_id", default)]
    pub author_id: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DocumentDraft {
    #[serde(rename = "titre", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "categorie", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "fichier_url", skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(rename = "taille_octets", skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(rename = "publie", skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(rename = "ordre", skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
}

impl Resource for Document {
    type Draft = DocumentDraft;
    const TABLE: &'static str = "documents";
    const ENTITY: &'static str = "document";
    const LABEL: &'static str = "Document";
    const SECTION: Section = Section::Documents;
    const REQUIRED: &'static [&'static str] = &["titre", "categorie", "fichier_url"];
    const SLUG_SOURCE: Option<&'static str> = Some("titre");
    const TOGGLES: &'static [&'static str] = &["publie"];
    const VISIBILITY: Option<&'static str> = Some("publie");
    const AUTHOR_COLUMN: Option<&'static str> = Some("auteur_id");
    const ORDER: &'static [SortKey] = &[SortKey::asc("ordre"), SortKey::desc("created_at")];

    fn id(&self) -> Uuid {
        self.id
    }

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.title.as_str()];
        text.extend(self.description.as_deref());
        text
    }

    fn facet(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn normalize(&mut self, _now: DateTime<Utc>) {
        blank_to_none(&mut self.description);
    }
}

// --- Services ---

/// Service
///
/// One of the agency's public services, from `services`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Service {
    pub id: Uuid,
    #[serde(rename = "titre")]
    pub title: String,
    pub slug: String,
    #[serde(rename = "resume", default)]
    pub summary: Option<String>,
    pub description: String,
    #[serde(rename = "icone", default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(rename = "ordre", default)]
    pub position: i32,
    #[serde(rename = "publie", default)]
    pub published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ServiceDraft {
    #[serde(rename = "titre", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(rename = "resume", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "icone", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "ordre", skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(rename = "publie", skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl Resource for Service {
    type Draft = ServiceDraft;
    const TABLE: &'static str = "services";
    const ENTITY: &'static str = "service";
    const LABEL: &'static str = "Service";
    const SECTION: Section = Section::Services;
    const REQUIRED: &'static [&'static str] = &["titre", "description"];
    const SLUG_SOURCE: Option<&'static str> = Some("titre");
    const TOGGLES: &'static [&'static str] = &["publie"];
    const VISIBILITY: Option<&'static str> = Some("publie");
    const ORDER: &'static [SortKey] = &[SortKey::asc("ordre"), SortKey::asc("created_at")];

    fn id(&self) -> Uuid {
        self.id
    }

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.title.as_str(), self.description.as_str()];
        text.extend(self.summary.as_deref());
        text
    }

    fn normalize(&mut self, _now: DateTime<Utc>) {
        blank_to_none(&mut self.summary);
        blank_to_none(&mut self.icon);
        blank_to_none(&mut self.image_url);
    }
}

// --- Personnel ---

/// StaffMember
///
/// A personnel record from `personnel`, shown on the organizational structure page
/// while `actif` is true.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct StaffMember {
    pub id: Uuid,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "poste")]
    pub position_title: String,
    #[serde(rename = "equipe")]
    pub team: String,
    #[serde(rename = "biographie", default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "ordre", default)]
    pub position: i32,
    #[serde(rename = "actif", default = "default_true")]
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StaffMemberDraft {
    #[serde(rename = "nom", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "poste", skip_serializing_if = "Option::is_none")]
    pub position_title: Option<String>,
    #[serde(rename = "equipe", skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(rename = "biographie", skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "ordre", skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(rename = "actif", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl Resource for StaffMember {
    type Draft = StaffMemberDraft;
    const TABLE: &'static str = "personnel";
    const ENTITY: &'static str = "personnel";
    const LABEL: &'static str = "Staff member";
    const SECTION: Section = Section::Personnel;
    const REQUIRED: &'static [&'static str] = &["nom", "poste", "equipe"];
    const TOGGLES: &'static [&'static str] = &["actif"];
    const VISIBILITY: Option<&'static str> = Some("actif");
    const ORDER: &'static [SortKey] = &[SortKey::asc("ordre"), SortKey::asc("created_at")];

    fn id(&self) -> Uuid {
        self.id
    }

    fn search_text(&self) -> Vec<&str> {
        let mut text = vec![self.name.as_str(), self.position_title.as_str()];
        text.extend(self.biography.as_deref());
        text
    }

    fn facet(&self) -> Option<&str> {
        Some(&self.team)
    }

    fn normalize(&mut self, _now: DateTime<Utc>) {
        blank_to_none(&mut self.biography);
        blank_to_none(&mut self.photo_url);
        blank_to_none(&mut self.email);
    }
}

// --- Did-you-know notes ---

/// Note
///
/// A short "did you know" fact from `le_saviez_vous`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Note {
    pub id: Uuid,
    #[serde(rename = "titre")]
    pub title: String,
    #[serde(rename = "contenu")]
    pub content: String,
    #[serde(rename = "categorie", default)]
    pub category: Option<String>,
    #[serde(rename = "ordre", default)]
    pub position: i32,
    #[serde(rename = "publie", default)]
    pub published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NoteDraft {
    #[serde(rename = "titre", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "contenu", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "categorie", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "ordre", skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(rename = "publie", skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl Resource for Note {
    type Draft = NoteDraft;
    const TABLE: &'static str = "le_saviez_vous";
    const ENTITY: &'static str = "le_saviez_vous";
    const LABEL: &'static str = "Note";
    const SECTION: Section = Section::Notes;
    const REQUIRED: &'static [&'static str] = &["titre", "contenu"];
    const TOGGLES: &'static [&'static str] = &["publie"];
    const VISIBILITY: Option<&'static str> = Some("publie");
    const ORDER: &'static [SortKey] = &[SortKey::asc("ordre"), SortKey::asc("created_at")];

    fn id(&self) -> Uuid {
        self.id
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.content.as_str()]
    }

    fn facet(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn normalize(&mut self, _now: DateTime<Utc>) {
        blank_to_none(&mut self.category);
    }
}

// --- Site statistics ---

/// SiteStatistic
///
/// A headline figure for the home page ("15 years of service"), from `statistiques_site`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct SiteStatistic {
    pub id: Uuid,
    #[serde(rename = "libelle")]
    pub label: String,
    #[serde(rename = "valeur")]
    pub value: String,
    #[serde(rename = "icone", default)]
    pub icon: Option<String>,
    #[serde(rename = "ordre", default)]
    pub position: i32,
    #[serde(rename = "actif", default = "default_true")]
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SiteStatisticDraft {
    #[serde(rename = "libelle", skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "valeur", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "icone", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(rename = "ordre", skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(rename = "actif", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl Resource for SiteStatistic {
    type Draft = SiteStatisticDraft;
    const TABLE: &'static str = "statistiques_site";
    const ENTITY: &'static str = "statistique_site";
    const LABEL: &'static str = "Site statistic";
    const SECTION: Section = Section::SiteStatistics;
    const REQUIRED: &'static [&'static str] = &["libelle", "valeur"];
    const TOGGLES: &'static [&'static str] = &["actif"];
    const VISIBILITY: Option<&'static str> = Some("actif");
    const ORDER: &'static [SortKey] = &[SortKey::asc("ordre"), SortKey::asc("created_at")];

    fn id(&self) -> Uuid {
        self.id
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.label.as_str(), self.value.as_str()]
    }
}

// --- Revenue statistics ---

/// RevenueStatistic
///
/// One collected amount from `statistiques_recettes`, aggregated in memory for the
/// dashboard and the public revenue page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct RevenueStatistic {
    pub id: Uuid,
    #[serde(rename = "annee")]
    pub year: i32,
    #[serde(rename = "mois", default)]
    pub month: Option<i32>,
    #[serde(rename = "type_recette")]
    pub revenue_type: String,
    #[serde(rename = "montant")]
    pub amount: f64,
    #[serde(rename = "devise")]
    pub currency: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RevenueStatisticDraft {
    #[serde(rename = "annee", skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(rename = "mois", skip_serializing_if = "Option::is_none")]
    pub month: Option<i32>,
    #[serde(rename = "type_recette", skip_serializing_if = "Option::is_none")]
    pub revenue_type: Option<String>,
    #[serde(rename = "montant", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(rename = "devise", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl Resource for RevenueStatistic {
    type Draft = RevenueStatisticDraft;
    const TABLE: &'static str = "statistiques_recettes";
    const ENTITY: &'static str = "statistique_recette";
    const LABEL: &'static str = "Revenue statistic";
    const SECTION: Section = Section::Revenue;
    const REQUIRED: &'static [&'static str] = &["annee", "type_recette", "montant", "devise"];
    const ORDER: &'static [SortKey] = &[
        SortKey::desc("annee"),
        SortKey::desc("mois"),
        SortKey::asc("created_at"),
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.revenue_type.as_str()]
    }

    fn facet(&self) -> Option<&str> {
        Some(&self.currency)
    }

    fn normalize(&mut self, _now: DateTime<Utc>) {
        self.currency = self.currency.trim().to_uppercase();
    }

    fn validate(&self, errors: &mut FieldErrors, _limits: &MediaLimits) {
        if !(1900..=2100).contains(&self.year) {
            errors.insert("annee".to_string(), "Year must be between 1900 and 2100".to_string());
        }
        if self.month.is_some_and(|m| !(1..=12).contains(&m)) {
            errors.insert("mois".to_string(), "Month must be between 1 and 12".to_string());
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            errors.insert("montant".to_string(), "Amount must be a positive number".to_string());
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            errors.insert(
                "devise".to_string(),
                "Currency must be a three-letter code such as CDF or USD".to_string(),
            );
        }
    }
}

// --- Activity log ---

/// ActivityAction
///
/// The closed set of audited actions, stored upper-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ActivityAction {
    Login,
    Logout,
    Create,
    Update,
    Delete,
    View,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Login => "LOGIN",
            ActivityAction::Logout => "LOGOUT",
            ActivityAction::Create => "CREATE",
            ActivityAction::Update => "UPDATE",
            ActivityAction::Delete => "DELETE",
            ActivityAction::View => "VIEW",
        }
    }
}

/// ActivityLogEntry
///
/// Append-only audit row in `journal_activites`. Never updated or deleted by the service.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub action: ActivityAction,
    pub entity_type: String,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

pub const ACTIVITY_TABLE: &str = "journal_activites";

// --- Request payloads ---

/// LoginRequest
///
/// Password sign-in. The password is forwarded to the auth platform and never stored or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Admin path to return to after sign-in.
    #[serde(default)]
    pub redirect: Option<String>,
}

/// CreateUserRequest
///
/// Admin-created staff account: the auth user is created server-side, then its profile row.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "nom_complet", default)]
    pub display_name: Option<String>,
    pub role: String,
}

/// SelfProfileUpdate
///
/// Self-service edit: only the display name and avatar, never the role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SelfProfileUpdate {
    #[serde(rename = "nom_complet", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}
