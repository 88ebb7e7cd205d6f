use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use serde::Serialize;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{AuthProvider, access_token},
    config::{AppConfig, Env},
    error::AppError,
    models::{Profile, Resource, Role},
    repository::{Repository, find_as},
};

/// Section
///
/// The administrable screens. Every admin handler belongs to exactly one section,
/// and the section's entry in `NAVIGATION` decides which roles may use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Section {
    Dashboard,
    News,
    Documents,
    Services,
    Personnel,
    Notes,
    SiteStatistics,
    Revenue,
    Media,
    Users,
    Activity,
    Account,
}

/// NavItem
///
/// One entry of the admin navigation: label, target path and allowed roles.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NavItem {
    pub section: Section,
    pub label: &'static str,
    pub path: &'static str,
    #[serde(skip)]
    pub roles: &'static [Role],
}

const STAFF: &[Role] = &[Role::Admin, Role::Editor];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

const fn nav(
    section: Section,
    label: &'static str,
    path: &'static str,
    roles: &'static [Role],
) -> NavItem {
    NavItem {
        section,
        label,
        path,
        roles,
    }
}

/// The admin navigation, in display order.
pub static NAVIGATION: &[NavItem] = &[
    nav(Section::Dashboard, "Tableau de bord", "/admin", STAFF),
    nav(Section::News, "Actualités", "/admin/actualites", STAFF),
    nav(Section::Documents, "Documents", "/admin/documents", STAFF),
    nav(Section::Services, "Services", "/admin/services", STAFF),
    nav(Section::Personnel, "Personnel", "/admin/personnel", STAFF),
    nav(Section::Notes, "Le saviez-vous", "/admin/le-saviez-vous", STAFF),
    nav(Section::SiteStatistics, "Chiffres clés", "/admin/statistiques", STAFF),
    nav(Section::Revenue, "Recettes", "/admin/recettes", STAFF),
    nav(Section::Media, "Médiathèque", "/admin/medias", STAFF),
    nav(Section::Users, "Utilisateurs", "/admin/utilisateurs", ADMIN_ONLY),
    nav(Section::Activity, "Journal d'activités", "/admin/journal", ADMIN_ONLY),
    nav(Section::Account, "Mon profil", "/admin/profil", STAFF),
];

/// navigation_for
///
/// The navigation entries whose allowed-role set contains `role`.
pub fn navigation_for(role: Role) -> Vec<NavItem> {
    NAVIGATION
        .iter()
        .filter(|item| item.roles.contains(&role))
        .copied()
        .collect()
}

/// Admin screen path of a section, used to point clients back at a list view.
pub fn section_path(section: Section) -> &'static str {
    NAVIGATION
        .iter()
        .find(|item| item.section == section)
        .map(|item| item.path)
        .unwrap_or("/admin")
}

pub fn allowed(role: Role, section: Section) -> bool {
    NAVIGATION
        .iter()
        .find(|item| item.section == section)
        .is_some_and(|item| item.roles.contains(&role))
}

/// SessionUser
///
/// A signed-in staff member with a valid role, resolved once per request.
#[derive(Debug, Clone, PartialEq, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub avatar_url: Option<String>,
}

impl SessionUser {
    /// Name shown in the admin header and recorded in the activity log.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }

    /// Per-screen capability check, after the gate has admitted the request.
    pub fn require(&self, section: Section) -> Result<(), AppError> {
        if allowed(self.role, section) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.id,
                role = %self.role,
                ?section,
                "section access denied"
            );
            Err(AppError::Forbidden)
        }
    }
}

impl TryFrom<Profile> for SessionUser {
    type Error = AppError;

    fn try_from(profile: Profile) -> Result<Self, Self::Error> {
        let role = profile.role.parse::<Role>().map_err(|_| AppError::Forbidden)?;
        Ok(SessionUser {
            id: profile.id,
            email: profile.email,
            display_name: profile.display_name,
            role,
            avatar_url: profile.avatar_url,
        })
    }
}

/// SessionUser Extractor
///
/// Handlers behind the role gate take `SessionUser` as an argument. The gate stores
/// it in the request extensions; a handler mounted without the gate gets a 401.
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// SessionState
///
/// The three outcomes of a session lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No token, or a token the auth platform rejects.
    Anonymous,
    /// Authenticated, but without a profile carrying a valid role.
    Unauthorized { user_id: Uuid },
    Active(SessionUser),
}

impl SessionState {
    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            SessionState::Active(user) => Some(user),
            _ => None,
        }
    }
}

/// resolve_session
///
/// Derives the caller's identity from the request headers and then its role from the
/// profile table. Any failure on the way is treated as no session.
///
/// In `Env::Local` an `x-user-id` header naming an existing profile stands in for a token.
pub async fn resolve_session(
    headers: &HeaderMap,
    repo: &dyn Repository,
    auth: &dyn AuthProvider,
    config: &AppConfig,
) -> SessionState {
    if config.env == Env::Local {
        if let Some(user_id) = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
        {
            return session_for(repo, user_id).await;
        }
    }

    let Some(token) = access_token(headers) else {
        return SessionState::Anonymous;
    };

    match auth.current_user(&token).await {
        Ok(identity) => session_for(repo, identity.id).await,
        Err(e) => {
            tracing::debug!(error = %e, "session token not accepted");
            SessionState::Anonymous
        }
    }
}

async fn session_for(repo: &dyn Repository, user_id: Uuid) -> SessionState {
    match find_as::<Profile>(repo, Profile::TABLE, user_id).await {
        Ok(Some(profile)) => match SessionUser::try_from(profile) {
            Ok(user) => SessionState::Active(user),
            Err(_) => SessionState::Unauthorized { user_id },
        },
        Ok(None) => SessionState::Unauthorized { user_id },
        Err(e) => {
            tracing::warn!(error = %e, %user_id, "profile lookup failed, treating as signed out");
            SessionState::Anonymous
        }
    }
}
