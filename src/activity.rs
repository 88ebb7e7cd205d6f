use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    auth::AuthState,
    models::{ACTIVITY_TABLE, ActivityAction, ActivityLogEntry, Profile, Resource},
    repository::{RepoError, RepositoryState, SortKey, TableQuery, find_as, select_as},
    session::SessionUser,
};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

/// Who performed an action. Every field may be empty when the actor cannot be resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actor {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl From<&SessionUser> for Actor {
    fn from(user: &SessionUser) -> Self {
        Actor {
            id: Some(user.id),
            email: Some(user.email.clone()),
            name: Some(user.name().to_string()),
        }
    }
}

/// ActivityEvent
///
/// What happened, to which entity. Built with `ActivityEvent::new(..).entity(..).details(..)`.
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub action: ActivityAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Value,
}

impl ActivityEvent {
    pub fn new(action: ActivityAction, entity_type: &str) -> Self {
        Self {
            action,
            entity_type: entity_type.to_string(),
            entity_id: None,
            details: Value::Object(Default::default()),
        }
    }

    pub fn entity(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityFilter {
    pub action: Option<ActivityAction>,
    pub entity_type: Option<String>,
    pub limit: Option<i64>,
}

/// ActivityLogger
///
/// Best-effort audit trail. `record` spawns the write and returns immediately; the
/// caller's operation never waits on it and never sees its failure.
#[derive(Clone)]
pub struct ActivityLogger {
    repo: RepositoryState,
    auth: AuthState,
}

impl ActivityLogger {
    pub fn new(repo: RepositoryState, auth: AuthState) -> Self {
        Self { repo, auth }
    }

    /// Spawns `log` on the runtime. The handle is only useful to tests.
    pub fn record(
        &self,
        event: ActivityEvent,
        actor: Option<Actor>,
        access_token: Option<String>,
    ) -> JoinHandle<()> {
        let logger = self.clone();
        tokio::spawn(async move { logger.log(event, actor, access_token).await })
    }

    /// Writes the entry, reporting any failure through `tracing` only.
    pub async fn log(
        &self,
        event: ActivityEvent,
        actor: Option<Actor>,
        access_token: Option<String>,
    ) {
        let action = event.action;
        let entity_type = event.entity_type.clone();
        if let Err(e) = self.write(event, actor, access_token.as_deref()).await {
            tracing::warn!(
                error = %e,
                action = action.as_str(),
                %entity_type,
                "activity log write failed"
            );
        }
    }

    pub async fn write(
        &self,
        event: ActivityEvent,
        actor: Option<Actor>,
        access_token: Option<&str>,
    ) -> Result<ActivityLogEntry, RepoError> {
        let actor = match actor {
            Some(actor) => actor,
            None => self.resolve_actor(access_token).await,
        };

        let entry = ActivityLogEntry {
            id: Uuid::new_v4(),
            user_id: actor.id,
            user_email: actor.email,
            user_name: actor.name,
            action: event.action,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            details: event.details,
            created_at: Utc::now(),
        };

        let stored = self
            .repo
            .insert(ACTIVITY_TABLE, serde_json::to_value(&entry)?)
            .await?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Fresh session lookup for callers that did not supply an actor.
    async fn resolve_actor(&self, access_token: Option<&str>) -> Actor {
        let Some(token) = access_token else {
            return Actor::default();
        };
        let identity = match self.auth.current_user(token).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(error = %e, "activity actor could not be resolved");
                return Actor::default();
            }
        };

        match find_as::<Profile>(self.repo.as_ref(), Profile::TABLE, identity.id).await {
            Ok(Some(profile)) => Actor {
                id: Some(profile.id),
                name: Some(profile.display_name.unwrap_or_else(|| profile.email.clone())),
                email: Some(profile.email),
            },
            _ => Actor {
                id: Some(identity.id),
                email: Some(identity.email).filter(|e| !e.is_empty()),
                name: None,
            },
        }
    }

    /// Newest entries first, optionally narrowed by action and entity type.
    pub async fn recent(
        &self,
        filter: &ActivityFilter,
    ) -> Result<Vec<ActivityLogEntry>, RepoError> {
        let mut query = TableQuery::new(ACTIVITY_TABLE)
            .order_by(&[SortKey::desc("created_at")])
            .limit(filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT));
        if let Some(action) = filter.action {
            query = query.eq("action", action.as_str());
        }
        if let Some(entity_type) = filter.entity_type.as_deref().filter(|t| !t.is_empty()) {
            query = query.eq("entity_type", entity_type);
        }
        select_as(self.repo.as_ref(), &query).await
    }
}
