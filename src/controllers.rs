use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::{AppError, FieldErrors},
    media::MediaLimits,
    models::Resource,
    repository::{RepoError, RepositoryState, TableQuery, find_as, select_as},
    slug::{fold, slugify, with_suffix},
};

/// Upper bound on `-2`, `-3`, ... attempts before a slug collision is reported.
const MAX_SLUG_ATTEMPTS: usize = 100;

/// ListFilter
///
/// Free-text search and facet (category, team, role...) applied in memory to the
/// fetched list. Both are case- and accent-insensitive.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilter {
    #[serde(default, alias = "q")]
    pub search: Option<String>,
    #[serde(default)]
    pub facet: Option<String>,
}

/// ListResponse
///
/// The filtered list plus the size of the unfiltered set, so the admin list can show
/// "3 of 42".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// ResourceController
///
/// Generic CRUD over one `Resource` table. Holds the list the admin screen displays;
/// delete and toggle keep that list current without a refetch.
///
/// Every mutating method takes `&mut self`: a controller has at most one write in
/// flight, the same way the admin form disables its submit control while saving.
pub struct ResourceController<T: Resource> {
    repo: RepositoryState,
    limits: MediaLimits,
    items: Vec<T>,
}

impl<T: Resource> ResourceController<T> {
    pub fn new(repo: RepositoryState) -> Self {
        Self {
            repo,
            limits: MediaLimits::default(),
            items: Vec::new(),
        }
    }

    /// Caps checked against attached galleries and videos.
    pub fn with_limits(mut self, limits: MediaLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Fetches the whole table in display order.
    pub async fn load(&mut self) -> Result<&[T], AppError> {
        let query = TableQuery::new(T::TABLE).order_by(T::ORDER);
        self.items = select_as(self.repo.as_ref(), &query).await?;
        Ok(&self.items)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// visible
    ///
    /// The loaded items matching `filter`, order preserved.
    pub fn visible(&self, filter: &ListFilter) -> Vec<&T> {
        let needle = filter
            .search
            .as_deref()
            .map(fold)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let facet = filter
            .facet
            .as_deref()
            .map(fold)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        self.items
            .iter()
            .filter(|item| match &needle {
                Some(needle) => item
                    .search_text()
                    .iter()
                    .any(|text| fold(text).contains(needle.as_str())),
                None => true,
            })
            .filter(|item| match &facet {
                Some(facet) => item.facet().is_some_and(|value| fold(value).trim() == facet),
                None => true,
            })
            .collect()
    }

    pub async fn find(&self, id: Uuid) -> Result<T, AppError> {
        find_as::<T>(self.repo.as_ref(), T::TABLE, id)
            .await?
            .ok_or_else(|| AppError::NotFound(T::LABEL.to_string()))
    }

    /// create
    ///
    /// Checks required fields, derives a unique slug where the type has one, fills
    /// id / timestamps / author and writes the row. Nothing is written on a
    /// validation error.
    pub async fn create(&mut self, draft: T::Draft, author: Option<Uuid>) -> Result<T, AppError> {
        self.create_with_id(Uuid::new_v4(), draft, author).await
    }

    /// Same as `create`, for rows whose id is dictated elsewhere (profiles mirror auth users).
    pub async fn create_with_id(
        &mut self,
        id: Uuid,
        draft: T::Draft,
        author: Option<Uuid>,
    ) -> Result<T, AppError> {
        let mut row = draft_object(&draft)?;
        AppError::check(missing_fields::<T>(&row))?;

        let now = Utc::now();
        row.insert("id".to_string(), json!(id));
        row.insert("created_at".to_string(), json!(now));
        row.insert("updated_at".to_string(), json!(now));
        if let (Some(column), Some(author)) = (T::AUTHOR_COLUMN, author) {
            row.insert(column.to_string(), json!(author));
        }
        if let Some(source) = T::SLUG_SOURCE {
            let slug = self.unique_slug(&row, source, None).await?;
            row.insert("slug".to_string(), Value::String(slug));
        }

        let mut item = decode_row::<T>(row)?;
        item.normalize(now);
        validate(&item, &self.limits)?;

        let stored = self
            .repo
            .insert(T::TABLE, serde_json::to_value(&item).map_err(RepoError::from)?)
            .await?;
        let item: T = serde_json::from_value(stored).map_err(RepoError::from)?;

        tracing::info!(table = T::TABLE, id = %item.id(), "row created");
        self.items.push(item.clone());
        Ok(item)
    }

    /// update
    ///
    /// Applies the fields present in `draft` to the stored row. The slug only changes
    /// when the draft carries one explicitly.
    pub async fn update(&mut self, id: Uuid, draft: T::Draft) -> Result<T, AppError> {
        let current = self.find(id).await?;
        let before = object_of(&current)?;

        let changes = draft_object(&draft)?;
        let mut row = before.clone();
        row.extend(changes.clone());
        AppError::check(missing_fields::<T>(&row))?;

        if T::SLUG_SOURCE.is_some() {
            match changes.get("slug") {
                Some(Value::String(requested)) if requested.trim().is_empty() => {
                    return Err(AppError::field("slug", "The URL identifier cannot be empty"));
                }
                Some(_) => {
                    let slug = self.unique_slug(&row, "slug", Some(id)).await?;
                    row.insert("slug".to_string(), Value::String(slug));
                }
                None => {}
            }
        }

        let now = Utc::now();
        row.insert("updated_at".to_string(), json!(now));
        let mut item = decode_row::<T>(row)?;
        item.normalize(now);
        validate(&item, &self.limits)?;

        let patch = changed_columns(&before, &object_of(&item)?);
        let stored = self
            .repo
            .update(T::TABLE, id, Value::Object(patch))
            .await?
            .ok_or_else(|| AppError::NotFound(T::LABEL.to_string()))?;
        let item: T = serde_json::from_value(stored).map_err(RepoError::from)?;

        tracing::info!(table = T::TABLE, %id, "row updated");
        self.replace(item.clone());
        Ok(item)
    }

    /// delete
    ///
    /// Refuses without explicit confirmation. On success the item also leaves the
    /// in-memory list; on failure the list is untouched.
    pub async fn delete(&mut self, id: Uuid, confirmed: bool) -> Result<(), AppError> {
        if !confirmed {
            return Err(AppError::ConfirmationRequired);
        }
        if !self.repo.delete(T::TABLE, id).await? {
            return Err(AppError::NotFound(T::LABEL.to_string()));
        }

        tracing::info!(table = T::TABLE, %id, "row deleted");
        self.items.retain(|item| item.id() != id);
        Ok(())
    }

    /// toggle
    ///
    /// Flips one of the type's boolean flags. The in-memory item changes first and is
    /// put back exactly as it was if the write fails.
    pub async fn toggle(&mut self, id: Uuid, flag: &str) -> Result<T, AppError> {
        if !T::TOGGLES.iter().any(|toggle| *toggle == flag) {
            return Err(AppError::field(flag, format!("`{flag}` cannot be toggled")));
        }

        let position = match self.items.iter().position(|item| item.id() == id) {
            Some(position) => position,
            None => {
                let item = self.find(id).await?;
                self.items.push(item);
                self.items.len() - 1
            }
        };

        let previous = self.items[position].clone();
        let before = object_of(&previous)?;
        let mut row = before.clone();
        let current = row.get(flag).and_then(Value::as_bool).unwrap_or(false);
        row.insert(flag.to_string(), Value::Bool(!current));

        let now = Utc::now();
        row.insert("updated_at".to_string(), json!(now));
        let mut flipped = decode_row::<T>(row)?;
        flipped.normalize(now);

        let patch = changed_columns(&before, &object_of(&flipped)?);
        self.items[position] = flipped;

        let result = self.repo.update(T::TABLE, id, Value::Object(patch)).await;
        match result {
            Ok(Some(stored)) => {
                let stored: T = match serde_json::from_value(stored) {
                    Ok(stored) => stored,
                    Err(e) => {
                        self.items[position] = previous;
                        return Err(RepoError::from(e).into());
                    }
                };
                tracing::info!(table = T::TABLE, %id, flag, value = !current, "flag toggled");
                self.items[position] = stored.clone();
                Ok(stored)
            }
            Ok(None) => {
                self.items.remove(position);
                Err(AppError::NotFound(T::LABEL.to_string()))
            }
            Err(e) => {
                tracing::warn!(table = T::TABLE, %id, flag, "toggle failed, reverting");
                self.items[position] = previous;
                Err(e.into())
            }
        }
    }

    fn replace(&mut self, item: T) {
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    /// First free candidate among `slugify(row[source])`, `-2`, `-3`, ... ignoring `own_id`.
    async fn unique_slug(
        &self,
        row: &Map<String, Value>,
        source: &str,
        own_id: Option<Uuid>,
    ) -> Result<String, AppError> {
        let explicit = row
            .get("slug")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty());
        let (field, raw) = match explicit {
            Some(slug) => ("slug", slug),
            None => (source, row.get(source).and_then(Value::as_str).unwrap_or_default()),
        };

        let base = slugify(raw);
        if base.is_empty() {
            return Err(AppError::field(
                field,
                "Cannot derive a URL identifier: use at least one letter or digit",
            ));
        }

        let own_id = own_id.map(|id| id.to_string());
        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let candidate = with_suffix(&base, attempt);
            let query = TableQuery::new(T::TABLE).eq("slug", candidate.as_str());
            let taken = self
                .repo
                .select(&query)
                .await?
                .iter()
                .any(|row| row.get("id").and_then(Value::as_str) != own_id.as_deref());
            if !taken {
                return Ok(candidate);
            }
        }

        Err(AppError::field(field, "This URL identifier is already in use"))
    }
}

fn draft_object<D: Serialize>(draft: &D) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(draft).map_err(RepoError::from)? {
        Value::Object(map) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        _ => Ok(Map::new()),
    }
}

fn object_of<T: Serialize>(item: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(item).map_err(RepoError::from)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Required columns that are absent, null or blank.
fn missing_fields<T: Resource>(row: &Map<String, Value>) -> FieldErrors {
    T::REQUIRED
        .iter()
        .filter(|column| match row.get(**column) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        })
        .map(|column| (column.to_string(), "This field is required".to_string()))
        .collect()
}

fn decode_row<T: Resource>(row: Map<String, Value>) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| AppError::Validation {
        message: format!("Invalid {}: {e}", T::LABEL.to_lowercase()),
        fields: FieldErrors::new(),
    })
}

fn validate<T: Resource>(item: &T, limits: &MediaLimits) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    item.validate(&mut errors, limits);
    AppError::check(errors)
}

/// Columns of `after` whose value differs from `before`.
fn changed_columns(before: &Map<String, Value>, after: &Map<String, Value>) -> Map<String, Value> {
    after
        .iter()
        .filter(|(column, value)| {
            column.as_str() != "id" && before.get(column.as_str()) != Some(*value)
        })
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect()
}
