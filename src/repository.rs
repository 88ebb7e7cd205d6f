use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder, types::Json};
use uuid::Uuid;

/// RepoError
///
/// Failure of a call against the tabular data API. Always surfaced to the caller as a
/// human-readable message; never partially applied.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("row could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("data service unavailable: {0}")]
    Unavailable(String),
}

/// SortKey
///
/// One `ORDER BY` term. Nulls always sort last, whatever the direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortKey {
    pub column: &'static str,
    pub descending: bool,
}

impl SortKey {
    pub const fn asc(column: &'static str) -> Self {
        Self { column, descending: false }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self { column, descending: true }
    }
}

/// TableQuery
///
/// A select against one table: equality filters, ordering and an optional limit.
/// Column names are code constants, never request input.
#[derive(Debug, Clone)]
pub struct TableQuery {
    pub table: &'static str,
    pub filters: Vec<(&'static str, Value)>,
    pub order: Vec<SortKey>,
    pub limit: Option<i64>,
}

impl TableQuery {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push((column, value.into()));
        self
    }

    pub fn order_by(mut self, keys: &[SortKey]) -> Self {
        self.order.extend_from_slice(keys);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Repository Trait
///
/// The tabular data API of the hosted database: per-table select / count / insert /
/// update / insert-if-absent / delete. Rows travel as JSON objects whose keys are the column
/// names, which keeps the trait object-safe (`Arc<dyn Repository>`) while the typed
/// helpers below decode into the entity structs.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>, RepoError>;

    async fn count(&self, query: &TableQuery) -> Result<i64, RepoError>;

    /// Inserts a complete row and returns it as stored.
    async fn insert(&self, table: &'static str, row: Value) -> Result<Value, RepoError>;

    /// Overwrites the columns present in `patch` on the row `id`. `None` if no such row.
    async fn update(
        &self,
        table: &'static str,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, RepoError>;

    /// Inserts a complete row unless one with the same `id` exists. `None` leaves the
    /// existing row untouched.
    async fn insert_if_absent(
        &self,
        table: &'static str,
        row: Value,
    ) -> Result<Option<Value>, RepoError>;

    /// Returns true only if a row was removed.
    async fn delete(&self, table: &'static str, id: Uuid) -> Result<bool, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Typed helpers ---

pub async fn select_as<T: DeserializeOwned>(
    repo: &dyn Repository,
    query: &TableQuery,
) -> Result<Vec<T>, RepoError> {
    repo.select(query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(RepoError::from))
        .collect()
}

pub async fn find_as<T: DeserializeOwned>(
    repo: &dyn Repository,
    table: &'static str,
    id: Uuid,
) -> Result<Option<T>, RepoError> {
    let query = TableQuery::new(table).eq("id", id.to_string()).limit(1);
    Ok(select_as(repo, &query).await?.into_iter().next())
}

fn identifier(name: &str) -> Result<&str, RepoError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(RepoError::InvalidIdentifier(name.to_string()))
    }
}

fn object_keys(row: &Value) -> Result<Vec<String>, RepoError> {
    let object = row
        .as_object()
        .ok_or_else(|| RepoError::InvalidIdentifier("row is not a JSON object".to_string()))?;
    object
        .keys()
        .map(|k| identifier(k).map(str::to_string))
        .collect()
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the hosted Postgres.
/// Queries are assembled with `QueryBuilder` so every value is a bound parameter;
/// rows are read with `to_jsonb` and written with `jsonb_populate_record`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_where(
        builder: &mut QueryBuilder<'_, Postgres>,
        filters: &[(&'static str, Value)],
    ) -> Result<(), RepoError> {
        for (i, (column, value)) in filters.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            // Key columns compare natively so the primary key and slug indexes apply.
            match (*column, value) {
                ("id", Value::String(raw)) => match Uuid::parse_str(raw) {
                    Ok(id) => {
                        builder.push("t.id = ");
                        builder.push_bind(id);
                    }
                    Err(_) => {
                        builder.push("FALSE");
                    }
                },
                ("slug", Value::String(slug)) => {
                    builder.push("t.slug = ");
                    builder.push_bind(slug.clone());
                }
                _ => {
                    builder.push(format!("(to_jsonb(t) -> '{}') = ", identifier(column)?));
                    builder.push_bind(Json(value.clone()));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>, RepoError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT to_jsonb(t) FROM {} t",
            identifier(query.table)?
        ));
        Self::push_where(&mut builder, &query.filters)?;

        for (i, key) in query.order.iter().enumerate() {
            builder.push(if i == 0 { " ORDER BY " } else { ", " });
            builder.push(format!(
                "t.{} {} NULLS LAST",
                identifier(key.column)?,
                if key.descending { "DESC" } else { "ASC" }
            ));
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let rows = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|Json(row)| row).collect())
    }

    async fn count(&self, query: &TableQuery) -> Result<i64, RepoError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM {} t",
            identifier(query.table)?
        ));
        Self::push_where(&mut builder, &query.filters)?;

        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    async fn insert(&self, table: &'static str, row: Value) -> Result<Value, RepoError> {
        let table = identifier(table)?;
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} AS t SELECT * FROM jsonb_populate_record(NULL::{table}, "
        ));
        builder.push_bind(Json(row));
        builder.push(") RETURNING to_jsonb(t)");

        let Json(stored) = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_one(&self.pool)
            .await?;
        Ok(stored)
    }

    async fn update(
        &self,
        table: &'static str,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, RepoError> {
        let table = identifier(table)?;
        let columns: Vec<String> = object_keys(&patch)?
            .into_iter()
            .filter(|c| c != "id")
            .collect();
        if columns.is_empty() {
            return find_as(self, table, id).await;
        }

        let assignments = columns
            .iter()
            .map(|c| format!("{c} = r.{c}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "UPDATE {table} AS t SET {assignments} FROM jsonb_populate_record(NULL::{table}, "
        ));
        builder.push_bind(Json(patch));
        builder.push(") AS r WHERE t.id = ");
        builder.push_bind(id);
        builder.push(" RETURNING to_jsonb(t)");

        let row = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(row)| row))
    }

    async fn insert_if_absent(
        &self,
        table: &'static str,
        row: Value,
    ) -> Result<Option<Value>, RepoError> {
        let table = identifier(table)?;
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {table} AS t SELECT * FROM jsonb_populate_record(NULL::{table}, "
        ));
        builder.push_bind(Json(row));
        builder.push(") ON CONFLICT (id) DO NOTHING RETURNING to_jsonb(t)");

        let row = builder
            .build_query_scalar::<Json<Value>>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(row)| row))
    }

    async fn delete(&self, table: &'static str, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", identifier(table)?))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// --- In-memory implementation (tests and local demos) ---

/// InMemoryRepository
///
/// A `Repository` holding tables as JSON rows in memory. It applies the same filter,
/// ordering (nulls last) and limit semantics as the Postgres implementation, and can be
/// told to fail every call on a given table to exercise the remote-error paths.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<HashMap<&'static str, Vec<Value>>>,
    failing: RwLock<HashSet<&'static str>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call touching `table` returns `RepoError::Unavailable`.
    pub fn fail_on(&self, table: &'static str) {
        self.failing
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(table);
    }

    pub fn recover(&self, table: &'static str) {
        self.failing
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(table);
    }

    /// Raw rows currently stored in `table`, in insertion order.
    pub fn rows(&self, table: &'static str) -> Vec<Value> {
        self.tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn guard(&self, table: &'static str) -> Result<(), RepoError> {
        let failing = self
            .failing
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if failing.contains(table) {
            return Err(RepoError::Unavailable(format!("table `{table}` is unavailable")));
        }
        Ok(())
    }

    fn matching(&self, query: &TableQuery) -> Vec<Value> {
        let tables = self
            .tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tables
            .get(query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query
                            .filters
                            .iter()
                            .all(|(column, value)| {
                                row.get(*column).is_some_and(|v| json_eq(v, value))
                            })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn json_eq(stored: &Value, expected: &Value) -> bool {
    match (stored, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => stored == expected,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => {
            match (a.parse::<DateTime<Utc>>(), b.parse::<DateTime<Utc>>()) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        _ => Ordering::Equal,
    }
}

fn compare_rows(a: &Value, b: &Value, order: &[SortKey]) -> Ordering {
    for key in order {
        let left = a.get(key.column).filter(|v| !v.is_null());
        let right = b.get(key.column).filter(|v| !v.is_null());
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) if key.descending => compare_values(r, l),
            (Some(l), Some(r)) => compare_values(l, r),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn select(&self, query: &TableQuery) -> Result<Vec<Value>, RepoError> {
        self.guard(query.table)?;
        for (column, _) in &query.filters {
            identifier(column)?;
        }

        let mut rows = self.matching(query);
        // Stable sort: rows equal on every key keep insertion order.
        rows.sort_by(|a, b| compare_rows(a, b, &query.order));
        if let Some(limit) = query.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(rows)
    }

    async fn count(&self, query: &TableQuery) -> Result<i64, RepoError> {
        self.guard(query.table)?;
        Ok(self.matching(query).len() as i64)
    }

    async fn insert(&self, table: &'static str, row: Value) -> Result<Value, RepoError> {
        self.guard(table)?;
        object_keys(&row)?;
        let mut tables = self
            .tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let rows = tables.entry(table).or_default();
        if let Some(id) = row_id(&row) {
            if rows.iter().any(|r| row_id(r) == Some(id)) {
                return Err(RepoError::Unavailable(format!(
                    "duplicate key value violates unique constraint on {table}.id"
                )));
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &'static str,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<Value>, RepoError> {
        self.guard(table)?;
        object_keys(&patch)?;
        let id = id.to_string();
        let mut tables = self
            .tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(row) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id.as_str())))
        else {
            return Ok(None);
        };

        if let (Some(target), Value::Object(changes)) = (row.as_object_mut(), patch) {
            for (column, value) in changes.into_iter().filter(|(c, _)| c != "id") {
                target.insert(column, value);
            }
        }
        Ok(Some(row.clone()))
    }

    async fn insert_if_absent(
        &self,
        table: &'static str,
        row: Value,
    ) -> Result<Option<Value>, RepoError> {
        self.guard(table)?;
        object_keys(&row)?;
        let mut tables = self
            .tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let rows = tables.entry(table).or_default();
        if let Some(id) = row_id(&row) {
            if rows.iter().any(|r| row_id(r) == Some(id)) {
                return Ok(None);
            }
        }
        rows.push(row.clone());
        Ok(Some(row))
    }

    async fn delete(&self, table: &'static str, id: Uuid) -> Result<bool, RepoError> {
        self.guard(table)?;
        let id = id.to_string();
        let mut tables = self
            .tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(rows) = tables.get_mut(table) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| row_id(r) != Some(id.as_str()));
        Ok(rows.len() < before)
    }
}
