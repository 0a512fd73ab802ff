//! Generic data access: the `Repository` capability set every entity service
//! is built on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository lock poisoned: {0}")]
    Poisoned(String),

    #[error("Unknown column '{column}' for table '{table}'")]
    UnknownColumn {
        table: &'static str,
        column: &'static str,
    },
}

/// A single column value, bound as a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Uuid(Uuid),
    OptUuid(Option<Uuid>),
    Text(String),
    OptText(Option<String>),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    OptTimestamp(Option<DateTime<Utc>>),
}

impl From<Uuid> for ColumnValue {
    fn from(v: Uuid) -> Self {
        ColumnValue::Uuid(v)
    }
}

impl From<Option<Uuid>> for ColumnValue {
    fn from(v: Option<Uuid>) -> Self {
        ColumnValue::OptUuid(v)
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        ColumnValue::Text(v)
    }
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        ColumnValue::Text(v.to_string())
    }
}

impl From<Option<String>> for ColumnValue {
    fn from(v: Option<String>) -> Self {
        ColumnValue::OptText(v)
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        ColumnValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(v: DateTime<Utc>) -> Self {
        ColumnValue::Timestamp(v)
    }
}

impl From<Option<DateTime<Utc>>> for ColumnValue {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        ColumnValue::OptTimestamp(v)
    }
}

impl ColumnValue {
    /// Equality as SQL `=` sees it: optional variants compare with their
    /// non-optional counterparts, and NULL never matches.
    pub fn matches(&self, other: &ColumnValue) -> bool {
        use ColumnValue as V;
        match (self, other) {
            (V::Uuid(a), V::Uuid(b)) => a == b,
            (V::OptUuid(Some(a)), V::Uuid(b)) | (V::Uuid(b), V::OptUuid(Some(a))) => a == b,
            (V::OptUuid(Some(a)), V::OptUuid(Some(b))) => a == b,
            (V::Text(a), V::Text(b)) => a == b,
            (V::OptText(Some(a)), V::Text(b)) | (V::Text(b), V::OptText(Some(a))) => a == b,
            (V::OptText(Some(a)), V::OptText(Some(b))) => a == b,
            (V::Bool(a), V::Bool(b)) => a == b,
            (V::Timestamp(a), V::Timestamp(b)) => a == b,
            (V::OptTimestamp(Some(a)), V::Timestamp(b))
            | (V::Timestamp(b), V::OptTimestamp(Some(a))) => a == b,
            (V::OptTimestamp(Some(a)), V::OptTimestamp(Some(b))) => a == b,
            _ => false,
        }
    }
}

/// How a criteria column is compared against its bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`
    Eq(ColumnValue),
    /// `column IS NULL OR column > value`
    NullOrAfter(ColumnValue),
}

impl Condition {
    pub fn value(&self) -> &ColumnValue {
        match self {
            Condition::Eq(value) | Condition::NullOrAfter(value) => value,
        }
    }

    /// Evaluate against a stored column value the way SQL would.
    pub fn holds(&self, actual: &ColumnValue) -> bool {
        use ColumnValue as V;
        match self {
            Condition::Eq(expected) => actual.matches(expected),
            Condition::NullOrAfter(bound) => match (actual, bound) {
                (V::OptTimestamp(None), _) | (V::OptUuid(None), _) | (V::OptText(None), _) => true,
                (V::Timestamp(a) | V::OptTimestamp(Some(a)), V::Timestamp(b)) => a > b,
                (V::Text(a) | V::OptText(Some(a)), V::Text(b)) => a > b,
                _ => false,
            },
        }
    }
}

/// Conjunction of column conditions. Empty criteria match every row.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    clauses: Vec<(&'static str, Condition)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<ColumnValue>) -> Self {
        self.clauses.push((column, Condition::Eq(value.into())));
        self
    }

    /// Rows where `column` is unset or later than `value`.
    pub fn null_or_after(mut self, column: &'static str, value: impl Into<ColumnValue>) -> Self {
        self.clauses
            .push((column, Condition::NullOrAfter(value.into())));
        self
    }

    pub fn clauses(&self) -> &[(&'static str, Condition)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// A row type stored in its own table, keyed by `id`.
pub trait Entity: Clone + Send + Sync + Unpin + for<'r> FromRow<'r, PgRow> + 'static {
    const TABLE: &'static str;

    fn id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;

    /// Every persisted column including `id`, in table order.
    fn columns(&self) -> Vec<(&'static str, ColumnValue)>;

    /// Column names as `columns()` reports them; used to reject unknown
    /// criteria before they reach SQL.
    fn column_names() -> &'static [&'static str];
}

/// Reject criteria naming columns the entity does not have. Column names are
/// interpolated into SQL, so only names known to the entity may pass.
pub(crate) fn ensure_known_columns<E: Entity>(criteria: &Criteria) -> Result<(), RepositoryError> {
    match criteria
        .clauses()
        .iter()
        .find(|(column, _)| !E::column_names().contains(column))
    {
        Some((column, _)) => Err(RepositoryError::UnknownColumn {
            table: E::TABLE,
            column: *column,
        }),
        None => Ok(()),
    }
}

#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Rows matching `criteria`, newest first.
    async fn find_by(&self, criteria: &Criteria) -> Result<Vec<E>, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<E>, RepositoryError>;

    /// Returns the number of deleted rows.
    async fn delete_where(&self, criteria: &Criteria) -> Result<u64, RepositoryError>;

    /// Insert or replace by `id`.
    async fn save(&self, entity: &E) -> Result<(), RepositoryError>;

    async fn health_check(&self) -> Result<(), RepositoryError>;

    async fn find_one_by(&self, criteria: &Criteria) -> Result<Option<E>, RepositoryError> {
        Ok(self.find_by(criteria).await?.into_iter().next())
    }
}
