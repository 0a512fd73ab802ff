//! PostgreSQL-backed repositories.

use async_trait::async_trait;
use sqlx::{
    postgres::{PgArguments, PgPool},
    query::{Query, QueryAs},
    Postgres,
};
use std::marker::PhantomData;
use uuid::Uuid;

use super::repository::{
    ensure_known_columns, ColumnValue, Condition, Criteria, Entity, Repository, RepositoryError,
};

pub struct PgRepository<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for PgRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> PgRepository<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

fn bind_query(query: Query<'_, Postgres, PgArguments>, value: ColumnValue) -> Query<'_, Postgres, PgArguments> {
    match value {
        ColumnValue::Uuid(v) => query.bind(v),
        ColumnValue::OptUuid(v) => query.bind(v),
        ColumnValue::Text(v) => query.bind(v),
        ColumnValue::OptText(v) => query.bind(v),
        ColumnValue::Bool(v) => query.bind(v),
        ColumnValue::Timestamp(v) => query.bind(v),
        ColumnValue::OptTimestamp(v) => query.bind(v),
    }
}

fn bind_query_as<E>(
    query: QueryAs<'_, Postgres, E, PgArguments>,
    value: ColumnValue,
) -> QueryAs<'_, Postgres, E, PgArguments> {
    match value {
        ColumnValue::Uuid(v) => query.bind(v),
        ColumnValue::OptUuid(v) => query.bind(v),
        ColumnValue::Text(v) => query.bind(v),
        ColumnValue::OptText(v) => query.bind(v),
        ColumnValue::Bool(v) => query.bind(v),
        ColumnValue::Timestamp(v) => query.bind(v),
        ColumnValue::OptTimestamp(v) => query.bind(v),
    }
}

/// ` WHERE a = $1 AND (b IS NULL OR b > $2)`, or nothing for empty criteria.
fn where_clause(criteria: &Criteria) -> String {
    if criteria.is_empty() {
        return String::new();
    }
    let conditions: Vec<String> = criteria
        .clauses()
        .iter()
        .enumerate()
        .map(|(i, (column, condition))| match condition {
            Condition::Eq(_) => format!("{} = ${}", column, i + 1),
            Condition::NullOrAfter(_) => format!("({c} IS NULL OR {c} > ${})", i + 1, c = column),
        })
        .collect();
    format!(" WHERE {}", conditions.join(" AND "))
}

fn upsert_statement(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| **c != "id")
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (id) DO UPDATE SET {}",
        table,
        columns.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}

#[async_trait]
impl<E: Entity> Repository<E> for PgRepository<E> {
    async fn find_by(&self, criteria: &Criteria) -> Result<Vec<E>, RepositoryError> {
        ensure_known_columns::<E>(criteria)?;
        let sql = format!(
            "SELECT * FROM {}{} ORDER BY created_at DESC",
            E::TABLE,
            where_clause(criteria)
        );
        let mut query = sqlx::query_as::<_, E>(&sql);
        for (_, condition) in criteria.clauses() {
            query = bind_query_as(query, condition.value().clone());
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<E>, RepositoryError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", E::TABLE);
        Ok(sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_where(&self, criteria: &Criteria) -> Result<u64, RepositoryError> {
        ensure_known_columns::<E>(criteria)?;
        let sql = format!("DELETE FROM {}{}", E::TABLE, where_clause(criteria));
        let mut query = sqlx::query(&sql);
        for (_, condition) in criteria.clauses() {
            query = bind_query(query, condition.value().clone());
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn save(&self, entity: &E) -> Result<(), RepositoryError> {
        let columns = entity.columns();
        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let sql = upsert_statement(E::TABLE, &names);
        let mut query = sqlx::query(&sql);
        for (_, value) in columns {
            query = bind_query(query, value);
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clause_numbers_placeholders_in_order() {
        let criteria = Criteria::new()
            .eq("user_id", Uuid::new_v4())
            .eq("status", "FOUND");
        assert_eq!(where_clause(&criteria), " WHERE user_id = $1 AND status = $2");
        assert_eq!(where_clause(&Criteria::new()), "");
    }

    #[test]
    fn null_or_after_becomes_a_guarded_comparison() {
        let criteria = Criteria::new()
            .eq("area", "Riverside")
            .null_or_after("expires_at", chrono::Utc::now());
        assert_eq!(
            where_clause(&criteria),
            " WHERE area = $1 AND (expires_at IS NULL OR expires_at > $2)"
        );
    }

    #[test]
    fn upsert_updates_everything_but_the_key() {
        let sql = upsert_statement("alerts", &["id", "title", "severity"]);
        assert_eq!(
            sql,
            "INSERT INTO alerts (id, title, severity) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, severity = EXCLUDED.severity"
        );
    }
}
