//! In-process repositories for tests and local development without Postgres.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::repository::{ensure_known_columns, Criteria, Entity, Repository, RepositoryError};

pub struct MemoryRepository<E> {
    rows: RwLock<HashMap<Uuid, E>>,
}

impl<E> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Entity> MemoryRepository<E> {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches<E: Entity>(entity: &E, criteria: &Criteria) -> bool {
    let columns = entity.columns();
    criteria.clauses().iter().all(|(name, condition)| {
        columns
            .iter()
            .any(|(column, actual)| column == name && condition.holds(actual))
    })
}

fn poisoned(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Poisoned(e.to_string())
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn find_by(&self, criteria: &Criteria) -> Result<Vec<E>, RepositoryError> {
        ensure_known_columns::<E>(criteria)?;
        let rows = self.rows.read().map_err(poisoned)?;
        let mut found: Vec<E> = rows
            .values()
            .filter(|row| matches(*row, criteria))
            .cloned()
            .collect();
        found.sort_by_key(|row| std::cmp::Reverse(row.created_at()));
        Ok(found)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<E>, RepositoryError> {
        Ok(self.rows.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn delete_where(&self, criteria: &Criteria) -> Result<u64, RepositoryError> {
        ensure_known_columns::<E>(criteria)?;
        let mut rows = self.rows.write().map_err(poisoned)?;
        let before = rows.len();
        rows.retain(|_, row| !matches(&*row, criteria));
        Ok((before - rows.len()) as u64)
    }

    async fn save(&self, entity: &E) -> Result<(), RepositoryError> {
        self.rows
            .write()
            .map_err(poisoned)?
            .insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
