use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::{Criteria, Repository};
use crate::models::PersonalDetails;
use crate::services::ServiceError;

pub struct PersonalDetailsInput {
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub emergency_contact: Option<String>,
}

pub struct PersonalDetailsService {
    details: Arc<dyn Repository<PersonalDetails>>,
}

impl PersonalDetailsService {
    pub fn new(details: Arc<dyn Repository<PersonalDetails>>) -> Self {
        Self { details }
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<PersonalDetails>, ServiceError> {
        Ok(self
            .details
            .find_one_by(&Criteria::new().eq("user_id", user_id))
            .await?)
    }

    pub async fn get(&self, user_id: Uuid) -> Result<PersonalDetails, ServiceError> {
        self.find(user_id)
            .await?
            .ok_or(ServiceError::NotFound("Personal details"))
    }

    /// Create or replace the caller's details, keeping the row id stable.
    pub async fn upsert(
        &self,
        user_id: Uuid,
        input: PersonalDetailsInput,
    ) -> Result<PersonalDetails, ServiceError> {
        let now = Utc::now();
        let (id, created_at) = match self.find(user_id).await? {
            Some(existing) => (existing.id, existing.created_at),
            None => (Uuid::new_v4(), now),
        };

        let details = PersonalDetails {
            id,
            user_id,
            full_name: input.full_name,
            phone: input.phone,
            address: input.address,
            date_of_birth: input.date_of_birth,
            emergency_contact: input.emergency_contact,
            created_at,
            updated_at: now,
        };

        self.details.save(&details).await?;
        tracing::info!(user_id = %user_id, "Personal details saved");
        Ok(details)
    }

    pub async fn delete(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let removed = self
            .details
            .delete_where(&Criteria::new().eq("user_id", user_id))
            .await?;
        if removed == 0 {
            return Err(ServiceError::NotFound("Personal details"));
        }
        tracing::info!(user_id = %user_id, "Personal details deleted");
        Ok(())
    }
}
