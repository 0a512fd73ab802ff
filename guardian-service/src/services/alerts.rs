use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{Criteria, Repository};
use crate::models::{Alert, AlertSeverity};
use crate::services::{Actor, ServiceError};

pub struct NewAlert {
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub area: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct AlertService {
    alerts: Arc<dyn Repository<Alert>>,
}

fn require_officer(actor: &Actor) -> Result<(), ServiceError> {
    if actor.is_officer {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Only officers can manage alerts".to_string(),
        ))
    }
}

impl AlertService {
    pub fn new(alerts: Arc<dyn Repository<Alert>>) -> Self {
        Self { alerts }
    }

    #[tracing::instrument(skip(self, input), fields(officer_id = %actor.user_id))]
    pub async fn create(&self, actor: &Actor, input: NewAlert) -> Result<Alert, ServiceError> {
        require_officer(actor)?;

        let now = Utc::now();
        if input.expires_at.is_some_and(|expires| expires <= now) {
            return Err(ServiceError::Validation(
                "expires_at must be in the future".to_string(),
            ));
        }

        let alert = Alert {
            id: Uuid::new_v4(),
            author_id: actor.user_id,
            title: input.title,
            message: input.message,
            severity: input.severity.to_string(),
            area: input.area,
            expires_at: input.expires_at,
            created_at: now,
            updated_at: now,
        };

        self.alerts.save(&alert).await?;
        tracing::info!(alert_id = %alert.id, severity = %alert.severity, "Alert published");
        Ok(alert)
    }

    /// Unexpired alerts, newest first. Expiry is filtered by the store.
    pub async fn list_active(&self) -> Result<Vec<Alert>, ServiceError> {
        Ok(self
            .alerts
            .find_by(&Criteria::new().null_or_after("expires_at", Utc::now()))
            .await?)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
        require_officer(actor)?;
        let removed = self.alerts.delete_where(&Criteria::new().eq("id", id)).await?;
        if removed == 0 {
            return Err(ServiceError::NotFound("Alert"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;
    use chrono::Duration;

    fn officer() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            is_officer: true,
        }
    }

    fn alert(expires_at: Option<DateTime<Utc>>) -> NewAlert {
        NewAlert {
            title: "Flooding".to_string(),
            message: "Avoid the riverside path".to_string(),
            severity: AlertSeverity::Critical,
            area: Some("Riverside".to_string()),
            expires_at,
        }
    }

    #[tokio::test]
    async fn citizens_cannot_publish() {
        let service = AlertService::new(Arc::new(MemoryRepository::<Alert>::new()));
        let citizen = Actor {
            user_id: Uuid::new_v4(),
            is_officer: false,
        };
        assert!(matches!(
            service.create(&citizen, alert(None)).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn past_expiry_is_rejected_and_delete_removes() {
        let service = AlertService::new(Arc::new(MemoryRepository::<Alert>::new()));
        let cop = officer();

        assert!(service
            .create(&cop, alert(Some(Utc::now() - Duration::minutes(1))))
            .await
            .is_err());

        let published = service
            .create(&cop, alert(Some(Utc::now() + Duration::hours(2))))
            .await
            .unwrap();
        assert_eq!(service.list_active().await.unwrap().len(), 1);

        service.delete(&cop, published.id).await.unwrap();
        assert!(service.list_active().await.unwrap().is_empty());
        assert!(matches!(
            service.delete(&cop, published.id).await,
            Err(ServiceError::NotFound("Alert"))
        ));
    }

    #[tokio::test]
    async fn expired_rows_are_excluded_by_the_query() {
        let repo = Arc::new(MemoryRepository::<Alert>::new());
        let service = AlertService::new(repo.clone());
        let cop = officer();

        let lasting = service.create(&cop, alert(None)).await.unwrap();
        let mut lapsed = service
            .create(&cop, alert(Some(Utc::now() + Duration::hours(1))))
            .await
            .unwrap();
        lapsed.expires_at = Some(Utc::now() - Duration::seconds(1));
        repo.save(&lapsed).await.unwrap();

        let active = service.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, lasting.id);
    }
}
