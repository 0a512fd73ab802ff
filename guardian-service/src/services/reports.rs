use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::{Criteria, Repository};
use crate::models::{Report, ReportStatus};
use crate::services::storage::{discard_attachment, owned_key};
use crate::services::{metrics, Actor, ServiceError, Storage};
use crate::utils::scrub_pii;

pub struct NewReport {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub attachment_path: Option<String>,
}

pub struct ReportService {
    reports: Arc<dyn Repository<Report>>,
    storage: Arc<dyn Storage>,
}

impl ReportService {
    pub fn new(reports: Arc<dyn Repository<Report>>, storage: Arc<dyn Storage>) -> Self {
        Self { reports, storage }
    }

    #[tracing::instrument(skip(self, input), fields(user_id = %actor.user_id))]
    pub async fn create(&self, actor: &Actor, input: NewReport) -> Result<Report, ServiceError> {
        let attachment_path = input
            .attachment_path
            .as_deref()
            .map(|path| owned_key(actor.user_id, path))
            .transpose()?;

        let now = Utc::now();
        let report = Report {
            id: Uuid::new_v4(),
            user_id: actor.user_id,
            title: input.title,
            description: scrub_pii(&input.description).into_owned(),
            category: input.category,
            location: input.location,
            status: ReportStatus::Submitted.to_string(),
            attachment_path,
            assigned_officer_id: None,
            created_at: now,
            updated_at: now,
        };

        self.reports.save(&report).await?;
        metrics::record_report_filed(&report.category);
        tracing::info!(report_id = %report.id, "Report filed");
        Ok(report)
    }

    /// Citizens see their own reports; officers see every report.
    pub async fn list(
        &self,
        actor: &Actor,
        status: Option<ReportStatus>,
    ) -> Result<Vec<Report>, ServiceError> {
        let mut criteria = Criteria::new();
        if !actor.is_officer {
            criteria = criteria.eq("user_id", actor.user_id);
        }
        if let Some(status) = status {
            criteria = criteria.eq("status", status.as_str());
        }
        Ok(self.reports.find_by(&criteria).await?)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Report, ServiceError> {
        let report = self
            .reports
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Report"))?;

        if report.user_id != actor.user_id && !actor.is_officer {
            return Err(ServiceError::Forbidden(
                "You do not have access to this report".to_string(),
            ));
        }
        Ok(report)
    }

    #[tracing::instrument(skip(self), fields(officer_id = %actor.user_id))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: ReportStatus,
    ) -> Result<Report, ServiceError> {
        if !actor.is_officer {
            return Err(ServiceError::Forbidden(
                "Only officers can change report status".to_string(),
            ));
        }

        let mut report = self
            .reports
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Report"))?;

        report.status = status.to_string();
        report.assigned_officer_id = Some(actor.user_id);
        report.updated_at = Utc::now();
        self.reports.save(&report).await?;

        tracing::info!(report_id = %id, status = %status, "Report status changed");
        Ok(report)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
        let report = self
            .reports
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Report"))?;

        if report.user_id != actor.user_id {
            return Err(ServiceError::Forbidden(
                "Only the author can delete a report".to_string(),
            ));
        }

        self.reports.delete_where(&Criteria::new().eq("id", id)).await?;
        if let Some(path) = &report.attachment_path {
            discard_attachment(self.storage.as_ref(), path).await;
        }
        tracing::info!(report_id = %id, "Report deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRepository;
    use crate::services::storage::upload_key;
    use crate::services::LocalStorage;
    use tempfile::TempDir;

    fn citizen() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            is_officer: false,
        }
    }

    fn officer() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            is_officer: true,
        }
    }

    fn report(description: &str) -> NewReport {
        NewReport {
            title: "Broken streetlight".to_string(),
            description: description.to_string(),
            category: "infrastructure".to_string(),
            location: Some("5th & Main".to_string()),
            attachment_path: None,
        }
    }

    async fn setup() -> (ReportService, Arc<LocalStorage>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let service = ReportService::new(
            Arc::new(MemoryRepository::<Report>::new()),
            storage.clone(),
        );
        (service, storage, dir)
    }

    #[tokio::test]
    async fn descriptions_are_scrubbed_before_storage() {
        let (service, _, _dir) = setup().await;
        let author = citizen();

        let created = service
            .create(&author, report("Call me at 555-123-4567 or me@example.com"))
            .await
            .unwrap();

        assert_eq!(
            created.description,
            "Call me at [REDACTED-PHONE] or [REDACTED-EMAIL]"
        );
        assert_eq!(created.status, "SUBMITTED");
    }

    #[tokio::test]
    async fn visibility_follows_ownership_and_role() {
        let (service, _, _dir) = setup().await;
        let (alice, bob, cop) = (citizen(), citizen(), officer());

        let alices = service.create(&alice, report("a")).await.unwrap();
        service.create(&bob, report("b")).await.unwrap();

        assert_eq!(service.list(&alice, None).await.unwrap().len(), 1);
        assert_eq!(service.list(&cop, None).await.unwrap().len(), 2);

        assert!(matches!(
            service.get(&bob, alices.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(service.get(&cop, alices.id).await.is_ok());
        assert!(matches!(
            service.get(&alice, Uuid::new_v4()).await,
            Err(ServiceError::NotFound("Report"))
        ));
    }

    #[tokio::test]
    async fn only_officers_triage() {
        let (service, _, _dir) = setup().await;
        let (alice, cop) = (citizen(), officer());
        let filed = service.create(&alice, report("a")).await.unwrap();

        assert!(service
            .update_status(&alice, filed.id, ReportStatus::Resolved)
            .await
            .is_err());

        let triaged = service
            .update_status(&cop, filed.id, ReportStatus::InReview)
            .await
            .unwrap();
        assert_eq!(triaged.status, "IN_REVIEW");
        assert_eq!(triaged.assigned_officer_id, Some(cop.user_id));

        let in_review = service
            .list(&cop, Some(ReportStatus::InReview))
            .await
            .unwrap();
        assert_eq!(in_review.len(), 1);
    }

    #[tokio::test]
    async fn only_the_author_deletes() {
        let (service, _, _dir) = setup().await;
        let (alice, cop) = (citizen(), officer());
        let filed = service.create(&alice, report("a")).await.unwrap();

        assert!(service.delete(&cop, filed.id).await.is_err());
        service.delete(&alice, filed.id).await.unwrap();
        assert!(service.list(&alice, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn attachments_must_be_the_authors_uploads() {
        let (service, _, _dir) = setup().await;
        let (alice, bob) = (citizen(), citizen());
        let bobs_file = upload_key(bob.user_id, Some("evidence.jpg"));

        let mut foreign = report("a");
        foreign.attachment_path = Some(bobs_file);
        assert!(matches!(
            service.create(&alice, foreign).await,
            Err(ServiceError::Forbidden(_))
        ));

        let mut escaping = report("a");
        escaping.attachment_path = Some(format!("{}/../{}/x.jpg", alice.user_id, bob.user_id));
        assert!(matches!(
            service.create(&alice, escaping).await,
            Err(ServiceError::Validation(_))
        ));

        assert!(service.list(&alice, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_report_removes_its_attachment() {
        let (service, storage, _dir) = setup().await;
        let alice = citizen();
        let key = upload_key(alice.user_id, Some("evidence.jpg"));
        storage.upload(&key, b"jpeg".to_vec()).await.unwrap();

        let mut input = report("a");
        input.attachment_path = Some(key.clone());
        let filed = service.create(&alice, input).await.unwrap();
        assert_eq!(filed.attachment_path.as_deref(), Some(key.as_str()));

        service.delete(&alice, filed.id).await.unwrap();
        assert!(matches!(
            storage.download(&key).await,
            Err(ServiceError::NotFound("File"))
        ));
    }
}
