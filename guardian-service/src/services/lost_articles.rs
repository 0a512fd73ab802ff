use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::{Criteria, Repository};
use crate::models::{LostArticle, LostArticleStatus};
use crate::services::storage::{discard_attachment, owned_key};
use crate::services::{Actor, ServiceError, Storage};
use crate::utils::scrub_pii;

pub struct NewLostArticle {
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub status: LostArticleStatus,
    pub image_path: Option<String>,
}

pub struct LostArticleService {
    articles: Arc<dyn Repository<LostArticle>>,
    storage: Arc<dyn Storage>,
}

impl LostArticleService {
    pub fn new(articles: Arc<dyn Repository<LostArticle>>, storage: Arc<dyn Storage>) -> Self {
        Self { articles, storage }
    }

    async fn load(&self, id: Uuid) -> Result<LostArticle, ServiceError> {
        self.articles
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound("Article"))
    }

    #[tracing::instrument(skip(self, input), fields(user_id = %actor.user_id))]
    pub async fn create(&self, actor: &Actor, input: NewLostArticle) -> Result<LostArticle, ServiceError> {
        if input.status == LostArticleStatus::Returned {
            return Err(ServiceError::Validation(
                "New articles must be LOST or FOUND".to_string(),
            ));
        }
        let image_path = input
            .image_path
            .as_deref()
            .map(|path| owned_key(actor.user_id, path))
            .transpose()?;

        let now = Utc::now();
        let article = LostArticle {
            id: Uuid::new_v4(),
            user_id: actor.user_id,
            name: input.name,
            description: scrub_pii(&input.description).into_owned(),
            category: input.category,
            location: input.location,
            status: input.status.to_string(),
            image_path,
            created_at: now,
            updated_at: now,
        };

        self.articles.save(&article).await?;
        tracing::info!(article_id = %article.id, status = %article.status, "Article registered");
        Ok(article)
    }

    pub async fn list_own(&self, actor: &Actor) -> Result<Vec<LostArticle>, ServiceError> {
        Ok(self
            .articles
            .find_by(&Criteria::new().eq("user_id", actor.user_id))
            .await?)
    }

    pub async fn list_found(&self) -> Result<Vec<LostArticle>, ServiceError> {
        Ok(self
            .articles
            .find_by(&Criteria::new().eq("status", LostArticleStatus::Found.as_str()))
            .await?)
    }

    /// Owners and officers see any article; everyone else only found ones.
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<LostArticle, ServiceError> {
        let article = self.load(id).await?;
        if article.user_id == actor.user_id || actor.is_officer || article.is_found() {
            return Ok(article);
        }
        Err(ServiceError::Forbidden(
            "You do not have access to this article".to_string(),
        ))
    }

    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: LostArticleStatus,
    ) -> Result<LostArticle, ServiceError> {
        let mut article = self.load(id).await?;
        if article.user_id != actor.user_id && !actor.is_officer {
            return Err(ServiceError::Forbidden(
                "Only the owner or an officer can update this article".to_string(),
            ));
        }

        article.status = status.to_string();
        article.updated_at = Utc::now();
        self.articles.save(&article).await?;

        tracing::info!(article_id = %id, status = %status, "Article status changed");
        Ok(article)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
        let article = self.load(id).await?;
        if article.user_id != actor.user_id {
            return Err(ServiceError::Forbidden(
                "Only the owner can delete this article".to_string(),
            ));
        }

        self.articles.delete_where(&Criteria::new().eq("id", id)).await?;
        if let Some(path) = &article.image_path {
            discard_attachment(self.storage.as_ref(), path).await;
        }
        tracing::info!(article_id = %id, "Article deleted");
        Ok(())
    }
}
