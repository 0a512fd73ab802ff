use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::LostArticleStatus;
use crate::services::lost_articles::NewLostArticle;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLostArticleRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    #[schema(example = "Blue backpack")]
    pub name: String,

    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,

    #[validate(length(min = 1, max = 64, message = "Category is required"))]
    pub category: String,

    #[validate(length(max = 500))]
    pub location: Option<String>,

    /// `LOST` or `FOUND`
    pub status: LostArticleStatus,

    #[validate(length(max = 512))]
    pub image_path: Option<String>,
}

impl From<CreateLostArticleRequest> for NewLostArticle {
    fn from(req: CreateLostArticleRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            category: req.category,
            location: req.location,
            status: req.status,
            image_path: req.image_path,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLostArticleStatusRequest {
    pub status: LostArticleStatus,
}
