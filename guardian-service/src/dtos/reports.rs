use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::ReportStatus;
use crate::services::reports::NewReport;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReportRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    #[schema(example = "Broken streetlight")]
    pub title: String,

    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,

    #[validate(length(min = 1, max = 64, message = "Category is required"))]
    #[schema(example = "infrastructure")]
    pub category: String,

    #[validate(length(max = 500))]
    pub location: Option<String>,

    /// Path returned by the upload endpoint
    #[validate(length(max = 512))]
    pub attachment_path: Option<String>,
}

impl From<CreateReportRequest> for NewReport {
    fn from(req: CreateReportRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            category: req.category,
            location: req.location,
            attachment_path: req.attachment_path,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    /// Filter by status
    pub status: Option<ReportStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReportStatusRequest {
    pub status: ReportStatus,
}
