use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::services::personal_details::PersonalDetailsInput;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PersonalDetailsRequest {
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[schema(example = "1990-04-01")]
    #[validate(length(max = 10))]
    pub date_of_birth: Option<String>,
    #[validate(length(max = 200))]
    pub emergency_contact: Option<String>,
}

impl From<PersonalDetailsRequest> for PersonalDetailsInput {
    fn from(req: PersonalDetailsRequest) -> Self {
        Self {
            full_name: req.full_name,
            phone: req.phone,
            address: req.address,
            date_of_birth: req.date_of_birth,
            emergency_contact: req.emergency_contact,
        }
    }
}
