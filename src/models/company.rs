use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Company {
    pub id: i32,
    pub name: String,
    pub business_number: String,
    pub contact_email: String,
    pub phone: Option<String>,
}

// Used for both create and full update
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct CompanyRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub business_number: String,
    #[validate(email)]
    pub contact_email: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}
