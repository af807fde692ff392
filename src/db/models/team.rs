use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub name: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewTeam {
    pub owner_user_id: Uuid,
    #[validate(length(min = 1, message = "Team name must not be empty"))]
    pub name: String,
}
