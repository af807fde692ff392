use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Submitted,
    Booked,
    Expired,
}

impl RequestStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Booked | RequestStatus::Expired)
    }
}

/// One invite from a team owner to a guest. The token is the guest's only
/// credential for this request.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub id: Uuid,
    pub team_id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_notes: Option<String>,
    pub token: String,
    pub status: RequestStatus,
    pub expires_at: Option<OffsetDateTime>,
    pub booked_at: Option<OffsetDateTime>,
    pub reservation_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAvailabilityRequest {
    pub team_id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_notes: Option<String>,
    pub token: String,
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestInput {
    #[validate(length(min = 1, message = "Guest name must not be empty"))]
    pub guest_name: String,
    #[validate(email(message = "Guest email must be a valid address"))]
    pub guest_email: String,
    pub guest_notes: Option<String>,
}
