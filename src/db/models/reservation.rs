use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "reservation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

/// Created exactly once when a request is finalized; immutable afterwards
/// except for status. Guest identity is copied from the request at that point.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub request_id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub starts_at: OffsetDateTime,
    pub ends_at: OffsetDateTime,
    pub status: ReservationStatus,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub request_id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub starts_at: OffsetDateTime,
    pub ends_at: OffsetDateTime,
}
