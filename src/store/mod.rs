//! Persistence seam for the scheduling core.
//!
//! The service talks to a [`SchedulingStore`] rather than to sqlx directly so
//! the lifecycle logic can be exercised against an in-memory store. Both
//! implementations honor the same guard semantics: lifecycle transitions are
//! conditional updates that fail with [`DatabaseError::Conflict`] when the
//! stored status no longer matches the expected one.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::{
    AvailabilityRequest, NewAvailabilityRequest, NewReservation, NewTeam, RequestStatus,
    Reservation, Team, WeeklyWindow, WindowSpan,
};
use crate::db::DatabaseError;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, DatabaseError>;

#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn create_team(&self, team: &NewTeam) -> StoreResult<Team>;

    async fn team(&self, team_id: Uuid) -> StoreResult<Option<Team>>;

    /// Team lookup scoped to its owner. A missing team and a team owned by
    /// someone else are indistinguishable to the caller.
    async fn team_owned_by(&self, team_id: Uuid, owner_user_id: Uuid) -> StoreResult<Option<Team>>;

    async fn create_request(
        &self,
        request: &NewAvailabilityRequest,
    ) -> StoreResult<AvailabilityRequest>;

    async fn request_by_token(&self, token: &str) -> StoreResult<Option<AvailabilityRequest>>;

    /// All requests across every team the owner holds, newest first.
    async fn requests_for_owner(&self, owner_user_id: Uuid)
        -> StoreResult<Vec<AvailabilityRequest>>;

    /// Guarded transition: flips status from `from` to `to` only if the stored
    /// status still equals `from`. Returns whether a row was updated.
    async fn transition_status(
        &self,
        request_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> StoreResult<bool>;

    async fn owner_windows(&self, owner_user_id: Uuid) -> StoreResult<Vec<WeeklyWindow>>;

    async fn guest_windows(&self, request_id: Uuid) -> StoreResult<Vec<WeeklyWindow>>;

    /// Wholesale replacement of the owner's weekly windows (delete-then-insert).
    async fn replace_owner_windows(
        &self,
        owner_user_id: Uuid,
        spans: &[WindowSpan],
    ) -> StoreResult<Vec<WeeklyWindow>>;

    /// Atomically transitions the request from `pending` to `submitted` and
    /// replaces its guest windows wholesale. Fails with `Conflict`, leaving
    /// stored windows untouched, if the request is no longer pending.
    async fn submit_guest_windows(
        &self,
        request_id: Uuid,
        spans: &[WindowSpan],
    ) -> StoreResult<Vec<WeeklyWindow>>;

    /// Atomically creates the reservation and transitions the request from
    /// `submitted` to `booked`, linking the reservation. Fails with `Conflict`
    /// and creates nothing if the request is no longer submitted; no partial
    /// outcome is ever observable.
    async fn book(
        &self,
        request_id: Uuid,
        reservation: &NewReservation,
    ) -> StoreResult<Reservation>;
}
