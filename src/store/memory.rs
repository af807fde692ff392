use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{
    AvailabilityRequest, NewAvailabilityRequest, NewReservation, NewTeam, RequestStatus,
    Reservation, ReservationStatus, Team, WeeklyWindow, WindowSpan,
};
use crate::db::DatabaseError;

use super::{SchedulingStore, StoreResult};

/// In-memory store with the same guard semantics as [`super::PgStore`]: every
/// mutating operation runs under one mutex, so conditional transitions and the
/// book write are atomic. Backs the test suite and local development without
/// Postgres.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    teams: HashMap<Uuid, Team>,
    requests: HashMap<Uuid, AvailabilityRequest>,
    token_index: HashMap<String, Uuid>,
    owner_windows: HashMap<Uuid, Vec<WeeklyWindow>>,
    guest_windows: HashMap<Uuid, Vec<WeeklyWindow>>,
    reservations: HashMap<Uuid, Reservation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn spans_to_windows(
    owner_user_id: Option<Uuid>,
    request_id: Option<Uuid>,
    spans: &[WindowSpan],
) -> Vec<WeeklyWindow> {
    let now = OffsetDateTime::now_utc();
    spans
        .iter()
        .enumerate()
        .map(|(position, span)| WeeklyWindow {
            id: Uuid::new_v4(),
            owner_user_id,
            request_id,
            day_of_week: span.day_of_week,
            start_time: span.start_time,
            end_time: span.end_time,
            position: position as i16,
            created_at: now,
        })
        .collect()
}

#[async_trait]
impl SchedulingStore for MemoryStore {
    async fn create_team(&self, team: &NewTeam) -> StoreResult<Team> {
        let created = Team {
            id: Uuid::new_v4(),
            owner_user_id: team.owner_user_id,
            name: team.name.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.lock().teams.insert(created.id, created.clone());
        Ok(created)
    }

    async fn team(&self, team_id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self.lock().teams.get(&team_id).cloned())
    }

    async fn team_owned_by(&self, team_id: Uuid, owner_user_id: Uuid) -> StoreResult<Option<Team>> {
        Ok(self
            .lock()
            .teams
            .get(&team_id)
            .filter(|t| t.owner_user_id == owner_user_id)
            .cloned())
    }

    async fn create_request(
        &self,
        request: &NewAvailabilityRequest,
    ) -> StoreResult<AvailabilityRequest> {
        let now = OffsetDateTime::now_utc();
        let created = AvailabilityRequest {
            id: Uuid::new_v4(),
            team_id: request.team_id,
            guest_name: request.guest_name.clone(),
            guest_email: request.guest_email.clone(),
            guest_notes: request.guest_notes.clone(),
            token: request.token.clone(),
            status: RequestStatus::Pending,
            expires_at: request.expires_at,
            booked_at: None,
            reservation_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.lock();
        if inner.token_index.contains_key(&created.token) {
            return Err(DatabaseError::InvalidInput("Duplicate token".into()));
        }
        inner.token_index.insert(created.token.clone(), created.id);
        inner.requests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn request_by_token(&self, token: &str) -> StoreResult<Option<AvailabilityRequest>> {
        let inner = self.lock();
        Ok(inner
            .token_index
            .get(token)
            .and_then(|id| inner.requests.get(id))
            .cloned())
    }

    async fn requests_for_owner(
        &self,
        owner_user_id: Uuid,
    ) -> StoreResult<Vec<AvailabilityRequest>> {
        let inner = self.lock();
        let mut requests: Vec<AvailabilityRequest> = inner
            .requests
            .values()
            .filter(|r| {
                inner
                    .teams
                    .get(&r.team_id)
                    .is_some_and(|t| t.owner_user_id == owner_user_id)
            })
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn transition_status(
        &self,
        request_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> StoreResult<bool> {
        let mut inner = self.lock();
        match inner.requests.get_mut(&request_id) {
            Some(request) if request.status == from => {
                request.status = to;
                request.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn owner_windows(&self, owner_user_id: Uuid) -> StoreResult<Vec<WeeklyWindow>> {
        Ok(self
            .lock()
            .owner_windows
            .get(&owner_user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn guest_windows(&self, request_id: Uuid) -> StoreResult<Vec<WeeklyWindow>> {
        Ok(self
            .lock()
            .guest_windows
            .get(&request_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_owner_windows(
        &self,
        owner_user_id: Uuid,
        spans: &[WindowSpan],
    ) -> StoreResult<Vec<WeeklyWindow>> {
        let windows = spans_to_windows(Some(owner_user_id), None, spans);
        self.lock()
            .owner_windows
            .insert(owner_user_id, windows.clone());
        Ok(windows)
    }

    async fn submit_guest_windows(
        &self,
        request_id: Uuid,
        spans: &[WindowSpan],
    ) -> StoreResult<Vec<WeeklyWindow>> {
        let mut inner = self.lock();
        match inner.requests.get_mut(&request_id) {
            Some(request) if request.status == RequestStatus::Pending => {
                request.status = RequestStatus::Submitted;
                request.updated_at = OffsetDateTime::now_utc();
            }
            _ => return Err(DatabaseError::Conflict),
        }

        let windows = spans_to_windows(None, Some(request_id), spans);
        inner.guest_windows.insert(request_id, windows.clone());
        Ok(windows)
    }

    async fn book(
        &self,
        request_id: Uuid,
        reservation: &NewReservation,
    ) -> StoreResult<Reservation> {
        let mut inner = self.lock();

        let created = Reservation {
            id: Uuid::new_v4(),
            request_id: reservation.request_id,
            guest_name: reservation.guest_name.clone(),
            guest_email: reservation.guest_email.clone(),
            starts_at: reservation.starts_at,
            ends_at: reservation.ends_at,
            status: ReservationStatus::Confirmed,
            created_at: OffsetDateTime::now_utc(),
        };

        match inner.requests.get_mut(&request_id) {
            Some(request) if request.status == RequestStatus::Submitted => {
                request.status = RequestStatus::Booked;
                request.reservation_id = Some(created.id);
                request.booked_at = Some(created.starts_at);
                request.updated_at = OffsetDateTime::now_utc();
            }
            // Nothing was inserted yet, so losing the guard leaves no trace.
            _ => return Err(DatabaseError::Conflict),
        }

        inner.reservations.insert(created.id, created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::time;

    async fn seed_request(store: &MemoryStore) -> AvailabilityRequest {
        let request = NewAvailabilityRequest {
            team_id: Uuid::new_v4(),
            guest_name: "Ada".into(),
            guest_email: "ada@example.com".into(),
            guest_notes: None,
            token: crate::token::issue(),
            expires_at: None,
        };
        store.create_request(&request).await.expect("create request")
    }

    #[tokio::test]
    async fn guarded_transition_fails_once_state_moved_on() {
        let store = MemoryStore::new();
        let request = seed_request(&store).await;

        assert!(store
            .transition_status(request.id, RequestStatus::Pending, RequestStatus::Submitted)
            .await
            .expect("transition"));

        // Second guard on the same expected-old status loses.
        assert!(!store
            .transition_status(request.id, RequestStatus::Pending, RequestStatus::Expired)
            .await
            .expect("transition"));
    }

    #[tokio::test]
    async fn lost_submit_leaves_windows_untouched() {
        let store = MemoryStore::new();
        let request = seed_request(&store).await;

        let first = [WindowSpan {
            day_of_week: 1,
            start_time: time!(09:00),
            end_time: time!(12:00),
        }];
        store
            .submit_guest_windows(request.id, &first)
            .await
            .expect("submit");

        let second = [WindowSpan {
            day_of_week: 2,
            start_time: time!(13:00),
            end_time: time!(15:00),
        }];
        let err = store.submit_guest_windows(request.id, &second).await;
        assert!(matches!(err, Err(DatabaseError::Conflict)));

        let stored = store.guest_windows(request.id).await.expect("windows");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].day_of_week, 1);
    }
}
