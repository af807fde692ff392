use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{
    AvailabilityRequest, NewAvailabilityRequest, NewReservation, NewTeam, RequestStatus,
    Reservation, Team, WeeklyWindow, WindowSpan,
};
use crate::db::DatabaseError;

use super::{SchedulingStore, StoreResult};

/// Postgres-backed store. Guarded transitions are `UPDATE ... WHERE status = $expected`
/// statements; a zero row count means the caller lost the race.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchedulingStore for PgStore {
    async fn create_team(&self, team: &NewTeam) -> StoreResult<Team> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            INSERT INTO teams (owner_user_id, name)
            VALUES ($1, $2)
            RETURNING id, owner_user_id, name, created_at
            "#,
        )
        .bind(team.owner_user_id)
        .bind(&team.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(team)
    }

    async fn team(&self, team_id: Uuid) -> StoreResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, owner_user_id, name, created_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(team_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn team_owned_by(&self, team_id: Uuid, owner_user_id: Uuid) -> StoreResult<Option<Team>> {
        let team = sqlx::query_as::<_, Team>(
            r#"
            SELECT id, owner_user_id, name, created_at
            FROM teams
            WHERE id = $1 AND owner_user_id = $2
            "#,
        )
        .bind(team_id)
        .bind(owner_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }

    async fn create_request(
        &self,
        request: &NewAvailabilityRequest,
    ) -> StoreResult<AvailabilityRequest> {
        let request = sqlx::query_as::<_, AvailabilityRequest>(
            r#"
            INSERT INTO availability_requests
                (team_id, guest_name, guest_email, guest_notes, token, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(request.team_id)
        .bind(&request.guest_name)
        .bind(&request.guest_email)
        .bind(&request.guest_notes)
        .bind(&request.token)
        .bind(request.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(request)
    }

    async fn request_by_token(&self, token: &str) -> StoreResult<Option<AvailabilityRequest>> {
        let request = sqlx::query_as::<_, AvailabilityRequest>(
            r#"
            SELECT * FROM availability_requests WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn requests_for_owner(
        &self,
        owner_user_id: Uuid,
    ) -> StoreResult<Vec<AvailabilityRequest>> {
        let requests = sqlx::query_as::<_, AvailabilityRequest>(
            r#"
            SELECT r.*
            FROM availability_requests r
            JOIN teams t ON t.id = r.team_id
            WHERE t.owner_user_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(owner_user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn transition_status(
        &self,
        request_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE availability_requests
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(to)
        .bind(request_id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn owner_windows(&self, owner_user_id: Uuid) -> StoreResult<Vec<WeeklyWindow>> {
        let windows = sqlx::query_as::<_, WeeklyWindow>(
            r#"
            SELECT * FROM weekly_windows
            WHERE owner_user_id = $1
            ORDER BY day_of_week, position
            "#,
        )
        .bind(owner_user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(windows)
    }

    async fn guest_windows(&self, request_id: Uuid) -> StoreResult<Vec<WeeklyWindow>> {
        let windows = sqlx::query_as::<_, WeeklyWindow>(
            r#"
            SELECT * FROM weekly_windows
            WHERE request_id = $1
            ORDER BY day_of_week, position
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(windows)
    }

    async fn replace_owner_windows(
        &self,
        owner_user_id: Uuid,
        spans: &[WindowSpan],
    ) -> StoreResult<Vec<WeeklyWindow>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM weekly_windows WHERE owner_user_id = $1")
            .bind(owner_user_id)
            .execute(&mut *tx)
            .await?;

        let mut windows = Vec::with_capacity(spans.len());
        for (position, span) in spans.iter().enumerate() {
            let window = sqlx::query_as::<_, WeeklyWindow>(
                r#"
                INSERT INTO weekly_windows (owner_user_id, day_of_week, start_time, end_time, position)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(owner_user_id)
            .bind(span.day_of_week)
            .bind(span.start_time)
            .bind(span.end_time)
            .bind(position as i16)
            .fetch_one(&mut *tx)
            .await?;
            windows.push(window);
        }

        tx.commit().await?;
        Ok(windows)
    }

    async fn submit_guest_windows(
        &self,
        request_id: Uuid,
        spans: &[WindowSpan],
    ) -> StoreResult<Vec<WeeklyWindow>> {
        let mut tx = self.pool.begin().await?;

        let guarded = sqlx::query(
            r#"
            UPDATE availability_requests
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            "#,
        )
        .bind(RequestStatus::Submitted)
        .bind(request_id)
        .bind(RequestStatus::Pending)
        .execute(&mut *tx)
        .await?;

        if guarded.rows_affected() == 0 {
            // Dropping the transaction rolls it back: windows stay untouched.
            return Err(DatabaseError::Conflict);
        }

        sqlx::query("DELETE FROM weekly_windows WHERE request_id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        let mut windows = Vec::with_capacity(spans.len());
        for (position, span) in spans.iter().enumerate() {
            let window = sqlx::query_as::<_, WeeklyWindow>(
                r#"
                INSERT INTO weekly_windows (request_id, day_of_week, start_time, end_time, position)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(request_id)
            .bind(span.day_of_week)
            .bind(span.start_time)
            .bind(span.end_time)
            .bind(position as i16)
            .fetch_one(&mut *tx)
            .await?;
            windows.push(window);
        }

        tx.commit().await?;
        Ok(windows)
    }

    async fn book(
        &self,
        request_id: Uuid,
        reservation: &NewReservation,
    ) -> StoreResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (request_id, guest_name, guest_email, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(reservation.request_id)
        .bind(&reservation.guest_name)
        .bind(&reservation.guest_email)
        .bind(reservation.starts_at)
        .bind(reservation.ends_at)
        .fetch_one(&mut *tx)
        .await?;

        let guarded = sqlx::query(
            r#"
            UPDATE availability_requests
            SET status = $1, reservation_id = $2, booked_at = $3, updated_at = NOW()
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(RequestStatus::Booked)
        .bind(created.id)
        .bind(reservation.starts_at)
        .bind(request_id)
        .bind(RequestStatus::Submitted)
        .execute(&mut *tx)
        .await?;

        if guarded.rows_affected() == 0 {
            // Lost the race against a concurrent finalize; the reservation
            // insert above is rolled back with the transaction.
            return Err(DatabaseError::Conflict);
        }

        tx.commit().await?;
        Ok(created)
    }
}
