//! Scheduling core: request lifecycle, availability submission, overlap
//! queries, and booking finalization.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;
use validator::Validate;

use crate::calendar::{self, CalendarEvent, CalendarWriter};
use crate::db::models::{
    AvailabilityRequest, CreateRequestInput, NewAvailabilityRequest, NewReservation, NewTeam,
    RequestStatus, Reservation, Team, WeeklyWindow, WindowInput, WindowSpan, DATE_FMT, TIME_FMT,
};
use crate::db::DatabaseError;
use crate::error::{AppError, AppResult};
use crate::notify::{self, Notifier, TemplateKind};
use crate::overlap::{self, day_name, OverlapSlot};
use crate::store::SchedulingStore;
use crate::token;

pub struct SchedulingService {
    store: Arc<dyn SchedulingStore>,
    notifier: Arc<dyn Notifier>,
    calendar: Option<Arc<dyn CalendarWriter>>,
    public_base_url: String,
    request_expiry: Option<Duration>,
}

#[derive(Debug, Serialize)]
pub struct CreatedRequest {
    pub request: AvailabilityRequest,
    pub capability_url: String,
}

#[derive(Debug, Serialize)]
pub struct WindowDto {
    pub day_of_week: i16,
    pub day_name: &'static str,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Serialize)]
pub struct SlotDto {
    pub day_of_week: i16,
    pub day_name: &'static str,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub display: String,
}

#[derive(Debug, Serialize)]
pub struct OverlapResponse {
    pub slots: Vec<SlotDto>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RequestView {
    pub id: Uuid,
    pub team_name: String,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_notes: Option<String>,
    pub status: RequestStatus,
    pub expires_at: Option<OffsetDateTime>,
    pub booked_at: Option<OffsetDateTime>,
    pub owner_windows: Vec<WindowDto>,
}

impl SchedulingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        notifier: Arc<dyn Notifier>,
        calendar: Option<Arc<dyn CalendarWriter>>,
        public_base_url: String,
        request_expiry_days: Option<i64>,
    ) -> Self {
        Self {
            store,
            notifier,
            calendar,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            request_expiry: request_expiry_days.map(Duration::days),
        }
    }

    pub async fn create_team(&self, owner_user_id: Uuid, name: String) -> AppResult<Team> {
        let new_team = NewTeam {
            owner_user_id,
            name,
        };
        new_team
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        Ok(self.store.create_team(&new_team).await?)
    }

    /// Issue a new scheduling request: authorize the caller against the team,
    /// mint the capability token, persist the pending request, and notify the
    /// guest best-effort.
    pub async fn create_request(
        &self,
        owner_user_id: Uuid,
        team_id: Uuid,
        input: CreateRequestInput,
    ) -> AppResult<CreatedRequest> {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        // A team that does not exist and a team owned by someone else get the
        // same denial, so a caller cannot probe for team existence.
        let Some(team) = self.store.team_owned_by(team_id, owner_user_id).await? else {
            return Err(AppError::NotFound("Team not found".into()));
        };

        let new_request = NewAvailabilityRequest {
            team_id,
            guest_name: input.guest_name,
            guest_email: input.guest_email,
            guest_notes: input.guest_notes,
            token: token::issue(),
            expires_at: self
                .request_expiry
                .map(|ttl| OffsetDateTime::now_utc() + ttl),
        };
        let request = self.store.create_request(&new_request).await?;

        let capability_url = self.capability_url(&request.token);
        notify::dispatch(
            self.notifier.clone(),
            request.guest_email.clone(),
            TemplateKind::GuestInvited,
            json!({
                "guest_name": request.guest_name,
                "team_name": team.name,
                "capability_url": capability_url,
            }),
        );

        Ok(CreatedRequest {
            request,
            capability_url,
        })
    }

    /// All requests across every team the owner holds.
    pub async fn list_requests(
        &self,
        owner_user_id: Uuid,
    ) -> AppResult<Vec<AvailabilityRequest>> {
        Ok(self.store.requests_for_owner(owner_user_id).await?)
    }

    /// Wholesale replacement of the owner's weekly windows.
    pub async fn replace_owner_availability(
        &self,
        owner_user_id: Uuid,
        inputs: &[WindowInput],
    ) -> AppResult<Vec<WindowDto>> {
        let spans = parse_spans(inputs)?;
        let windows = self
            .store
            .replace_owner_windows(owner_user_id, &spans)
            .await?;
        Ok(windows.iter().map(window_dto).collect())
    }

    /// Guest-facing request view: summary plus the owner's windows, so the
    /// guest can see what to intersect against.
    pub async fn get_request(&self, token: &str) -> AppResult<RequestView> {
        let request = self.resolve(token).await?;
        let team = self.team_of(&request).await?;
        let owner_windows = self.store.owner_windows(team.owner_user_id).await?;

        Ok(RequestView {
            id: request.id,
            team_name: team.name,
            guest_name: request.guest_name,
            guest_email: request.guest_email,
            guest_notes: request.guest_notes,
            status: request.status,
            expires_at: request.expires_at,
            booked_at: request.booked_at,
            owner_windows: owner_windows.iter().map(window_dto).collect(),
        })
    }

    /// Guest submits their weekly windows. Permitted only while the request is
    /// pending; the store transition guard makes a lost race an invalid-state
    /// error rather than a silent overwrite.
    pub async fn submit_availability(
        &self,
        token: &str,
        inputs: &[WindowInput],
    ) -> AppResult<OverlapResponse> {
        if inputs.is_empty() {
            return Err(AppError::Validation(
                "At least one availability window is required".into(),
            ));
        }
        let spans = parse_spans(inputs)?;

        let request = self.resolve(token).await?;
        if request.status != RequestStatus::Pending {
            return Err(AppError::InvalidState(
                "Availability was already submitted for this request".into(),
            ));
        }

        match self.store.submit_guest_windows(request.id, &spans).await {
            Ok(_) => {}
            Err(DatabaseError::Conflict) => {
                return Err(AppError::InvalidState(
                    "Availability was already submitted for this request".into(),
                ))
            }
            Err(err) => return Err(err.into()),
        }

        let (_, slots) = self.fresh_overlap(&request).await?;
        Ok(overlap_response(slots))
    }

    /// Recompute the overlap for either party. Never served from a cache:
    /// windows may change until the request is terminal.
    pub async fn get_overlap(&self, token: &str) -> AppResult<OverlapResponse> {
        let request = self.resolve(token).await?;
        if request.status == RequestStatus::Pending {
            return Err(AppError::InvalidState(
                "Guest availability has not been submitted yet".into(),
            ));
        }

        let (_, slots) = self.fresh_overlap(&request).await?;
        Ok(overlap_response(slots))
    }

    /// Convert a chosen slot into a confirmed reservation. The chosen pair
    /// must appear verbatim in the overlap recomputed now, not in whatever the
    /// caller was shown earlier.
    pub async fn finalize_booking(
        &self,
        token: &str,
        date: &str,
        start_time: &str,
    ) -> AppResult<Reservation> {
        let chosen_date = Date::parse(date, DATE_FMT)
            .map_err(|_| AppError::Validation(format!("Invalid date: {date}")))?;
        let chosen_time = Time::parse(start_time, TIME_FMT)
            .map_err(|_| AppError::Validation(format!("Invalid time: {start_time}")))?;

        let request = self.resolve(token).await?;
        match request.status {
            RequestStatus::Submitted => {}
            RequestStatus::Booked => {
                return Err(AppError::InvalidState(
                    "This request has already been booked".into(),
                ))
            }
            _ => {
                return Err(AppError::InvalidState(
                    "Guest availability has not been submitted yet".into(),
                ))
            }
        }

        let (team, slots) = self.fresh_overlap(&request).await?;
        let Some(slot) = slots
            .iter()
            .find(|s| s.date == chosen_date && s.start == chosen_time)
        else {
            return Err(AppError::StaleSelection(
                "The chosen slot is not part of the current overlap".into(),
            ));
        };

        let starts_at = PrimitiveDateTime::new(slot.date, slot.start).assume_utc();
        let ends_at = PrimitiveDateTime::new(slot.date, slot.end).assume_utc();
        let new_reservation = NewReservation {
            request_id: request.id,
            guest_name: request.guest_name.clone(),
            guest_email: request.guest_email.clone(),
            starts_at,
            ends_at,
        };

        let reservation = match self.store.book(request.id, &new_reservation).await {
            Ok(reservation) => reservation,
            Err(DatabaseError::Conflict) => {
                return Err(AppError::InvalidState(
                    "This request is no longer awaiting booking".into(),
                ))
            }
            Err(err) => return Err(err.into()),
        };

        // Side effects only after the booking transaction has committed.
        let payload = json!({
            "guest_name": reservation.guest_name,
            "team_name": team.name,
            "starts_at": fmt_date(slot.date),
            "start_time": fmt_time(slot.start),
            "display": slot.display,
        });
        notify::dispatch(
            self.notifier.clone(),
            reservation.guest_email.clone(),
            TemplateKind::BookingConfirmedGuest,
            payload.clone(),
        );
        // The relay resolves owner user ids to addresses; no owner account
        // data lives in this core.
        notify::dispatch(
            self.notifier.clone(),
            team.owner_user_id.to_string(),
            TemplateKind::BookingConfirmedOwner,
            payload,
        );
        calendar::dispatch_event(
            self.calendar.clone(),
            CalendarEvent {
                summary: format!("{} / {}", team.name, reservation.guest_name),
                starts_at,
                ends_at,
                attendees: vec![
                    reservation.guest_email.clone(),
                    team.owner_user_id.to_string(),
                ],
            },
        );

        Ok(reservation)
    }

    pub fn capability_url(&self, token: &str) -> String {
        format!("{}/schedule/{}", self.public_base_url, token)
    }

    /// Resolve a token to its request, applying lazy expiry: a pending request
    /// past its deadline is flipped to `expired` before the expired response
    /// is returned. Submitted requests never expire automatically.
    async fn resolve(&self, token: &str) -> AppResult<AvailabilityRequest> {
        let Some(request) = self.store.request_by_token(token).await? else {
            return Err(AppError::NotFound("Unknown scheduling link".into()));
        };

        if request.status == RequestStatus::Expired {
            return Err(AppError::Expired("This scheduling request has expired".into()));
        }

        if request.status == RequestStatus::Pending {
            if let Some(expires_at) = request.expires_at {
                if expires_at < OffsetDateTime::now_utc() {
                    // A lost guard means another reader flipped it first;
                    // either way the outcome is the same.
                    self.store
                        .transition_status(
                            request.id,
                            RequestStatus::Pending,
                            RequestStatus::Expired,
                        )
                        .await?;
                    return Err(AppError::Expired(
                        "This scheduling request has expired".into(),
                    ));
                }
            }
        }

        Ok(request)
    }

    async fn team_of(&self, request: &AvailabilityRequest) -> AppResult<Team> {
        self.store
            .team(request.team_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Request {} references a missing team", request.id))
            })
    }

    /// Overlap recomputed from current stored state. Called on every query and
    /// again at finalize time; results are never memoized across calls.
    async fn fresh_overlap(
        &self,
        request: &AvailabilityRequest,
    ) -> AppResult<(Team, Vec<OverlapSlot>)> {
        let team = self.team_of(request).await?;
        let owner_windows = self.store.owner_windows(team.owner_user_id).await?;
        let guest_windows = self.store.guest_windows(request.id).await?;
        let today = OffsetDateTime::now_utc().date();
        let slots = overlap::compute_overlap(&owner_windows, &guest_windows, today);
        Ok((team, slots))
    }
}

fn parse_spans(inputs: &[WindowInput]) -> AppResult<Vec<WindowSpan>> {
    let mut spans = Vec::with_capacity(inputs.len());
    for input in inputs {
        input
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        spans.push(input.to_span().map_err(AppError::Validation)?);
    }
    Ok(spans)
}

fn overlap_response(slots: Vec<OverlapSlot>) -> OverlapResponse {
    let slots: Vec<SlotDto> = slots
        .iter()
        .map(|slot| SlotDto {
            day_of_week: slot.day_of_week,
            day_name: day_name(slot.day_of_week),
            date: fmt_date(slot.date),
            start_time: fmt_time(slot.start),
            end_time: fmt_time(slot.end),
            display: slot.display.clone(),
        })
        .collect();
    let count = slots.len();
    OverlapResponse { slots, count }
}

fn window_dto(window: &WeeklyWindow) -> WindowDto {
    WindowDto {
        day_of_week: window.day_of_week,
        day_name: day_name(window.day_of_week),
        start_time: fmt_time(window.start_time),
        end_time: fmt_time(window.end_time),
    }
}

// Formatting with these fixed descriptions cannot fail.
fn fmt_date(date: Date) -> String {
    date.format(DATE_FMT).unwrap_or_default()
}

fn fmt_time(time: Time) -> String {
    time.format(TIME_FMT).unwrap_or_default()
}
