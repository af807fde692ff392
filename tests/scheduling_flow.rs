//! End-to-end lifecycle tests for the scheduling core, run against the
//! in-memory store so the whole state machine is exercised without Postgres.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use slotlink::db::models::{
    CreateRequestInput, NewAvailabilityRequest, RequestStatus, Team, WindowInput,
};
use slotlink::error::AppError;
use slotlink::modules::scheduling::SchedulingService;
use slotlink::notify::NoopNotifier;
use slotlink::store::{MemoryStore, SchedulingStore};

struct Fixture {
    store: Arc<MemoryStore>,
    service: Arc<SchedulingService>,
    owner: Uuid,
    team: Team,
}

async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(SchedulingService::new(
        store.clone(),
        Arc::new(NoopNotifier),
        None,
        "http://localhost:8000".into(),
        None,
    ));
    let owner = Uuid::new_v4();
    let team = service
        .create_team(owner, "Design Reviews".into())
        .await
        .expect("create team");
    Fixture {
        store,
        service,
        owner,
        team,
    }
}

fn window(day_of_week: i16, start: &str, end: &str) -> WindowInput {
    WindowInput {
        day_of_week,
        start_time: start.into(),
        end_time: end.into(),
    }
}

fn guest_input() -> CreateRequestInput {
    CreateRequestInput {
        guest_name: "Grace Hopper".into(),
        guest_email: "grace@example.com".into(),
        guest_notes: Some("About the Q3 roadmap".into()),
    }
}

async fn invite_guest(fx: &Fixture) -> String {
    let created = fx
        .service
        .create_request(fx.owner, fx.team.id, guest_input())
        .await
        .expect("create request");
    assert!(created.capability_url.ends_with(&created.request.token));
    created.request.token
}

#[tokio::test]
async fn full_flow_from_invite_to_booking() {
    let fx = fixture().await;
    fx.service
        .replace_owner_availability(fx.owner, &[window(1, "09:00", "11:00")])
        .await
        .expect("owner availability");

    let token = invite_guest(&fx).await;

    // Guest fetches the request and sees the owner's windows.
    let view = fx.service.get_request(&token).await.expect("get request");
    assert_eq!(view.status, RequestStatus::Pending);
    assert_eq!(view.owner_windows.len(), 1);
    assert_eq!(view.owner_windows[0].day_name, "Monday");

    // Mon 09:00-11:00 x Mon 10:00-12:00 -> exactly one slot, 10:00-11:00.
    let overlap = fx
        .service
        .submit_availability(&token, &[window(1, "10:00", "12:00")])
        .await
        .expect("submit availability");
    assert_eq!(overlap.count, 1);
    let slot = &overlap.slots[0];
    assert_eq!(slot.start_time, "10:00");
    assert_eq!(slot.end_time, "11:00");
    assert_eq!(slot.day_name, "Monday");

    // Either party can recompute the overlap once submitted.
    let again = fx.service.get_overlap(&token).await.expect("get overlap");
    assert_eq!(again.count, 1);

    let reservation = fx
        .service
        .finalize_booking(&token, &slot.date, &slot.start_time)
        .await
        .expect("finalize booking");
    assert_eq!(reservation.guest_email, "grace@example.com");
    assert_eq!(reservation.ends_at - reservation.starts_at, Duration::hours(1));

    let stored = fx
        .store
        .request_by_token(&token)
        .await
        .expect("read back")
        .expect("request exists");
    assert_eq!(stored.status, RequestStatus::Booked);
    assert_eq!(stored.reservation_id, Some(reservation.id));
    assert_eq!(stored.booked_at, Some(reservation.starts_at));

    // Terminal state: a second finalize is rejected.
    let err = fx
        .service
        .finalize_booking(&token, &slot.date, &slot.start_time)
        .await
        .expect_err("double finalize");
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn create_request_collapses_foreign_and_missing_teams() {
    let fx = fixture().await;

    let missing = fx
        .service
        .create_request(fx.owner, Uuid::new_v4(), guest_input())
        .await
        .expect_err("missing team");
    let foreign = fx
        .service
        .create_request(Uuid::new_v4(), fx.team.id, guest_input())
        .await
        .expect_err("foreign team");

    // Same generic denial for both, so callers cannot probe team existence.
    assert!(matches!(missing, AppError::NotFound(_)));
    assert!(matches!(foreign, AppError::NotFound(_)));
}

#[tokio::test]
async fn resubmission_is_rejected_and_windows_are_kept() {
    let fx = fixture().await;
    fx.service
        .replace_owner_availability(fx.owner, &[window(1, "09:00", "17:00")])
        .await
        .expect("owner availability");
    let token = invite_guest(&fx).await;

    fx.service
        .submit_availability(&token, &[window(1, "09:00", "12:00")])
        .await
        .expect("first submit");

    let err = fx
        .service
        .submit_availability(&token, &[window(2, "13:00", "15:00")])
        .await
        .expect_err("second submit");
    assert!(matches!(err, AppError::InvalidState(_)));

    let request = fx
        .store
        .request_by_token(&token)
        .await
        .expect("read back")
        .expect("request exists");
    let windows = fx
        .store
        .guest_windows(request.id)
        .await
        .expect("guest windows");
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].day_of_week, 1);
}

#[tokio::test]
async fn overlap_query_requires_submission() {
    let fx = fixture().await;
    let token = invite_guest(&fx).await;

    let err = fx.service.get_overlap(&token).await.expect_err("pending overlap");
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let fx = fixture().await;
    let err = fx
        .service
        .get_request("not-a-real-token")
        .await
        .expect_err("unknown token");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn previously_shown_slot_goes_stale_when_windows_change() {
    let fx = fixture().await;
    fx.service
        .replace_owner_availability(fx.owner, &[window(1, "09:00", "11:00")])
        .await
        .expect("owner availability");
    let token = invite_guest(&fx).await;

    let overlap = fx
        .service
        .submit_availability(&token, &[window(1, "09:00", "11:00")])
        .await
        .expect("submit");
    let shown_date = overlap.slots[0].date.clone();
    let shown_start = overlap.slots[0].start_time.clone();

    // Owner withdraws Monday before the guest confirms.
    fx.service
        .replace_owner_availability(fx.owner, &[window(2, "09:00", "11:00")])
        .await
        .expect("owner availability");

    let err = fx
        .service
        .finalize_booking(&token, &shown_date, &shown_start)
        .await
        .expect_err("stale slot");
    assert!(matches!(err, AppError::StaleSelection(_)));

    let request = fx
        .store
        .request_by_token(&token)
        .await
        .expect("read back")
        .expect("request exists");
    assert_eq!(request.status, RequestStatus::Submitted);
}

#[tokio::test]
async fn fabricated_slot_is_a_stale_selection() {
    let fx = fixture().await;
    fx.service
        .replace_owner_availability(fx.owner, &[window(1, "09:00", "11:00")])
        .await
        .expect("owner availability");
    let token = invite_guest(&fx).await;
    fx.service
        .submit_availability(&token, &[window(1, "09:00", "11:00")])
        .await
        .expect("submit");

    // Monday overlap exists, but this pair was never in it.
    let err = fx
        .service
        .finalize_booking(&token, "2030-01-01", "03:00")
        .await
        .expect_err("fabricated slot");
    assert!(matches!(err, AppError::StaleSelection(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_finalize_has_exactly_one_winner() {
    let fx = fixture().await;
    fx.service
        .replace_owner_availability(fx.owner, &[window(1, "09:00", "11:00")])
        .await
        .expect("owner availability");
    let token = invite_guest(&fx).await;
    let overlap = fx
        .service
        .submit_availability(&token, &[window(1, "09:00", "11:00")])
        .await
        .expect("submit");
    let date = overlap.slots[0].date.clone();
    let start = overlap.slots[0].start_time.clone();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let service = fx.service.clone();
        let token = token.clone();
        let date = date.clone();
        let start = start.clone();
        handles.push(tokio::spawn(async move {
            service.finalize_booking(&token, &date, &start).await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(_) => wins += 1,
            Err(AppError::InvalidState(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 1);

    let request = fx
        .store
        .request_by_token(&token)
        .await
        .expect("read back")
        .expect("request exists");
    assert_eq!(request.status, RequestStatus::Booked);
    assert!(request.reservation_id.is_some());
}

#[tokio::test]
async fn pending_request_past_deadline_expires_on_read() {
    let fx = fixture().await;

    // Seed a request whose deadline has already passed.
    let request = fx
        .store
        .create_request(&NewAvailabilityRequest {
            team_id: fx.team.id,
            guest_name: "Grace Hopper".into(),
            guest_email: "grace@example.com".into(),
            guest_notes: None,
            token: slotlink::token::issue(),
            expires_at: Some(OffsetDateTime::now_utc() - Duration::hours(1)),
        })
        .await
        .expect("seed request");

    let err = fx
        .service
        .get_request(&request.token)
        .await
        .expect_err("expired read");
    assert!(matches!(err, AppError::Expired(_)));

    // Lazy expiry persisted the terminal status.
    let stored = fx
        .store
        .request_by_token(&request.token)
        .await
        .expect("read back")
        .expect("request exists");
    assert_eq!(stored.status, RequestStatus::Expired);

    // Terminal: the guest can no longer submit.
    let err = fx
        .service
        .submit_availability(&request.token, &[window(1, "09:00", "10:00")])
        .await
        .expect_err("submit after expiry");
    assert!(matches!(err, AppError::Expired(_)));
}
