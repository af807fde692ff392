use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::{AvailabilityRequest, CreateRequestInput, Reservation, Team, WindowInput};
use crate::error::AppResult;
use crate::middleware::auth::OwnerId;

use super::service::{CreatedRequest, OverlapResponse, RequestView, WindowDto};

#[derive(Debug, Deserialize)]
pub struct CreateTeamBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityBody {
    pub windows: Vec<WindowInput>,
}

#[derive(Debug, Deserialize)]
pub struct BookSlotBody {
    pub date: String,
    pub time: String,
}

pub async fn create_team(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Json(body): Json<CreateTeamBody>,
) -> AppResult<(StatusCode, Json<Team>)> {
    let team = state.scheduling.create_team(owner, body.name).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn create_request(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Path(team_id): Path<Uuid>,
    Json(input): Json<CreateRequestInput>,
) -> AppResult<(StatusCode, Json<CreatedRequest>)> {
    let created = state
        .scheduling
        .create_request(owner, team_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_requests(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> AppResult<Json<Vec<AvailabilityRequest>>> {
    Ok(Json(state.scheduling.list_requests(owner).await?))
}

pub async fn replace_owner_availability(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Json(body): Json<AvailabilityBody>,
) -> AppResult<Json<Vec<WindowDto>>> {
    let windows = state
        .scheduling
        .replace_owner_availability(owner, &body.windows)
        .await?;
    Ok(Json(windows))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<RequestView>> {
    Ok(Json(state.scheduling.get_request(&token).await?))
}

pub async fn submit_availability(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<AvailabilityBody>,
) -> AppResult<Json<OverlapResponse>> {
    let overlap = state
        .scheduling
        .submit_availability(&token, &body.windows)
        .await?;
    Ok(Json(overlap))
}

pub async fn get_overlap(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<OverlapResponse>> {
    Ok(Json(state.scheduling.get_overlap(&token).await?))
}

pub async fn finalize_booking(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<BookSlotBody>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state
        .scheduling
        .finalize_booking(&token, &body.date, &body.time)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}
