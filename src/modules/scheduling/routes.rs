use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;

use super::handlers::{
    create_request, create_team, finalize_booking, get_overlap, get_request, list_requests,
    replace_owner_availability, submit_availability,
};

pub fn scheduling_routes() -> Router<AppState> {
    Router::new()
        // Owner surface (upstream-authenticated)
        .route("/teams", post(create_team))
        .route("/teams/:team_id/requests", post(create_request))
        .route("/requests", get(list_requests))
        .route("/availability", put(replace_owner_availability))
        // Guest surface (capability token is the credential)
        .route("/schedule/:token", get(get_request))
        .route("/schedule/:token/availability", put(submit_availability))
        .route("/schedule/:token/overlap", get(get_overlap))
        .route("/schedule/:token/book", post(finalize_booking))
}
