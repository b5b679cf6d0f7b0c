use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::delivery::http::v1::bookings::RoleQuery;
use crate::domain::session::Session;
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[tracing::instrument(skip(state), fields(user_id = %session.user_id))]
pub async fn list_ride_requests(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<RoleQuery>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!(role = ?query.role, "handling list ride requests request");

    let requests = state
        .ride_requests_usecase
        .list(session.user_id, query.role)
        .await?;

    Ok((StatusCode::OK, Json(requests)))
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id, %ride_request_id))]
pub async fn accept_ride_request(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(ride_request_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    let request = state
        .ride_requests_usecase
        .accept(session.user_id, ride_request_id)
        .await?;

    Ok((StatusCode::OK, Json(request)))
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id, %ride_request_id))]
pub async fn decline_ride_request(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(ride_request_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    state
        .ride_requests_usecase
        .decline(session.user_id, ride_request_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
