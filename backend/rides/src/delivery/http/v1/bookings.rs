use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::booking::Party;
use crate::domain::ride_request::BookingType;
use crate::domain::session::{MaybeSession, Session};
use crate::usecase::bookings::BookingRequest;
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub booking_type: BookingType,
    #[validate(length(max = 200))]
    pub pickup_location: Option<String>,
    #[validate(length(max = 200))]
    pub dropoff_location: Option<String>,
    #[validate(length(max = 2048))]
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role: Party,
}

#[tracing::instrument(skip(state, maybe_session, payload), fields(%route_id))]
pub async fn request_booking(
    State(state): State<Arc<AppState>>,
    Extension(maybe_session): Extension<MaybeSession>,
    Path(route_id): Path<Uuid>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!(signed_in = maybe_session.0.is_some(), "handling booking request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(validation_errors.to_string()));
    }

    let booking_type = payload.booking_type;
    let request = BookingRequest {
        route_id,
        booking_type,
        pickup_location: payload.pickup_location,
        dropoff_location: payload.dropoff_location,
        return_to: payload.return_to,
    };

    let start = Instant::now();
    let result = state
        .bookings_usecase
        .request_booking(maybe_session.0.as_ref(), request)
        .await;
    metrics::histogram!("booking_duration_seconds").record(start.elapsed().as_secs_f64());

    match result {
        Ok(receipt) => {
            metrics::counter!("bookings_total", "booking_type" => booking_type.as_str()).increment(1);
            tracing::debug!(conversation_id = %receipt.conversation_id, "booking request created");
            Ok((StatusCode::CREATED, Json(receipt)))
        }
        Err(e) => {
            if !matches!(e, UsecaseError::NotAuthenticated { .. }) {
                metrics::counter!("booking_failures_total").increment(1);
            }
            Err(e)
        }
    }
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id))]
pub async fn booking_history(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<RoleQuery>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!(role = ?query.role, "handling booking history request");

    let history = state
        .bookings_usecase
        .history(session.user_id, query.role)
        .await?;

    Ok((StatusCode::OK, Json(history)))
}
