use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::booking::BookingConfirmation;
use crate::domain::route::{Route, RouteDay, RouteDraft, RouteStatus, Schedule, ScheduleDraft};
use crate::domain::session::Session;
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[derive(Serialize)]
pub struct RouteResponse {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub start_point: String,
    pub end_point: String,
    pub travel_time: String,
    pub available_seats: i32,
    pub price: f64,
    #[serde(flatten)]
    pub schedule: Schedule,
    pub status: RouteStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRouteRequest {
    #[validate(length(min = 1, max = 200))]
    pub start_point: String,
    #[validate(length(min = 1, max = 200))]
    pub end_point: String,
    #[validate(length(min = 4, max = 5))]
    pub travel_time: String,
    #[validate(range(min = 1, max = 8))]
    pub available_seats: i32,
    #[validate(range(min = 0.0, max = 50.0))]
    pub price: f64,
    pub schedule_type: String,
    #[serde(default)]
    #[validate(length(max = 7))]
    pub route_days: Vec<String>,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl CreateRouteRequest {
    fn into_draft(self) -> Result<RouteDraft, UsecaseError> {
        let schedule = match self.schedule_type.as_str() {
            Schedule::RECURRING => ScheduleDraft::Recurring {
                route_days: self
                    .route_days
                    .iter()
                    .map(|d| d.parse::<RouteDay>())
                    .collect::<Result<Vec<_>, _>>()?,
            },
            Schedule::ONE_TIME => ScheduleDraft::OneTime {
                date: self.date.ok_or_else(|| {
                    UsecaseError::Validation("date is required for a one-time ride".to_string())
                })?,
            },
            other => {
                return Err(UsecaseError::Validation(format!(
                    "schedule_type must be 'recurring' or 'one-time', got {:?}",
                    other
                )));
            }
        };

        Ok(RouteDraft {
            start_point: self.start_point,
            end_point: self.end_point,
            travel_time: self.travel_time,
            available_seats: self.available_seats,
            price: self.price,
            schedule,
            utc_offset_minutes: self.utc_offset_minutes,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

pub fn route_to_response(route: Route, now: DateTime<Utc>) -> RouteResponse {
    let status = route.status(now);
    RouteResponse {
        id: route.id,
        driver_id: route.driver_id,
        start_point: route.start_point,
        end_point: route.end_point,
        travel_time: route.travel_time,
        available_seats: route.available_seats,
        price: route.price,
        schedule: route.schedule,
        status,
        created_at: route.created_at,
    }
}

fn routes_to_response(routes: Vec<Route>) -> Vec<RouteResponse> {
    let now = Utc::now();
    routes.into_iter().map(|r| route_to_response(r, now)).collect()
}

#[tracing::instrument(skip(state))]
pub async fn search_routes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling search routes request");

    let routes = state
        .routes_usecase
        .search(query.from.as_deref(), query.to.as_deref())
        .await?;
    let response = routes_to_response(routes);

    tracing::debug!(count = response.len(), "routes searched successfully");
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip(state), fields(%route_id))]
pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(route_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling get route request");

    let route = state.routes_usecase.get_route(route_id).await?;

    Ok((StatusCode::OK, Json(route_to_response(route, Utc::now()))))
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id))]
pub async fn list_my_routes(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling list my routes request");

    let routes = state.routes_usecase.get_driver_routes(session.user_id).await?;
    let response = routes_to_response(routes);

    tracing::debug!(count = response.len(), "routes listed successfully");
    Ok((StatusCode::OK, Json(response)))
}

#[tracing::instrument(skip(state, payload), fields(user_id = %session.user_id))]
pub async fn create_route(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(payload): Json<CreateRouteRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling create route request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(user_id = %session.user_id, ?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(validation_errors.to_string()));
    }

    let route = state
        .routes_usecase
        .publish(session.user_id, payload.into_draft()?)
        .await?;

    metrics::counter!("routes_published_total", "schedule_type" => route.schedule.schedule_type())
        .increment(1);
    tracing::debug!(route_id = %route.id, "route created successfully");
    Ok((StatusCode::CREATED, Json(route_to_response(route, Utc::now()))))
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id, %route_id))]
pub async fn delete_route(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(route_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling delete route request");

    state
        .routes_usecase
        .remove_route(session.user_id, route_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state), fields(user_id = %session.user_id, %route_id))]
pub async fn complete_route(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(route_id): Path<Uuid>,
) -> Result<(StatusCode, Json<BookingConfirmation>), UsecaseError> {
    tracing::debug!("handling complete route request");

    let confirmation = state
        .routes_usecase
        .complete_route(session.user_id, route_id)
        .await?;

    metrics::counter!("routes_completed_total").increment(1);
    Ok((StatusCode::CREATED, Json(confirmation)))
}
