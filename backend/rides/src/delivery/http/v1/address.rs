use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::domain::session::Session;
use crate::usecase::error::UsecaseError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveAddressRequest {
    pub location_description: String,
}

#[derive(Serialize)]
pub struct ResolveAddressResponse {
    pub accurate_address: String,
}

#[tracing::instrument(skip(state, payload), fields(user_id = %session.user_id))]
pub async fn resolve_address(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ResolveAddressRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    let result = state
        .address_usecase
        .resolve(&payload.location_description)
        .await;

    let outcome = match &result {
        Ok(_) => "resolved",
        Err(UsecaseError::Validation(_)) => "rejected",
        Err(_) => "failed",
    };
    metrics::counter!("address_resolutions_total", "outcome" => outcome).increment(1);

    let accurate_address = result?;
    Ok((StatusCode::OK, Json(ResolveAddressResponse { accurate_address })))
}
