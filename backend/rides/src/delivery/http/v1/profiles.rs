use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::session::Session;
use crate::domain::user_profile::{ProfilePatch, UserProfile};
use crate::usecase::error::UsecaseError;
use crate::AppState;

/// What other users may see of a profile.
#[derive(Serialize)]
pub struct PublicProfileResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture_url: Option<String>,
    pub is_driver: bool,
}

impl From<UserProfile> for PublicProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            profile_picture_url: profile.profile_picture_url,
            is_driver: profile.is_driver,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 32))]
    pub phone_number: Option<String>,
    #[validate(length(max = 2048))]
    pub profile_picture_url: Option<String>,
    pub is_driver: Option<bool>,
}

impl From<UpdateProfileRequest> for ProfilePatch {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            first_name: request.first_name.map(|s| s.trim().to_string()),
            last_name: request.last_name.map(|s| s.trim().to_string()),
            phone_number: request.phone_number.map(|s| s.trim().to_string()),
            profile_picture_url: request.profile_picture_url.map(|s| s.trim().to_string()),
            is_driver: request.is_driver,
        }
    }
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn register_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling register profile request");

    let profile = state.profiles_usecase.register(&session).await?;

    Ok((StatusCode::OK, Json(profile)))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
pub async fn get_my_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, UsecaseError> {
    let profile = state.profiles_usecase.get(session.user_id).await?;

    Ok((StatusCode::OK, Json(profile)))
}

#[tracing::instrument(skip(state, session, payload), fields(user_id = %session.user_id))]
pub async fn update_my_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, UsecaseError> {
    tracing::debug!("handling update profile request");

    if let Err(validation_errors) = payload.validate() {
        tracing::warn!(?validation_errors, "validation failed");
        return Err(UsecaseError::Validation(validation_errors.to_string()));
    }

    let profile = state
        .profiles_usecase
        .update(session.user_id, payload.into())
        .await?;

    Ok((StatusCode::OK, Json(profile)))
}

#[tracing::instrument(skip(state), fields(%user_id))]
pub async fn get_public_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, UsecaseError> {
    let profile = state.profiles_usecase.get(user_id).await?;

    Ok((StatusCode::OK, Json(PublicProfileResponse::from(profile))))
}
