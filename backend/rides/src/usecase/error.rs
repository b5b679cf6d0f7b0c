use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::domain::ride_request::RideRequestError;
use crate::domain::route::RouteValidationError;
use crate::repository::errors::RepositoryError;

#[derive(Debug, Error)]
pub enum UsecaseError {
    #[error("{0}")]
    Validation(String),

    #[error("Sign in to continue")]
    NotAuthenticated { redirect_to: String },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    BackendWrite(String),

    #[error("{0}")]
    ExternalService(String),

    #[error("{0}")]
    Unavailable(String),
}

impl From<RepositoryError> for UsecaseError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => UsecaseError::NotFound("Resource".to_string()),
            RepositoryError::DatabaseError(msg) | RepositoryError::CorruptRow(msg) => {
                UsecaseError::BackendWrite(msg)
            }
        }
    }
}

impl From<RouteValidationError> for UsecaseError {
    fn from(e: RouteValidationError) -> Self {
        UsecaseError::Validation(e.to_string())
    }
}

impl From<RideRequestError> for UsecaseError {
    fn from(e: RideRequestError) -> Self {
        UsecaseError::Validation(e.to_string())
    }
}

impl IntoResponse for UsecaseError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            UsecaseError::Validation(_) => StatusCode::BAD_REQUEST,
            UsecaseError::NotAuthenticated { .. } => StatusCode::UNAUTHORIZED,
            UsecaseError::Forbidden(_) => StatusCode::FORBIDDEN,
            UsecaseError::NotFound(_) => StatusCode::NOT_FOUND,
            UsecaseError::BackendWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UsecaseError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            UsecaseError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        match &self {
            UsecaseError::BackendWrite(_) => {
                tracing::error!(error = %self, "backend write failed");
            }
            UsecaseError::ExternalService(_) | UsecaseError::Unavailable(_) => {
                tracing::warn!(error = %self, "dependency failed");
            }
            UsecaseError::NotFound(_) => {
                tracing::warn!(error = %self, "resource not found");
            }
            UsecaseError::Forbidden(_) => {
                tracing::warn!(error = %self, "forbidden");
            }
            _ => {
                tracing::debug!(error = %self);
            }
        }

        let body = match &self {
            UsecaseError::NotAuthenticated { redirect_to } => json!({
                "error": self.to_string(),
                "redirect_to": redirect_to,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (UsecaseError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                UsecaseError::NotAuthenticated {
                    redirect_to: "/ride/1".into(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (UsecaseError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (UsecaseError::NotFound("Ride".into()), StatusCode::NOT_FOUND),
            (UsecaseError::BackendWrite("db".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (UsecaseError::ExternalService("ai".into()), StatusCode::BAD_GATEWAY),
            (UsecaseError::Unavailable("slow".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_repository_errors_convert() {
        assert!(matches!(
            UsecaseError::from(RepositoryError::NotFound),
            UsecaseError::NotFound(_)
        ));
        assert!(matches!(
            UsecaseError::from(RepositoryError::DatabaseError("down".into())),
            UsecaseError::BackendWrite(_)
        ));
    }
}
