// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for the intake pipeline and admin surface

use crate::validator::FieldErrors;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Terminal rejection of a submission.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Rate limit exceeded, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Unreadable request body: {0}")]
    UnreadableBody(String),

    #[error("Human verification failed")]
    VerificationFailed,

    #[error("Validation failed for {} field(s)", .0.len())]
    ValidationFailed(FieldErrors),

    #[error("Failed to persist lead")]
    PersistenceFailed,
}

impl IntakeError {
    /// Label used for metrics and logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::UnreadableBody(_) => "invalid_body",
            Self::VerificationFailed => "verification_failed",
            Self::ValidationFailed(_) => "validation_failed",
            Self::PersistenceFailed => "persistence_failed",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UnreadableBody(_) | Self::VerificationFailed | Self::ValidationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PersistenceFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of every submission response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, errors, retry_after) = match self {
            Self::RateLimited { retry_after } => (
                "Too many requests. Please try again later.",
                None,
                Some(retry_after.as_secs().max(1)),
            ),
            Self::UnreadableBody(_) => ("Invalid request body", None, None),
            Self::VerificationFailed => ("Verification failed. Please try again.", None, None),
            Self::ValidationFailed(errors) => {
                ("Please correct the highlighted fields.", Some(errors), None)
            }
            Self::PersistenceFailed => (
                "Failed to save your request. Please try again.",
                None,
                None,
            ),
        };

        let body = Json(SubmissionResponse {
            success: false,
            message: Some(message.to_string()),
            errors,
            lead_id: None,
        });

        match retry_after {
            Some(secs) => (status, [(header::RETRY_AFTER, secs.to_string())], body).into_response(),
            None => (status, body).into_response(),
        }
    }
}

/// Lead store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("Internal store error: {0}")]
    Internal(String),
}

/// Admin authentication failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email and password are required")]
    MissingFields,

    #[error("Admin login is not configured")]
    NotConfigured,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Body of admin error responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Never reveal which check failed or whether login is configured.
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            Self::InvalidCredentials | Self::NotConfigured => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password")
            }
            Self::MissingFields => (StatusCode::BAD_REQUEST, "Email and password are required"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        };
        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}
