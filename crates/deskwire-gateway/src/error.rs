// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from domain errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use deskwire_core::DeskwireError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Thin wrapper so handlers can use `?` on pipeline calls.
///
/// Lock contention is the one error the contract makes user-visible as a
/// conflict; it must never turn into a retryable 5xx.
#[derive(Debug)]
pub struct ApiError(pub DeskwireError);

impl From<DeskwireError> for ApiError {
    fn from(e: DeskwireError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DeskwireError::SessionBusy { .. } => StatusCode::CONFLICT,
            DeskwireError::NotFound { .. } => StatusCode::NOT_FOUND,
            DeskwireError::Envelope(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_busy_maps_to_conflict() {
        let response = ApiError(DeskwireError::SessionBusy { connection_id: 3 }).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError(DeskwireError::NotFound {
            entity: "ticket",
            id: "9".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn storage_errors_are_internal() {
        let response =
            ApiError(DeskwireError::Internal("boom".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
