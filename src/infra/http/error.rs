//! JSON error responses for the report API.

use std::error::Error as StdError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::ErrorReport;

/// Wire-format error body: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message,
            report: ErrorReport::from_message(source, status, detail),
        }
    }

    /// The exact 400 body the report endpoint promises for absent input.
    pub fn missing_input(source: &'static str) -> Self {
        Self::new(
            source,
            StatusCode::BAD_REQUEST,
            "Missing input data",
            "input_data was missing or empty",
        )
    }

    /// Opaque 404 for tokens that are unknown, malformed, consumed, or expired.
    pub fn not_found(source: &'static str) -> Self {
        Self::new(
            source,
            StatusCode::NOT_FOUND,
            "Report not found",
            "token is unknown, already consumed, or expired",
        )
    }

    pub fn internal(source: &'static str, message: &'static str, error: &dyn StdError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
            report: ErrorReport::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, error),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message.to_owned(),
        };
        let mut response = (self.status, Json(body)).into_response();
        // Attach the structured report so the logging middleware can emit
        // rich diagnostics without exposing them to the caller.
        self.report.attach(&mut response);
        response
    }
}
