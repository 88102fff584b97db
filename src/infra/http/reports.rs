//! Route handlers for report generation and retrieval.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HOST},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    application::reports::{ReportError, ReportService},
    domain::{
        artifact::{ArtifactName, RetrievalToken},
        report::ReportRequest,
    },
    infra::assets::{self, Disposition},
};

use super::error::ApiError;

#[derive(Clone)]
pub struct HttpState {
    pub reports: Arc<ReportService>,
    /// Configured external base for retrieval links; the request Host header
    /// is used when absent.
    pub public_base_url: Option<Url>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateReportBody {
    #[serde(default)]
    input_data: Option<ReportRequest>,
    #[serde(default)]
    hashed_link: bool,
}

#[derive(Debug, Serialize)]
struct LinkBody {
    url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct VersionBody {
    version: &'static str,
}

pub async fn generate_report(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(body): Json<GenerateReportBody>,
) -> Response {
    const SOURCE: &str = "infra::http::reports::generate_report";

    let request = body.input_data.unwrap_or_default();
    let name = match state.reports.generate(&request).await {
        Ok(name) => name,
        Err(err) => return report_error_response(SOURCE, err),
    };

    if body.hashed_link {
        let token = state.reports.issue_link(&name).await;
        let url = download_url(&state, &headers, &token);
        return Json(LinkBody { url }).into_response();
    }

    match state.reports.take(&name).await {
        Ok(bytes) => attachment_response(&name, bytes),
        Err(err) => report_error_response(SOURCE, err),
    }
}

pub async fn download_report(
    State(state): State<HttpState>,
    Path(token): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::reports::download_report";

    let Some(token) = RetrievalToken::from_wire(&token) else {
        return ApiError::not_found(SOURCE).into_response();
    };

    match state.reports.claim(&token).await {
        Ok((name, bytes)) => attachment_response(&name, bytes),
        Err(err) => report_error_response(SOURCE, err),
    }
}

pub async fn version() -> Json<VersionBody> {
    Json(VersionBody {
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn privacy_policy() -> Response {
    assets::serve_document(
        "privacy.txt",
        Disposition::Attachment,
        "infra::http::reports::privacy_policy",
    )
}

pub async fn openapi_document() -> Response {
    assets::serve_document(
        "openapi.yaml",
        Disposition::Inline,
        "infra::http::reports::openapi_document",
    )
}

fn report_error_response(source: &'static str, error: ReportError) -> Response {
    match &error {
        ReportError::Domain(_) => ApiError::missing_input(source).into_response(),
        ReportError::NotFound => ApiError::not_found(source).into_response(),
        ReportError::Render(_) | ReportError::Storage(_) => {
            ApiError::internal(source, "Failed to produce report", &error).into_response()
        }
    }
}

/// Fully-qualified retrieval URL for a freshly issued token.
fn download_url(state: &HttpState, headers: &HeaderMap, token: &RetrievalToken) -> String {
    let path = format!("/download-report/{token}");

    if let Some(base) = &state.public_base_url
        && let Ok(url) = base.join(&path)
    {
        return url.to_string();
    }

    let host = headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}{path}")
}

fn attachment_response(name: &ArtifactName, bytes: Bytes) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(name.as_str()).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{name}\"")) {
        headers.insert(CONTENT_DISPOSITION, value);
    }

    response
}
