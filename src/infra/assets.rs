//! Embedded static document serving.

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};

use crate::application::error::ErrorReport;

static STATIC_DOCS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// How the served document should be presented to the caller.
#[derive(Debug, Clone, Copy)]
pub enum Disposition {
    Inline,
    Attachment,
}

/// Serve one embedded document by name.
pub fn serve_document(name: &'static str, disposition: Disposition, source: &'static str) -> Response {
    let Some(file) = STATIC_DOCS.get_file(name) else {
        let mut response = StatusCode::NOT_FOUND.into_response();
        ErrorReport::from_message(source, StatusCode::NOT_FOUND, "Static document not found")
            .attach(&mut response);
        return response;
    };

    let bytes = Bytes::from_static(file.contents());
    let mime = mime_guess::from_path(name).first_or_text_plain();

    let mut response = Response::new(Body::from(bytes.clone()));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&bytes.len().to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    if let Disposition::Attachment = disposition
        && let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    response
}
