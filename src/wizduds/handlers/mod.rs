//! Route handlers for the storefront.
//!
//! Pages render HTML; the login action answers with a redirect on success and
//! with field errors (JSON or the re-rendered form) when the submission is rejected.

pub mod health;
pub mod landing;
pub mod login;
pub mod logout;

use axum::{
    http::{
        header::{ACCEPT, LOCATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use tracing::error;

/// `302 Found` to a fixed location.
pub(crate) fn found(location: &'static str) -> Response {
    (
        StatusCode::FOUND,
        [(LOCATION, HeaderValue::from_static(location))],
    )
        .into_response()
}

/// Browsers list `text/html` in `Accept`; API clients and fetch calls usually don't.
pub(crate) fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("text/html"))
}

/// Send a rendered page with `status`; a template failure becomes a 500.
pub(crate) fn page(status: StatusCode, rendered: anyhow::Result<String>) -> Response {
    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            error!("Failed to render page: {:#}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
                .into_response()
        }
    }
}
