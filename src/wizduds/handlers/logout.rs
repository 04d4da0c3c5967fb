use crate::wizduds::state::AppState;
use axum::{
    extract::Extension,
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

#[utoipa::path(
    post,
    path= "/logout",
    responses (
        (status = 302, description = "Session closed, cookie cleared, redirect to /"),
        (status = 500, description = "Failed to build the clearing cookie", body = String),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn logout(state: Extension<Arc<AppState>>, headers: HeaderMap) -> Response {
    // the browser cookie is cleared even when the store fails
    if let Err(err) = state.sessions().destroy(&headers).await {
        error!("Failed to delete session: {:#}", err);
    } else {
        debug!("Session closed");
    }

    match state.sessions().clear_cookie() {
        Ok(cookie) => (
            StatusCode::FOUND,
            [
                (LOCATION, HeaderValue::from_static("/")),
                (SET_COOKIE, cookie),
            ],
        )
            .into_response(),
        Err(err) => {
            error!("Failed to build session cookie: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
                .into_response()
        }
    }
}
