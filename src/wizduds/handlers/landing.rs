use super::page;
use crate::wizduds::{pages::landing, state::AppState};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use std::sync::Arc;
use tracing::{error, instrument};

/// Landing page. A failing session or user lookup renders the anonymous variant.
#[instrument(skip_all)]
pub async fn landing(state: Extension<Arc<AppState>>, headers: HeaderMap) -> Response {
    let user = state.current_user(&headers).await.unwrap_or_else(|err| {
        error!("Failed to resolve current user: {:#}", err);
        None
    });

    page(StatusCode::OK, landing::render(user.as_ref()))
}
