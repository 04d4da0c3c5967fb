use crate::wizduds::auth::{
    spawn_session_sweeper, PgSessionStore, PgUserDirectory, SessionConfig, Sessions,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, services::ServeDir, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;

pub mod auth;
pub mod handlers;
mod openapi;
pub mod pages;
pub mod state;

pub use openapi::openapi;
pub use state::AppState;

/// Server settings resolved from the command line.
#[derive(Clone, Debug)]
pub struct Settings {
    pub port: u16,
    pub dsn: String,
    pub session: SessionConfig,
    pub static_dir: Option<PathBuf>,
}

/// Build the application router: documented routes, the landing page,
/// optional static assets, and the request-id/tracing layers.
#[must_use]
pub fn router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let (router, _openapi) = openapi::api_router().split_for_parts();
    let router = router.route("/", get(handlers::landing::landing));

    let router = match static_dir {
        Some(dir) => router.nest_service("/_static", ServeDir::new(dir)),
        None => router,
    };

    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(state)),
    )
}

/// Start the server
/// # Errors
/// Return error if failed to connect to the database or to start the server
pub async fn new(settings: Settings) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&settings.dsn)
        .await
        .context("Failed to connect to database")?;

    let sessions = Sessions::new(
        Arc::new(PgSessionStore::new(pool.clone())),
        settings.session,
    );
    spawn_session_sweeper(sessions.clone());

    let state = Arc::new(AppState::new(
        Arc::new(PgUserDirectory::new(pool)),
        sessions,
    ));

    let app = router(state, settings.static_dir);

    let listener = TcpListener::bind(format!("[::]:{}", settings.port))
        .await
        .with_context(|| format!("Failed to bind port {}", settings.port))?;

    info!("Listening on [::]:{}", settings.port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", err);
                std::future::pending::<()>().await;
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
