use super::{found, page, wants_html};
use crate::wizduds::{
    auth::{
        flow::{login, ErrorsBody, LoginOutcome, LoginSubmission},
        ValidationErrors,
    },
    pages::login::{self as form_page, LoginView},
    state::AppState,
};
use axum::{
    extract::{Extension, Query, RawQuery},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Path to continue to after signing in.
    #[serde(rename = "redirectTo")]
    redirect_to: Option<String>,
}

/// Raw login form as posted by the browser.
#[derive(ToSchema, Deserialize)]
pub struct LoginForm {
    email: Option<String>,
    password: Option<String>,
    #[serde(rename = "redirectTo")]
    redirect_to: Option<String>,
    /// Checkbox value; `on` keeps the session across browser restarts.
    remember: Option<String>,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"***")
            .field("redirect_to", &self.redirect_to)
            .field("remember", &self.remember)
            .finish()
    }
}

#[utoipa::path(
    get,
    path= "/login",
    params(LoginQuery),
    responses (
        (status = 200, description = "Login form", content_type = "text/html", body = String),
        (status = 302, description = "Already signed in, redirect to /"),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn login_page(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
    RawQuery(raw_query): RawQuery,
) -> Response {
    match state.sessions().current_user_id(&headers).await {
        Ok(Some(_)) => return found("/"),
        Ok(None) => {}
        Err(err) => error!("Failed to resolve session: {:#}", err),
    }

    let view = LoginView::new(query.redirect_to.as_deref(), raw_query);
    page(StatusCode::OK, form_page::render(&view))
}

#[utoipa::path(
    post,
    path= "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses (
        (status = 302, description = "Signed in, session cookie set"),
        (status = 400, description = "Rejected submission", body = ErrorsBody),
        (status = 500, description = "User directory or session store failure", body = String),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn login_action(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    RawQuery(raw_query): RawQuery,
    Form(form): Form<LoginForm>,
) -> Response {
    let submission = LoginSubmission::new(
        form.email,
        form.password,
        form.redirect_to.as_deref(),
        form.remember.as_deref(),
    );

    match login(&submission, state.directory(), state.sessions()).await {
        Ok(LoginOutcome::Redirect(redirect)) => redirect.into_response(),
        Ok(LoginOutcome::Invalid(errors)) => rejected(&headers, &submission, raw_query, errors),
        Err(err) => {
            error!("Login failed: {:#}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
                .into_response()
        }
    }
}

fn rejected(
    headers: &HeaderMap,
    submission: &LoginSubmission,
    raw_query: Option<String>,
    errors: ValidationErrors,
) -> Response {
    if wants_html(headers) {
        let view = LoginView::new(Some(&submission.redirect_to), raw_query)
            .with_errors(&submission.email, errors);
        page(StatusCode::BAD_REQUEST, form_page::render(&view))
    } else {
        (StatusCode::BAD_REQUEST, Json(ErrorsBody { errors })).into_response()
    }
}
