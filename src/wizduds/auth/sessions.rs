//! Session service: opens sessions after a successful login, resolves the
//! current visitor from the cookie, and closes sessions on logout.

use anyhow::{Context, Result};
use axum::{
    http::{
        header::{InvalidHeaderValue, COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::interval};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use super::{
    storage::{SessionRecord, SessionStore},
    utils::{generate_session_token, hash_session_token, now_unix_seconds},
};

pub const SESSION_COOKIE_NAME: &str = "wizduds_session";

const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Debug)]
pub struct SessionConfig {
    ttl_seconds: i64,
    cookie_secure: bool,
    sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Seven day sessions, cookies not marked `Secure`, expired records
    /// purged every five minutes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_secure: false,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_sweep_interval_seconds(mut self, seconds: u64) -> Self {
        self.sweep_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    /// Zero disables the background sweep.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}

/// Redirect instruction produced when a session is opened: a `302` to the
/// target carrying the new session cookie.
#[derive(Clone, Debug)]
pub struct SessionRedirect {
    location: HeaderValue,
    set_cookie: HeaderValue,
}

impl SessionRedirect {
    #[must_use]
    pub fn location(&self) -> &str {
        self.location.to_str().unwrap_or_default()
    }

    #[must_use]
    pub fn set_cookie(&self) -> &HeaderValue {
        &self.set_cookie
    }
}

impl IntoResponse for SessionRedirect {
    fn into_response(self) -> Response {
        (
            StatusCode::FOUND,
            [(LOCATION, self.location), (SET_COOKIE, self.set_cookie)],
        )
            .into_response()
    }
}

#[derive(Clone)]
pub struct Sessions {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl std::fmt::Debug for Sessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sessions")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Sessions {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open a session for `user_id` and build the redirect to `redirect_to`.
    ///
    /// `redirect_to` must already be a vetted same-origin path.
    ///
    /// # Errors
    /// Returns an error if the token cannot be generated or stored.
    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        user_id: Uuid,
        remember: bool,
        redirect_to: &str,
    ) -> Result<SessionRedirect> {
        let location =
            HeaderValue::from_str(redirect_to).context("redirect target is not a valid header")?;

        let token = generate_session_token()?;
        let record = SessionRecord {
            user_id,
            persistent: remember,
            expires_at_unix: now_unix_seconds().saturating_add(self.config.ttl_seconds),
        };
        self.store
            .insert(&hash_session_token(&token), &record)
            .await?;

        let set_cookie = session_cookie(&self.config, &token, remember)
            .context("failed to build session cookie")?;

        debug!("Session created");

        Ok(SessionRedirect {
            location,
            set_cookie,
        })
    }

    /// Resolve the session cookie into a user id.
    ///
    /// Returns `Ok(None)` when the cookie is missing, unknown, or expired.
    ///
    /// # Errors
    /// Returns an error if the session store fails.
    pub async fn current_user_id(&self, headers: &HeaderMap) -> Result<Option<Uuid>> {
        let Some(token) = extract_session_token(headers) else {
            return Ok(None);
        };
        let record = self.store.lookup(&hash_session_token(&token)).await?;
        Ok(record.map(|record| record.user_id))
    }

    /// Drop the session named by the cookie, if any.
    ///
    /// # Errors
    /// Returns an error if the session store fails.
    pub async fn destroy(&self, headers: &HeaderMap) -> Result<()> {
        if let Some(token) = extract_session_token(headers) {
            self.store.delete(&hash_session_token(&token)).await?;
        }
        Ok(())
    }

    /// Delete expired session records; returns how many were removed.
    ///
    /// # Errors
    /// Returns an error if the session store fails.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.store.purge_expired().await
    }

    /// Cookie that removes the session cookie from the browser.
    ///
    /// # Errors
    /// Returns an error if the header value cannot be built.
    pub fn clear_cookie(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        clear_session_cookie(&self.config)
    }
}

/// Purge expired sessions on the configured interval until the runtime shuts down.
pub fn spawn_session_sweeper(sessions: Sessions) -> Option<JoinHandle<()>> {
    let every = sessions.config().sweep_interval();
    if every.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = interval(every);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!("Purged {} expired sessions", purged),
                Err(err) => error!("Failed to purge expired sessions: {:#}", err),
            }
        }
    }))
}

/// Build an `HttpOnly` session cookie. Only remembered sessions get a
/// `Max-Age`; the rest end when the browser closes.
fn session_cookie(
    config: &SessionConfig,
    token: &str,
    persistent: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax");
    if persistent {
        cookie.push_str(&format!("; Max-Age={}", config.ttl_seconds()));
    }
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &SessionConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}
