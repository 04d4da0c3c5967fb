use anyhow::Result;
use axum::http::HeaderMap;
use std::sync::Arc;

use super::auth::{AuthenticatedUser, Sessions, UserDirectory};

/// Shared handler state: the two collaborators every page needs.
#[derive(Clone)]
pub struct AppState {
    directory: Arc<dyn UserDirectory>,
    sessions: Sessions,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl AppState {
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>, sessions: Sessions) -> Self {
        Self {
            directory,
            sessions,
        }
    }

    #[must_use]
    pub fn directory(&self) -> &dyn UserDirectory {
        self.directory.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &Sessions {
        &self.sessions
    }

    /// Resolve the visitor behind the session cookie.
    ///
    /// A cookie pointing at an unknown session or a removed account yields `None`.
    ///
    /// # Errors
    /// Returns an error if the session store or the user directory fails.
    pub async fn current_user(&self, headers: &HeaderMap) -> Result<Option<AuthenticatedUser>> {
        match self.sessions.current_user_id(headers).await? {
            Some(id) => self.directory.user_by_id(id).await,
            None => Ok(None),
        }
    }
}
