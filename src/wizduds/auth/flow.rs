//! Login validation pipeline.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. email format
//! 2. password present
//! 3. password length
//! 4. credentials known to the user directory
//!
//! Only when all pass is a session opened. Failures are returned as
//! [`LoginOutcome::Invalid`]; collaborator outages surface as `Err`.

use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::{
    directory::UserDirectory,
    sessions::{SessionRedirect, Sessions},
    validation::{
        password_long_enough, safe_redirect, valid_email, DEFAULT_REDIRECT, EMAIL_INVALID,
        INVALID_CREDENTIALS, PASSWORD_REQUIRED, PASSWORD_TOO_SHORT,
    },
};

/// One login attempt, already normalized from the raw form.
#[derive(Debug)]
pub struct LoginSubmission {
    pub email: String,
    pub password: SecretString,
    /// Vetted same-origin path.
    pub redirect_to: String,
    pub remember: bool,
}

impl LoginSubmission {
    /// Build a submission from raw form values.
    ///
    /// Missing email or password become empty strings, an unsafe or missing
    /// `redirect_to` becomes `/`, and `remember` is set only for `"on"`.
    #[must_use]
    pub fn new(
        email: Option<String>,
        password: Option<String>,
        redirect_to: Option<&str>,
        remember: Option<&str>,
    ) -> Self {
        Self {
            email: email.unwrap_or_default(),
            password: SecretString::from(password.unwrap_or_default()),
            redirect_to: safe_redirect(redirect_to, DEFAULT_REDIRECT),
            remember: remember == Some("on"),
        }
    }
}

/// Field feedback for the login form. At most one field is set.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl ValidationErrors {
    #[must_use]
    pub fn email(message: &str) -> Self {
        Self {
            email: Some(message.to_string()),
            password: None,
        }
    }

    #[must_use]
    pub fn password(message: &str) -> Self {
        Self {
            email: None,
            password: Some(message.to_string()),
        }
    }
}

/// JSON body returned with a `400` for failed submissions.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorsBody {
    pub errors: ValidationErrors,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Redirect(SessionRedirect),
    Invalid(ValidationErrors),
}

/// Checks that need no collaborator: email format, then password presence
/// and length.
#[must_use]
pub fn check_fields(submission: &LoginSubmission) -> Option<ValidationErrors> {
    if !valid_email(&submission.email) {
        return Some(ValidationErrors::email(EMAIL_INVALID));
    }

    let password = submission.password.expose_secret();
    if password.is_empty() {
        return Some(ValidationErrors::password(PASSWORD_REQUIRED));
    }

    if !password_long_enough(password) {
        return Some(ValidationErrors::password(PASSWORD_TOO_SHORT));
    }

    None
}

/// Run the full pipeline for one submission.
///
/// # Errors
/// Returns an error only when the user directory or session store fails.
#[instrument(skip_all, fields(remember = submission.remember))]
pub async fn login(
    submission: &LoginSubmission,
    directory: &dyn UserDirectory,
    sessions: &Sessions,
) -> Result<LoginOutcome> {
    if let Some(errors) = check_fields(submission) {
        debug!("Login rejected before credential check");
        return Ok(LoginOutcome::Invalid(errors));
    }

    let Some(user) = directory
        .verify_credentials(&submission.email, &submission.password)
        .await?
    else {
        debug!("Login rejected: invalid credentials");
        return Ok(LoginOutcome::Invalid(ValidationErrors::email(
            INVALID_CREDENTIALS,
        )));
    };

    let redirect = sessions
        .create_session(user.id, submission.remember, &submission.redirect_to)
        .await?;

    Ok(LoginOutcome::Redirect(redirect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizduds::auth::{
        directory::{AuthenticatedUser, MemoryUserDirectory},
        sessions::SessionConfig,
        storage::{MemorySessionStore, SessionRecord, SessionStore},
        StoreFuture,
    };
    use anyhow::anyhow;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use uuid::Uuid;

    /// Session store that counts writes.
    #[derive(Default)]
    struct CountingStore {
        inner: MemorySessionStore,
        inserts: AtomicUsize,
    }

    impl SessionStore for CountingStore {
        fn insert<'a>(
            &'a self,
            token_hash: &'a [u8],
            record: &'a SessionRecord,
        ) -> StoreFuture<'a, ()> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.inner.insert(token_hash, record)
        }

        fn lookup<'a>(&'a self, token_hash: &'a [u8]) -> StoreFuture<'a, Option<SessionRecord>> {
            self.inner.lookup(token_hash)
        }

        fn delete<'a>(&'a self, token_hash: &'a [u8]) -> StoreFuture<'a, ()> {
            self.inner.delete(token_hash)
        }

        fn purge_expired(&self) -> StoreFuture<'_, u64> {
            self.inner.purge_expired()
        }
    }

    struct UnreachableDirectory;

    impl UserDirectory for UnreachableDirectory {
        fn verify_credentials<'a>(
            &'a self,
            _email: &'a str,
            _password: &'a SecretString,
        ) -> StoreFuture<'a, Option<AuthenticatedUser>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }

        fn user_by_id(&self, _id: Uuid) -> StoreFuture<'_, Option<AuthenticatedUser>> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }

        fn ping(&self) -> StoreFuture<'_, ()> {
            Box::pin(async { Err(anyhow!("connection refused")) })
        }
    }

    fn submission(email: &str, password: &str) -> LoginSubmission {
        LoginSubmission::new(
            Some(email.to_string()),
            Some(password.to_string()),
            Some("/notes"),
            None,
        )
    }

    fn fixture() -> Result<(MemoryUserDirectory, Arc<CountingStore>, Sessions)> {
        let directory = MemoryUserDirectory::new().with_user("a@b.co", "longenough1")?;
        let store = Arc::new(CountingStore::default());
        let sessions = Sessions::new(store.clone(), SessionConfig::new());
        Ok((directory, store, sessions))
    }

    fn expect_invalid(outcome: LoginOutcome) -> Result<ValidationErrors> {
        match outcome {
            LoginOutcome::Invalid(errors) => Ok(errors),
            LoginOutcome::Redirect(_) => Err(anyhow!("expected validation errors")),
        }
    }

    fn expect_redirect(outcome: LoginOutcome) -> Result<SessionRedirect> {
        match outcome {
            LoginOutcome::Redirect(redirect) => Ok(redirect),
            LoginOutcome::Invalid(errors) => Err(anyhow!("unexpected errors: {errors:?}")),
        }
    }

    #[test]
    fn submission_normalizes_raw_values() {
        let raw = LoginSubmission::new(None, None, None, Some("yes"));
        assert_eq!(raw.email, "");
        assert_eq!(raw.password.expose_secret(), "");
        assert_eq!(raw.redirect_to, "/");
        assert!(!raw.remember);

        let raw = LoginSubmission::new(None, None, Some("//evil.example"), Some("on"));
        assert_eq!(raw.redirect_to, "/");
        assert!(raw.remember);
    }

    #[test]
    fn check_fields_order() {
        // email is checked before the password
        assert_eq!(
            check_fields(&submission("not-an-email", "")),
            Some(ValidationErrors::email(EMAIL_INVALID))
        );
        assert_eq!(
            check_fields(&submission("a@b.co", "")),
            Some(ValidationErrors::password(PASSWORD_REQUIRED))
        );
        assert_eq!(
            check_fields(&submission("a@b.co", "short1")),
            Some(ValidationErrors::password(PASSWORD_TOO_SHORT))
        );
        assert_eq!(check_fields(&submission("a@b.co", "longenough1")), None);
    }

    #[tokio::test]
    async fn login_unknown_email_and_wrong_password_look_the_same() -> Result<()> {
        let (directory, store, sessions) = fixture()?;

        let unknown = expect_invalid(
            login(&submission("nobody@b.co", "longenough1"), &directory, &sessions).await?,
        )?;
        let wrong = expect_invalid(
            login(&submission("a@b.co", "longenough2"), &directory, &sessions).await?,
        )?;

        assert_eq!(unknown, ValidationErrors::email(INVALID_CREDENTIALS));
        assert_eq!(unknown, wrong);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn login_success_creates_exactly_one_session() -> Result<()> {
        let (directory, store, sessions) = fixture()?;

        let redirect = expect_redirect(
            login(&submission("a@b.co", "longenough1"), &directory, &sessions).await?,
        )?;

        assert_eq!(redirect.location(), "/notes");
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn login_remember_marks_session_persistent() -> Result<()> {
        let (directory, store, sessions) = fixture()?;

        let remembered = LoginSubmission::new(
            Some("a@b.co".to_string()),
            Some("longenough1".to_string()),
            None,
            Some("on"),
        );
        let redirect = expect_redirect(login(&remembered, &directory, &sessions).await?)?;
        assert_eq!(redirect.location(), "/");

        let records = store.inner.records().await;
        assert_eq!(records.len(), 1);
        assert!(records.iter().all(|record| record.persistent));
        Ok(())
    }

    #[tokio::test]
    async fn login_validation_failure_skips_directory() -> Result<()> {
        let store = Arc::new(CountingStore::default());
        let sessions = Sessions::new(store.clone(), SessionConfig::new());

        let errors = expect_invalid(
            login(&submission("a@b.co", "short1"), &UnreachableDirectory, &sessions).await?,
        )?;
        assert_eq!(errors, ValidationErrors::password(PASSWORD_TOO_SHORT));
        Ok(())
    }

    #[tokio::test]
    async fn login_directory_failure_is_an_error() -> Result<()> {
        let store = Arc::new(CountingStore::default());
        let sessions = Sessions::new(store.clone(), SessionConfig::new());

        let result = login(
            &submission("a@b.co", "longenough1"),
            &UnreachableDirectory,
            &sessions,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn errors_body_serializes_nulls() -> Result<()> {
        let body = ErrorsBody {
            errors: ValidationErrors::email(EMAIL_INVALID),
        };
        assert_eq!(
            serde_json::to_value(&body)?,
            serde_json::json!({"errors": {"email": "Email is invalid", "password": null}})
        );
        Ok(())
    }
}
