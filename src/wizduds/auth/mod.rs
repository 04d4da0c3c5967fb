//! Login flow and the collaborators it relies on.
//!
//! - `flow`: validation pipeline turning a submission into a redirect or field errors.
//! - `directory`: credential checks and account lookups.
//! - `sessions`: session creation, resolution and logout on top of a `storage` backend.

pub mod directory;
pub mod flow;
pub mod sessions;
pub mod storage;
mod utils;
pub mod validation;

use std::{future::Future, pin::Pin};

pub use directory::{AuthenticatedUser, MemoryUserDirectory, PgUserDirectory, UserDirectory};
pub use flow::{login, LoginOutcome, LoginSubmission, ValidationErrors};
pub use sessions::{
    spawn_session_sweeper, SessionConfig, SessionRedirect, Sessions, SESSION_COOKIE_NAME,
};
pub use storage::{MemorySessionStore, PgSessionStore, SessionRecord, SessionStore};

/// Boxed future returned by collaborator traits so they stay object safe.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;
