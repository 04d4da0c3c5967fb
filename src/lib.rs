//! # Wizduds (storefront front door)
//!
//! `wizduds` serves the public entry points of the Wizduds customized apparel
//! shop: the promotional landing page and the login page with its action.
//!
//! ## Login
//!
//! A login submission goes through a short-circuiting pipeline: email format,
//! password presence, password length, credential check against the user
//! directory, and finally session creation. The first failing check is
//! returned to the visitor as form feedback (`400`), never as a server error.
//! Unknown accounts and wrong passwords share one generic message so the form
//! does not reveal which emails are registered.
//!
//! ## Sessions
//!
//! Sessions are server-side records keyed by the SHA-256 hash of a random
//! cookie token. "Remember me" turns the cookie into a persistent one with a
//! `Max-Age`; otherwise the browser drops it when it closes.

pub mod cli;
pub mod wizduds;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
