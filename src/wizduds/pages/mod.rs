//! Server-rendered HTML for the landing and login pages.
//!
//! Templates are compiled into the binary. Their `.html` names turn on
//! minijinja's HTML auto-escaping for every interpolated value.

pub mod landing;
pub mod login;

use anyhow::{anyhow, Result};
use minijinja::{Environment, UndefinedBehavior};
use once_cell::sync::OnceCell;
use serde::Serialize;

const TEMPLATES: [(&str, &str); 3] = [
    ("base.html", include_str!("templates/base.html")),
    ("landing.html", include_str!("templates/landing.html")),
    ("login.html", include_str!("templates/login.html")),
];

static ENVIRONMENT: OnceCell<Environment<'static>> = OnceCell::new();

fn environment() -> Result<&'static Environment<'static>> {
    ENVIRONMENT.get_or_try_init(|| {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| anyhow!("failed to load template {name}: {e}"))?;
        }
        Ok(env)
    })
}

/// Render a named template with `ctx`.
///
/// # Errors
/// Returns an error if the template is missing or fails to render.
fn render<S: Serialize>(name: &str, ctx: S) -> Result<String> {
    environment()?
        .get_template(name)
        .and_then(|template| template.render(ctx))
        .map_err(|e| anyhow!("failed to render {name}: {e}"))
}
