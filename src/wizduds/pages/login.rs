use crate::wizduds::auth::ValidationErrors;
use anyhow::Result;
use minijinja::context;

pub const TITLE: &str = "Login";

/// Where the form sends visitors when the page was opened without `redirectTo`.
pub const DEFAULT_LOGIN_REDIRECT: &str = "/notes";

/// Everything the login form needs to render.
#[derive(Clone, Debug, Default)]
pub struct LoginView {
    /// Value of the hidden `redirectTo` field.
    pub redirect_to: String,
    /// Raw query string of the page, carried over to the sign-up link.
    pub query: Option<String>,
    /// Email to prefill after a failed submission.
    pub email: String,
    pub errors: ValidationErrors,
}

impl LoginView {
    /// View for a fresh page load.
    #[must_use]
    pub fn new(redirect_to: Option<&str>, query: Option<String>) -> Self {
        let redirect_to = redirect_to
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_LOGIN_REDIRECT);
        Self {
            redirect_to: redirect_to.to_string(),
            query,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_errors(mut self, email: &str, errors: ValidationErrors) -> Self {
        self.email = email.to_string();
        self.errors = errors;
        self
    }
}

/// Render the login form.
///
/// # Errors
/// Returns an error if the template fails to render.
pub fn render(view: &LoginView) -> Result<String> {
    // focus the first field with feedback
    let password_focus = view.errors.email.is_none() && view.errors.password.is_some();

    super::render(
        "login.html",
        context! {
            title => TITLE,
            email => view.email,
            errors => view.errors,
            password_focus => password_focus,
            redirect_to => view.redirect_to,
            query => view.query.as_deref().filter(|query| !query.is_empty()),
        },
    )
}
