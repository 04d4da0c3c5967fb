use crate::wizduds::auth::AuthenticatedUser;
use anyhow::Result;
use minijinja::context;

pub const TITLE: &str = "Wizduds custom apparel - customized cloths that are as unique as you";

/// Entry points shown to anonymous visitors: (target, image, alt text).
const PROMO_LINKS: [(&str, &str, &str); 3] = [
    (
        "/join",
        "/_static/signup.png",
        "Sign up to create your customized fantasy shirt with many editable designs to choose from",
    ),
    (
        "/login",
        "/_static/loginbutton.png",
        "Login to wizduds to view your past creations and buy more unique t shirts and apparel",
    ),
    (
        "/gallery",
        "/_static/gallery-link-large.png",
        "Check out our fantastic gallery of customizable character art to create your t-shirt",
    ),
];

/// Render the landing page.
///
/// A signed-in visitor gets one link to their notes; everyone else gets the
/// sign-up, login and gallery entry points.
///
/// # Errors
/// Returns an error if the template fails to render.
pub fn render(user: Option<&AuthenticatedUser>) -> Result<String> {
    super::render(
        "landing.html",
        context! {
            title => TITLE,
            user => user,
            promo_links => PROMO_LINKS,
        },
    )
}
