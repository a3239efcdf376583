//! Browser-scoped preferences.

use axum::{
    Form,
    http::{HeaderMap, header},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::safe_redirect;
use crate::models::{Theme, session_keys};

/// Theme form data.
#[derive(Debug, Deserialize)]
pub struct ThemeForm {
    pub theme: String,
}

/// Store the colour scheme and go back to the page the form was on.
pub async fn set_theme(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<ThemeForm>,
) -> Result<Redirect> {
    let theme = Theme::parse_or_default(&form.theme);
    session.insert(session_keys::THEME, theme).await?;

    let back = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| url::Url::parse(referer).ok())
        .map(|url| url.path().to_owned());
    Ok(Redirect::to(&safe_redirect(back.as_deref(), "/")))
}
