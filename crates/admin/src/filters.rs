//! Askama filters for the back-office templates.

use std::fmt::Display;

/// Year shown in the sidebar footer.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Discount column text: empty for 0, otherwise "15% off".
///
/// Usage in templates: `{{ p.discount|percent_off }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn percent_off(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(percent_label(&value.to_string()))
}

fn percent_label(raw: &str) -> String {
    match raw.trim() {
        "" | "0" => String::new(),
        percent => format!("{percent}% off"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_label() {
        assert_eq!(percent_label("0"), "");
        assert_eq!(percent_label("15"), "15% off");
    }
}
