//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use crate::notify::{FADE_MS, VISIBLE_MS};

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Returns the content hash for main.css.
///
/// The hash is computed at build time from the CSS file content and used
/// as a `?v=` cache-busting parameter.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

/// Returns the content hash for notify.js.
///
/// Usage in templates: `{{ ""|js_hash }}`
#[askama::filter_fn]
pub fn js_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("JS_HASH"))
}

/// How long a notification stays fully visible, in milliseconds.
///
/// Usage in templates: `{{ ""|notify_visible_ms }}`
#[askama::filter_fn]
pub fn notify_visible_ms(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<u32> {
    Ok(VISIBLE_MS)
}

/// How long a notification takes to fade out, in milliseconds.
///
/// Usage in templates: `{{ ""|notify_fade_ms }}`
#[askama::filter_fn]
pub fn notify_fade_ms(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<u32> {
    Ok(FADE_MS)
}
