//! Transient notifications delivered through HTMX response headers.
//!
//! A handler attaches an `HX-Trigger` header whose JSON names one or more
//! client events. The `notify` event carries a [`Notification`]; the script
//! in `static/js/notify.js` shows it for [`VISIBLE_MS`], fades it out over
//! [`FADE_MS`] and then removes it.

use std::fmt::Write as _;

use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, IntoResponseParts, Response, ResponseParts};
use serde::Serialize;
use serde_json::{Map, Value};

/// How long a notification stays fully visible, in milliseconds.
pub const VISIBLE_MS: u32 = 3000;
/// Length of the fade-out, in milliseconds.
pub const FADE_MS: u32 = 300;

/// Client event carrying a notification.
pub const NOTIFY_EVENT: &str = "notify";
/// Client event that makes cart views reload.
pub const CART_UPDATED_EVENT: &str = "cart-updated";
/// Client event that refreshes only the cart badge.
pub const CART_COUNT_EVENT: &str = "cart-count";

const HX_TRIGGER: &str = "hx-trigger";
const HX_RESWAP: &str = "hx-reswap";

/// Severity of a notification, also its CSS modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A message shown briefly to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Info,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Error,
        }
    }

    /// An error notification from a domain error, first letter capitalized.
    pub fn from_error(error: &impl std::error::Error) -> Self {
        let text = error.to_string();
        let mut chars = text.chars();
        let message = chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        });
        Self::error(message)
    }

    /// The notice shown when a signed-out user tries something that needs
    /// an account.
    #[must_use]
    pub fn login_required() -> Self {
        Self::info("Please log in first")
    }
}

/// A notification on its own: status 200, no swap.
impl IntoResponse for Notification {
    fn into_response(self) -> Response {
        Triggers::new().notify(self).without_swap()
    }
}

/// Builder for the `HX-Trigger` header.
///
/// ```rust,ignore
/// let triggers = Triggers::new()
///     .event(CART_UPDATED_EVENT)
///     .notify(Notification::success("Added to cart"));
/// (triggers, fragment).into_response()
/// ```
#[derive(Debug, Clone, Default)]
pub struct Triggers {
    events: Map<String, Value>,
}

impl Triggers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire a client event with no detail.
    #[must_use]
    pub fn event(mut self, name: &str) -> Self {
        self.events.insert(name.to_string(), Value::Null);
        self
    }

    /// Show a notification. A later call replaces an earlier one.
    #[must_use]
    pub fn notify(mut self, notification: Notification) -> Self {
        let detail = serde_json::to_value(notification).unwrap_or(Value::Null);
        self.events.insert(NOTIFY_EVENT.to_string(), detail);
        self
    }

    /// Respond with just these events, leaving the target untouched.
    #[must_use]
    pub fn without_swap(self) -> Response {
        (self, [(HX_RESWAP, "none")]).into_response()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The header value, or `None` when no events were added.
    #[must_use]
    pub fn header_value(&self) -> Option<HeaderValue> {
        if self.events.is_empty() {
            return None;
        }
        let json = Value::Object(self.events.clone()).to_string();
        HeaderValue::from_str(&ascii_json(&json)).ok()
    }
}

impl IntoResponseParts for Triggers {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Some(value) = self.header_value() {
            res.headers_mut()
                .insert(HeaderName::from_static(HX_TRIGGER), value);
        }
        Ok(res)
    }
}

/// Escape every non-ASCII character of serialized JSON as `\uXXXX`.
///
/// Header values must be ASCII and browsers decode them as Latin-1, so a
/// message in Chinese only survives the trip escaped. Non-ASCII only ever
/// appears inside JSON strings, where the escape is valid.
fn ascii_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0_u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn header_json(triggers: &Triggers) -> Value {
        let value = triggers.header_value().unwrap();
        serde_json::from_str(value.to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_single_notification() {
        let triggers = Triggers::new().notify(Notification::error("Could not add"));
        assert_eq!(
            header_json(&triggers),
            serde_json::json!({"notify": {"message": "Could not add", "level": "error"}})
        );
    }

    #[test]
    fn test_multiple_events_in_one_header() {
        let triggers = Triggers::new()
            .event(CART_UPDATED_EVENT)
            .notify(Notification::success("Added"));
        let json = header_json(&triggers);
        assert!(json.get("cart-updated").is_some());
        assert_eq!(json["notify"]["level"], "success");
    }

    #[test]
    fn test_empty_builder_has_no_header() {
        assert!(Triggers::new().header_value().is_none());
        assert!(Triggers::new().is_empty());
    }

    #[test]
    fn test_non_ascii_survives_escaped() {
        let triggers = Triggers::new().notify(Notification::info("注册成功 🍵"));
        let raw = triggers.header_value().unwrap();
        assert!(raw.to_str().unwrap().is_ascii());
        assert_eq!(header_json(&triggers)["notify"]["message"], "注册成功 🍵");
    }

    #[test]
    fn test_notification_response_does_not_swap() {
        let response = Notification::login_required().into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(response.headers().get("hx-reswap").unwrap(), "none");
        assert!(response.headers().get("hx-trigger").is_some());
    }

    #[test]
    fn test_from_error_capitalizes() {
        let error = std::io::Error::other("street address must be 5-60 characters");
        let notification = Notification::from_error(&error);
        assert_eq!(notification.message, "Street address must be 5-60 characters");
        assert_eq!(notification.level, NotificationLevel::Error);
    }

    #[test]
    fn test_events_without_swap() {
        let response = Triggers::new()
            .event(CART_UPDATED_EVENT)
            .notify(Notification::success("Paid"))
            .without_swap();
        assert_eq!(response.headers().get("hx-reswap").unwrap(), "none");
        let raw = response.headers().get("hx-trigger").unwrap().to_str().unwrap();
        assert!(raw.contains("cart-updated"));
    }
}
