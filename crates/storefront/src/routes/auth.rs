//! Authentication route handlers.
//!
//! Login, registration and logout against the market API. The identity the
//! API returns is kept in the tower session; nothing else is stored.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use terroir_core::{MobilePhone, Role};

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Message the API sends for a completed registration.
const REGISTERED: &str = "注册成功";

/// Minimum password length, in characters.
const MIN_PASSWORD_CHARS: usize = 8;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// `user` or `admin`.
    #[serde(default)]
    pub role: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: String,
    /// Verification code. Checked for presence only.
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl RegisterForm {
    /// First failing local rule, if any.
    fn check(&self) -> Result<(), &'static str> {
        if !MobilePhone::is_eleven_digits(self.phone.trim()) {
            return Err("Enter an 11-digit phone number");
        }
        if self.code.trim().is_empty() {
            return Err("Enter the verification code");
        }
        if self.username.trim().is_empty() {
            return Err("Enter a username");
        }
        if self.password.trim().chars().count() < MIN_PASSWORD_CHARS {
            return Err("Password must be at least 8 characters");
        }
        Ok(())
    }

    fn role(&self) -> Role {
        self.role
            .as_deref()
            .map_or(Role::User, Role::from_form_value)
    }
}

/// Query parameters of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub registered: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub username: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub user: Option<CurrentUser>,
    pub username: String,
    pub phone: String,
    pub error: Option<String>,
}

impl LoginTemplate {
    fn failed(username: &str, error: impl Into<String>) -> Self {
        Self {
            user: None,
            username: username.to_string(),
            error: Some(error.into()),
            success: None,
        }
    }
}

impl RegisterTemplate {
    fn failed(form: &RegisterForm, error: impl Into<String>) -> Self {
        Self {
            user: None,
            username: form.username.clone(),
            phone: form.phone.clone(),
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalUser(user): OptionalUser,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        user,
        username: String::new(),
        error: None,
        success: query
            .registered
            .map(|_| "Registration complete, please log in".to_string()),
    }
}

/// Handle login form submission.
///
/// On success the identity goes into the session and the browser is sent
/// to the role's landing page.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return LoginTemplate::failed(username, "Enter your username and password")
            .into_response();
    }

    let role = Role::from_form_value(&form.role);
    let reply = match state.api().login(username, &form.password, role).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let message = e.user_message("Login failed, please try again later");
            return LoginTemplate::failed(username, message).into_response();
        }
    };

    let user = CurrentUser {
        id: reply.user_id,
        role: reply.role,
        username: username.to_string(),
    };

    if let Err(e) = set_current_user(&session, &user).await {
        tracing::error!(error = %e, "Failed to set session");
        return LoginTemplate::failed(username, "Could not start a session, please try again")
            .into_response();
    }

    set_sentry_user(&user.id, &user.username);
    tracing::info!(user_id = %user.id, role = ?user.role, "User logged in");

    Redirect::to(user.role.home_path()).into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(OptionalUser(user): OptionalUser) -> impl IntoResponse {
    RegisterTemplate {
        user,
        username: String::new(),
        phone: String::new(),
        error: None,
    }
}

/// Handle registration form submission.
///
/// The form is checked locally before the API is called. Only the API's
/// exact success message leads on to the login page; any other message is
/// shown on the form.
#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    if let Err(message) = form.check() {
        return RegisterTemplate::failed(&form, message).into_response();
    }

    let result = state
        .api()
        .register(
            form.username.trim(),
            form.password.trim(),
            form.role(),
            form.phone.trim(),
        )
        .await;

    match result {
        Ok(Some(message)) if message == REGISTERED => {
            tracing::info!("Account registered");
            Redirect::to("/auth/login?registered=1").into_response()
        }
        Ok(message) => RegisterTemplate::failed(
            &form,
            message.unwrap_or_else(|| "Registration failed".to_string()),
        )
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            let message = e.user_message("Registration failed, please try again later");
            RegisterTemplate::failed(&form, message).into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Some(id) = session.id() {
        state.checkouts().forget(id).await;
    }
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(phone: &str, code: &str, username: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            password: password.to_string(),
            phone: phone.to_string(),
            code: code.to_string(),
            role: None,
        }
    }

    #[test]
    fn test_register_accepts_valid_form() {
        assert_eq!(form("13800138000", "1234", "li", "secret123").check(), Ok(()));
    }

    #[test]
    fn test_register_rule_order() {
        assert_eq!(
            form("1380013800", "", "", "").check(),
            Err("Enter an 11-digit phone number")
        );
        assert_eq!(
            form("13800138000", " ", "", "").check(),
            Err("Enter the verification code")
        );
        assert_eq!(
            form("13800138000", "1234", "  ", "").check(),
            Err("Enter a username")
        );
        assert_eq!(
            form("13800138000", "1234", "li", " 1234567 ").check(),
            Err("Password must be at least 8 characters")
        );
    }

    #[test]
    fn test_register_role_defaults_to_user() {
        let mut f = form("13800138000", "1234", "li", "secret123");
        assert_eq!(f.role(), Role::User);
        f.role = Some("admin".to_string());
        assert_eq!(f.role(), Role::Admin);
    }
}
