//! Authentication route handlers.
//!
//! Login, buyer registration, provider (farm) registration with approval
//! polling, logout, and password reset. Login is also the moment the guest
//! cart is reconciled into the server cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::{Expiry, Session, cookie::time::Duration};
use tracing::instrument;

use greengate_core::{Email, RegistrationId, RegistrationStatus};

use crate::api::types::{RegisterProviderRequest, RegisterRequest};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_auth_session, set_auth_session};
use crate::middleware::session::SESSION_EXPIRY_DAYS;
use crate::models::session::{AuthSession, keys, load, store};
use crate::models::CurrentUser;
use crate::routes::cart::{load_guest_cart, save_guest_cart};
use crate::services::reconcile_after_login;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Checkbox; present means "keep me logged in on this device".
    pub remember: Option<String>,
}

/// Buyer registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub name: Option<String>,
}

/// Provider registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterFarmForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub farm_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Buyer registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
}

/// Provider registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register_farm.html")]
pub struct RegisterFarmTemplate {
    pub error: Option<String>,
}

/// Provider approval polling page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/registration_status.html")]
pub struct RegistrationStatusTemplate {
    pub status_label: &'static str,
    pub approved: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub error: Option<String>,
    pub uid: String,
    pub token: String,
}

// =============================================================================
// Login
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        error: query.error,
        success: query.success,
    }
}

/// Handle login form submission.
///
/// On success the session expiry is pinned to the remember-me choice, the
/// guest cart is reconciled into the server cart, and the visitor lands on
/// the page they originally asked for.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let login = match state.api().login(&form.email, &form.password).await {
        Ok(login) => login,
        Err(e) => {
            tracing::warn!(error = %e, "login failed");
            let message = urlencoding::encode(&e.user_message()).into_owned();
            return Redirect::to(&format!("/auth/login?error={message}")).into_response();
        }
    };

    let user: Option<CurrentUser> = login.user.map(Into::into);
    if let Some(user) = &user {
        set_sentry_user(&user.id, Some(&user.email));
    }
    let auth = AuthSession::new(login.access_token, login.refresh_token, user);

    // Remember-me keeps the session across browser restarts; otherwise it
    // ends with the browser session.
    if form.remember.is_some() {
        session.set_expiry(Some(Expiry::OnInactivity(Duration::days(
            SESSION_EXPIRY_DAYS,
        ))));
    } else {
        session.set_expiry(Some(Expiry::OnSessionEnd));
    }

    if let Err(e) = set_auth_session(&session, &auth).await {
        tracing::error!(error = %e, "failed to store auth session");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    // Push the guest cart into the server cart. Kept when the fresh token
    // is somehow already rejected, dropped otherwise.
    let mut cart = load_guest_cart(&session).await;
    if !cart.is_empty() {
        let report = reconcile_after_login(state.api(), &auth.access_token, &mut cart).await;
        tracing::info!(
            synced = report.synced,
            attempted = report.attempted,
            unauthorized = report.unauthorized,
            "guest cart reconciliation after login"
        );
        save_guest_cart(&session, &cart).await;
    }

    let destination: Option<String> = load(&session, keys::RETURN_TO).await;
    if destination.is_some() {
        crate::models::session::clear(&session, keys::RETURN_TO).await;
    }
    Redirect::to(destination.as_deref().unwrap_or("/")).into_response()
}

// =============================================================================
// Registration
// =============================================================================

/// Display the buyer registration page.
pub async fn register_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterTemplate { error: query.error }
}

/// Handle buyer registration form submission.
///
/// Registration does not log the visitor in; they land on the login page
/// with a success note.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            let message = urlencoding::encode(&e.to_string()).into_owned();
            return Redirect::to(&format!("/auth/register?error={message}")).into_response();
        }
    };
    if form.password != form.password_confirm {
        return Redirect::to("/auth/register?error=Passwords%20do%20not%20match.")
            .into_response();
    }
    if form.password.len() < 8 {
        return Redirect::to(
            "/auth/register?error=Password%20must%20be%20at%20least%208%20characters.",
        )
        .into_response();
    }

    let request = RegisterRequest {
        email: email.into_inner(),
        password: form.password,
        name: form.name.filter(|n| !n.trim().is_empty()),
    };

    match state.api().register(&request).await {
        Ok(()) => Redirect::to("/auth/login?success=registered").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "registration failed");
            let message = urlencoding::encode(&e.user_message()).into_owned();
            Redirect::to(&format!("/auth/register?error={message}")).into_response()
        }
    }
}

/// Display the provider registration page.
pub async fn register_farm_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterFarmTemplate { error: query.error }
}

/// Handle provider registration form submission.
///
/// Provider accounts need manual approval; the registration ID is kept in
/// the session so the status page can poll it.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn register_farm(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterFarmForm>,
) -> Response {
    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(e) => {
            let message = urlencoding::encode(&e.to_string()).into_owned();
            return Redirect::to(&format!("/auth/register-farm?error={message}")).into_response();
        }
    };
    if form.password != form.password_confirm {
        return Redirect::to("/auth/register-farm?error=Passwords%20do%20not%20match.")
            .into_response();
    }
    if form.password.len() < 8 {
        return Redirect::to(
            "/auth/register-farm?error=Password%20must%20be%20at%20least%208%20characters.",
        )
        .into_response();
    }
    if form.farm_name.trim().is_empty() {
        return Redirect::to("/auth/register-farm?error=Farm%20name%20is%20required.")
            .into_response();
    }

    let request = RegisterProviderRequest {
        email: email.into_inner(),
        password: form.password,
        farm_name: form.farm_name,
        location: form.location.filter(|v| !v.trim().is_empty()),
        description: form.description.filter(|v| !v.trim().is_empty()),
    };

    match state.api().register_provider(&request).await {
        Ok(registration_id) => {
            store(&session, keys::PROVIDER_REGISTRATION, &registration_id).await;
            Redirect::to("/auth/register-farm/status").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "provider registration failed");
            let message = urlencoding::encode(&e.user_message()).into_owned();
            Redirect::to(&format!("/auth/register-farm?error={message}")).into_response()
        }
    }
}

/// Display the provider approval polling page.
///
/// Reads the registration ID stored at submission time; without one there is
/// nothing to poll and the visitor is sent to the registration form.
#[instrument(skip_all)]
pub async fn registration_status_page(
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let Some(registration_id): Option<RegistrationId> =
        load(&session, keys::PROVIDER_REGISTRATION).await
    else {
        return Redirect::to("/auth/register-farm").into_response();
    };

    match state.api().registration_status(registration_id).await {
        Ok(response) => RegistrationStatusTemplate {
            status_label: response.status.label(),
            approved: response.status == RegistrationStatus::Approved,
            message: response.message,
            error: None,
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, %registration_id, "registration status poll failed");
            RegistrationStatusTemplate {
                status_label: RegistrationStatus::Pending.label(),
                approved: false,
                message: None,
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    ForgotPasswordTemplate {
        error: query.error,
        success: query.success,
    }
}

/// Handle forgot password form submission.
///
/// Always reports success so the form cannot be used for email enumeration.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    if let Err(e) = state.api().request_password_reset(&form.email).await {
        tracing::warn!(error = %e, "password reset request failed");
    }
    Redirect::to("/auth/forgot-password?success=email_sent").into_response()
}

/// Display the reset password page reached from the emailed link.
pub async fn reset_password_page(
    Path((uid, token)): Path<(String, String)>,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    ResetPasswordTemplate {
        error: query.error,
        uid,
        token,
    }
}

/// Handle reset password form submission.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path((uid, token)): Path<(String, String)>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    if form.password != form.password_confirm {
        return Redirect::to(&format!(
            "/auth/reset/{uid}/{token}?error=Passwords%20do%20not%20match."
        ))
        .into_response();
    }

    match state
        .api()
        .confirm_password_reset(&uid, &token, &form.password)
        .await
    {
        Ok(()) => Redirect::to("/auth/login?success=password_reset").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "password reset confirm failed");
            let message = urlencoding::encode(&e.user_message()).into_owned();
            Redirect::to(&format!("/auth/reset/{uid}/{token}?error={message}")).into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout: clear the auth session and destroy the whole session,
/// guest cart included.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Response {
    clear_sentry_user();

    if let Err(e) = clear_auth_session(&session).await {
        tracing::error!(error = %e, "failed to clear auth session");
    }
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "failed to flush session");
    }

    Redirect::to("/").into_response()
}
