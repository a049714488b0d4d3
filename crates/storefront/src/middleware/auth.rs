//! Authentication middleware and extractors.
//!
//! Handlers that need a marketplace API token take [`RequireAuth`]; pages
//! that merely render differently for logged-in visitors take
//! [`OptionalAuth`]. Farmer portal handlers take [`RequireFarmer`].

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::CurrentUser;
use crate::models::session::{AuthSession, keys, store};

/// Extractor that requires a logged-in session.
///
/// If the visitor is not logged in, the requested path is remembered in the
/// session and the response is a redirect to the login page, which sends them
/// back after a successful login.
///
/// # Example
///
/// ```rust,ignore
/// async fn orders_page(RequireAuth(auth): RequireAuth) -> impl IntoResponse {
///     // auth.access_token is a non-empty bearer token
/// }
/// ```
pub struct RequireAuth(pub AuthSession);

/// Extractor that requires a logged-in farmer.
pub struct RequireFarmer(pub AuthSession);

/// Rejection for the auth extractors.
pub enum AuthRejection {
    /// Redirect to the login page (HTML requests).
    RedirectToLogin,
    /// Unauthorized response (fragment/API requests).
    Unauthorized,
    /// Logged in, but the account has no farmer role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

/// Load the auth session, remembering where to return to on failure.
async fn auth_or_redirect(parts: &Parts) -> Result<AuthSession, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;

    let auth: Option<AuthSession> = session.get(keys::AUTH_SESSION).await.ok().flatten();
    if let Some(auth) = auth {
        return Ok(auth);
    }

    // HTMX fragment requests get a bare 401 their scripts can react to;
    // full pages get bounced through login and back.
    if parts.headers.contains_key("hx-request") {
        return Err(AuthRejection::Unauthorized);
    }

    if parts.method == axum::http::Method::GET {
        let return_to = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
        store(session, keys::RETURN_TO, &return_to).await;
    }
    Err(AuthRejection::RedirectToLogin)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        auth_or_redirect(parts).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireFarmer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = auth_or_redirect(parts).await?;
        let is_farmer = auth.user.as_ref().is_some_and(CurrentUser::is_farmer);
        if is_farmer {
            Ok(Self(auth))
        } else {
            Err(AuthRejection::Forbidden)
        }
    }
}

/// Extractor that optionally loads the auth session.
///
/// Unlike `RequireAuth`, this never rejects the request.
pub struct OptionalAuth(pub Option<AuthSession>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<AuthSession>(keys::AUTH_SESSION)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(auth))
    }
}

/// Store the auth session after a successful login.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_auth_session(
    session: &Session,
    auth: &AuthSession,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::AUTH_SESSION, auth).await
}

/// Clear the auth session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_auth_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<AuthSession>(keys::AUTH_SESSION).await?;
    Ok(())
}

/// Drop a stale auth session after the API rejected its token.
///
/// A failed clear just means the dead token lingers until the next 401, so
/// the error is logged rather than propagated.
pub async fn expire_auth(session: &Session) {
    if let Err(e) = clear_auth_session(session).await {
        tracing::warn!(error = %e, "failed to clear expired auth session");
    }
}
