//! Session middleware configuration.
//!
//! Sessions are held in memory and referenced by a signed cookie. The cookie
//! carries only the session ID; the auth token and guest cart live server-side
//! in the store. By default a session survives 30 days of inactivity so a
//! guest's cart does not evaporate between visits; login shortens this to the
//! browser session unless the visitor asked to be remembered (see
//! [`crate::routes::auth`]).

use secrecy::ExposeSecret;
use tower_sessions::cookie::Key;
use tower_sessions::cookie::time::Duration;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "gg_session";

/// Default session lifetime: 30 days of inactivity.
pub const SESSION_EXPIRY_DAYS: i64 = 30;

/// Create the session layer with an in-memory store and a signed cookie.
///
/// # Panics
///
/// Panics if the session secret is shorter than 64 bytes. Configuration
/// loading rejects such secrets before this is ever called.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore, SignedCookie> {
    let store = MemoryStore::default();
    let key = Key::from(config.session_secret.expose_secret().as_bytes());

    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_signed(key)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_EXPIRY_DAYS)))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
