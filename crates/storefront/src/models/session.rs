//! Session-related types.
//!
//! Types stored in the session for authentication state, the guest cart,
//! and small bits of cross-request UI state (pending order, starred orders).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use greengate_core::{OrderId, UserId, UserRole};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's ID on the marketplace API.
    pub id: UserId,
    /// User's email address.
    pub email: String,
    /// Display name, when the API provided one.
    pub name: Option<String>,
    /// Account role as reported by the API.
    #[serde(default)]
    pub role: UserRole,
}

impl CurrentUser {
    /// Whether this user may access the farmer portal.
    #[must_use]
    pub const fn is_farmer(&self) -> bool {
        self.role.is_farmer()
    }
}

impl From<crate::api::types::UserProfile> for CurrentUser {
    fn from(profile: crate::api::types::UserProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            name: profile.name,
            role: profile.role,
        }
    }
}

/// Authenticated API session stored in the cookie session.
///
/// Holds the bearer token for the marketplace API plus the identity we
/// learned at login time. The refresh token is kept opportunistically; the
/// API may or may not issue one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for marketplace API requests.
    pub access_token: String,
    /// Refresh token, when the API issued one.
    pub refresh_token: Option<String>,
    /// Identity captured at login.
    pub user: Option<CurrentUser>,
    /// When this session was stored.
    pub saved_at: DateTime<Utc>,
}

impl AuthSession {
    /// Build a fresh session from a login response.
    #[must_use]
    pub fn new(access_token: String, refresh_token: Option<String>, user: Option<CurrentUser>) -> Self {
        Self {
            access_token,
            refresh_token,
            user,
            saved_at: Utc::now(),
        }
    }
}

/// Marker for an order that was placed but whose payment has not been
/// confirmed yet. Survives the redirect to the payment page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    /// Order created by checkout.
    pub order_id: OrderId,
    /// Payment intent to confirm, when the API issued one.
    pub payment_intent_id: Option<String>,
}

/// Session keys.
pub mod keys {
    /// Key for the authenticated API session.
    pub const AUTH_SESSION: &str = "auth_session";

    /// Key for the guest cart (logged-out shopping).
    pub const GUEST_CART: &str = "guest_cart";

    /// Key for the path to return to after a forced login.
    pub const RETURN_TO: &str = "return_to";

    /// Key for the order awaiting payment confirmation.
    pub const PENDING_ORDER: &str = "pending_order";

    /// Key for the last delivery address, used to prefill checkout.
    pub const DELIVERY_ADDRESS: &str = "delivery_address";

    /// Key for the set of starred order IDs.
    pub const STARRED_ORDERS: &str = "starred_orders";

    /// Key for an in-flight provider registration awaiting review.
    pub const PROVIDER_REGISTRATION: &str = "provider_registration";
}

/// Load a value from the session, treating storage failures as absence.
///
/// Session reads can fail if the store is unavailable or a stored value no
/// longer deserializes (e.g. after a schema change). Neither should take a
/// page down, but both are worth a log line.
pub async fn load<T: DeserializeOwned>(session: &Session, key: &str) -> Option<T> {
    match session.get::<T>(key).await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read session value");
            None
        }
    }
}

/// Store a value in the session, logging (not propagating) failures.
pub async fn store<T: Serialize + Send + Sync>(session: &Session, key: &str, value: &T) {
    if let Err(e) = session.insert(key, value).await {
        tracing::warn!(key, error = %e, "failed to write session value");
    }
}

/// Remove a value from the session, logging (not propagating) failures.
pub async fn clear(session: &Session, key: &str) {
    if let Err(e) = session.remove::<serde_json::Value>(key).await {
        tracing::warn!(key, error = %e, "failed to remove session value");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_farmer() {
        let mut user = CurrentUser {
            id: UserId::new(1),
            email: "farmer@example.com".to_string(),
            name: None,
            role: UserRole::Farmer,
        };
        assert!(user.is_farmer());

        user.role = UserRole::Buyer;
        assert!(!user.is_farmer());
    }

    #[test]
    fn test_auth_session_round_trip() {
        let auth = AuthSession::new(
            "tok-123".to_string(),
            Some("refresh-456".to_string()),
            Some(CurrentUser {
                id: UserId::new(7),
                email: "user@example.com".to_string(),
                name: Some("Jo".to_string()),
                role: UserRole::Buyer,
            }),
        );
        let json = serde_json::to_string(&auth).unwrap();
        let back: AuthSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.access_token, "tok-123");
        assert_eq!(back.refresh_token.as_deref(), Some("refresh-456"));
        assert_eq!(back.user.unwrap().id, UserId::new(7));
    }
}
