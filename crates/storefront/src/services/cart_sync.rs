//! Guest-cart reconciliation.
//!
//! When a visitor who shopped logged-out signs in, their session cart is
//! pushed into the server cart line by line. The push is best-effort: a line
//! the server rejects (product gone, out of stock) is skipped and the rest
//! continue, because losing one stale line is better than losing the whole
//! cart. The one exception is a 401, which means the just-issued token is
//! already bad; at that point nothing further can succeed, so the push stops
//! and the guest cart is kept for the next login attempt.
//!
//! Lines are pushed sequentially, in cart order. The server accumulates
//! quantities on repeated adds, so ordering is not about correctness; it is
//! about getting a coherent error per line instead of a pile of raced
//! responses.

use tracing::{info, instrument, warn};

use greengate_core::GuestCart;

use crate::api::ApiClient;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Lines the server accepted.
    pub synced: usize,
    /// Lines the pass set out to push (the whole cart).
    pub attempted: usize,
    /// The token was rejected mid-pass; the guest cart must be kept.
    pub unauthorized: bool,
}

impl SyncReport {
    /// A pass over an empty cart (or one that never started).
    const fn empty() -> Self {
        Self {
            synced: 0,
            attempted: 0,
            unauthorized: false,
        }
    }

    /// Whether every line made it to the server.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        !self.unauthorized && self.synced == self.attempted
    }
}

/// Push every guest-cart line into the authenticated server cart.
///
/// Does not mutate the cart; callers decide what to do with it based on the
/// report (see [`reconcile_after_login`]).
#[instrument(skip_all, fields(lines = cart.len()))]
pub async fn sync_guest_cart(api: &ApiClient, token: &str, cart: &GuestCart) -> SyncReport {
    if cart.is_empty() {
        return SyncReport::empty();
    }
    if token.is_empty() {
        // No token means nothing can be pushed; same handling as a 401.
        return SyncReport {
            synced: 0,
            attempted: cart.len(),
            unauthorized: true,
        };
    }

    let attempted = cart.len();
    let mut synced = 0;

    for line in cart.items() {
        match api.add_to_cart(token, line.product_id, line.quantity).await {
            Ok(()) => synced += 1,
            Err(e) if e.is_unauthorized() => {
                warn!(
                    product_id = %line.product_id,
                    synced,
                    "token rejected while syncing guest cart, keeping local copy"
                );
                return SyncReport {
                    synced,
                    attempted,
                    unauthorized: true,
                };
            }
            Err(e) => {
                // Skip the line; the product may be gone or out of stock.
                warn!(
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    error = %e,
                    "skipping guest cart line the server rejected"
                );
            }
        }
    }

    info!(synced, attempted, "guest cart synced");
    SyncReport {
        synced,
        attempted,
        unauthorized: false,
    }
}

/// Reconcile the guest cart into the server cart right after login.
///
/// After any pass that ran to the end, the guest cart is cleared, including
/// when some lines were rejected: those lines are unsellable and keeping
/// them would just replay the same failures forever. Only an unauthorized
/// pass preserves the cart, since none of it had a chance to land.
pub async fn reconcile_after_login(
    api: &ApiClient,
    token: &str,
    cart: &mut GuestCart,
) -> SyncReport {
    let report = sync_guest_cart(api, token, cart).await;
    if !report.unauthorized {
        cart.clear();
    }
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use greengate_core::{ProductId, ProductSnapshot};

    use super::*;
    use crate::config::MarketApiConfig;

    async fn api_for(server: &MockServer) -> ApiClient {
        let base = Url::parse(&format!("{}/api/", server.uri())).unwrap();
        let farmer = Url::parse(&format!("{}/farmer/", server.uri())).unwrap();
        ApiClient::new(&MarketApiConfig {
            base_url: base,
            farmer_base_url: farmer,
            farmer_portal_enabled: true,
        })
    }

    fn snapshot(name: &str) -> ProductSnapshot {
        ProductSnapshot {
            name: name.to_string(),
            price: "2.50".parse().unwrap(),
            unit: Some("lb".to_string()),
            photo_url: None,
            farm_name: None,
        }
    }

    #[tokio::test]
    async fn test_empty_cart_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cart/add/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = api_for(&server).await;
        let report = sync_guest_cart(&api, "tok", &GuestCart::new()).await;

        assert_eq!(report, SyncReport::empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_rejected_line_is_skipped_and_cart_cleared() {
        let server = MockServer::start().await;
        // Product 2 is out of stock; 1 and 3 succeed.
        Mock::given(method("POST"))
            .and(path("/api/cart/add/"))
            .and(body_json(json!({"product_id": 2, "quantity": 1})))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"detail": "Out of stock."})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/cart/add/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 10})))
            .expect(2)
            .mount(&server)
            .await;

        let mut cart = GuestCart::new();
        cart.add_item(ProductId::new(1), snapshot("Kale"), 2);
        cart.add_item(ProductId::new(2), snapshot("Honey"), 1);
        cart.add_item(ProductId::new(3), snapshot("Eggs"), 4);

        let api = api_for(&server).await;
        let report = reconcile_after_login(&api, "tok", &mut cart).await;

        assert_eq!(report.synced, 2);
        assert_eq!(report.attempted, 3);
        assert!(!report.unauthorized);
        assert!(!report.is_complete());
        // The pass ran to the end, so the local copy is gone either way.
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_stops_pass_and_keeps_cart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cart/add/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1) // the pass must stop after the first 401
            .mount(&server)
            .await;

        let mut cart = GuestCart::new();
        cart.add_item(ProductId::new(1), snapshot("Kale"), 2);
        cart.add_item(ProductId::new(2), snapshot("Honey"), 1);
        cart.add_item(ProductId::new(3), snapshot("Eggs"), 4);

        let api = api_for(&server).await;
        let report = reconcile_after_login(&api, "tok", &mut cart).await;

        assert_eq!(report.synced, 0);
        assert_eq!(report.attempted, 3);
        assert!(report.unauthorized);
        assert_eq!(cart.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_token_is_treated_as_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cart/add/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut cart = GuestCart::new();
        cart.add_item(ProductId::new(1), snapshot("Kale"), 2);

        let api = api_for(&server).await;
        let report = reconcile_after_login(&api, "", &mut cart).await;

        assert!(report.unauthorized);
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn test_accumulated_quantity_is_pushed_whole() {
        let server = MockServer::start().await;
        // Two local adds of the same product collapse into one line, so the
        // server sees a single request with the accumulated quantity.
        Mock::given(method("POST"))
            .and(path("/api/cart/add/"))
            .and(body_json(json!({"product_id": 42, "quantity": 5})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let mut cart = GuestCart::new();
        cart.add_item(ProductId::new(42), snapshot("Tomatoes"), 2);
        cart.add_item(ProductId::new(42), snapshot("Tomatoes"), 3);

        let api = api_for(&server).await;
        let report = reconcile_after_login(&api, "tok", &mut cart).await;

        assert_eq!(report.synced, 1);
        assert_eq!(report.attempted, 1);
        assert!(report.is_complete());
        assert!(cart.is_empty());
    }
}
