//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Store page (products + farms)
//! GET  /health                 - Health check
//!
//! # Store
//! POST /farms/{id}/favorite    - Toggle a farm favorite (HTMX fragment)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page (server cart or guest cart)
//! POST /cart/add               - Add to cart (returns count, triggers cart-updated)
//! POST /cart/update            - Set line quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove line (returns cart_items fragment)
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (requires auth)
//! GET  /checkout               - Delivery address form
//! POST /checkout               - Create the order
//! POST /checkout/confirm       - Confirm after the payment step
//! GET  /checkout/return        - Resume after a payment redirect
//!
//! # Orders (requires auth)
//! GET  /orders                 - Order history
//! POST /orders/{id}/star       - Toggle the session-local star
//!
//! # Account (requires auth)
//! GET  /account                - Profile + favorite farms
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action (reconciles the guest cart)
//! GET  /auth/register          - Buyer registration page
//! POST /auth/register          - Buyer registration action
//! GET  /auth/register-farm     - Provider registration page
//! POST /auth/register-farm     - Provider registration action
//! GET  /auth/register-farm/status - Approval polling page
//! POST /auth/logout            - Logout action
//! GET  /auth/forgot-password   - Password reset request page
//! POST /auth/forgot-password   - Password reset request action
//! GET  /auth/reset/{uid}/{token} - Password reset confirm page
//! POST /auth/reset/{uid}/{token} - Password reset confirm action
//!
//! # Farmer portal (requires farmer role, feature-flagged)
//! GET  /farmer                 - Inventory list + create form
//! POST /farmer/products        - Create inventory item
//! POST /farmer/products/{id}   - Update inventory item
//! POST /farmer/products/{id}/delete - Delete inventory item
//! GET  /farmer/orders          - Incoming orders
//! POST /farmer/orders/{id}/status - Move an order to a new status
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod farmer;
pub mod orders;
pub mod store;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route(
            "/register-farm",
            get(auth::register_farm_page).post(auth::register_farm),
        )
        .route("/register-farm/status", get(auth::registration_status_page))
        .route("/logout", post(auth::logout))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route(
            "/reset/{uid}/{token}",
            get(auth::reset_password_page).post(auth::reset_password),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::page).post(checkout::submit))
        .route("/confirm", post(checkout::confirm))
        .route("/return", get(checkout::payment_return))
}

/// Create the farmer portal routes router.
pub fn farmer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(farmer::index))
        .route("/products", post(farmer::create_product))
        .route("/products/{id}", post(farmer::update_product))
        .route("/products/{id}/delete", post(farmer::delete_product))
        .route("/orders", get(farmer::orders))
        .route("/orders/{id}/status", post(farmer::update_order_status))
}

/// Create all routes for the storefront.
///
/// The farmer portal is only mounted when enabled in configuration.
pub fn routes(farmer_portal_enabled: bool) -> Router<AppState> {
    let mut router = Router::new()
        // Store page
        .route("/", get(store::index))
        .route("/farms/{id}/favorite", post(store::toggle_favorite))
        // Cart routes (relaxed per-IP rate limit on the HTMX fragments)
        .nest("/cart", cart_routes().route_layer(api_rate_limiter()))
        // Checkout routes
        .nest("/checkout", checkout_routes())
        // Orders
        .route("/orders", get(orders::index))
        .route("/orders/{id}/star", post(orders::toggle_star))
        // Account
        .route("/account", get(account::index))
        // Auth routes (strict per-IP rate limit)
        .nest("/auth", auth_routes().route_layer(auth_rate_limiter()));

    if farmer_portal_enabled {
        router = router.nest("/farmer", farmer_routes());
    }
    router
}
