//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Logged-in visitors work against the authoritative server cart; guests
//! work against the session-held guest cart, which is persisted after every
//! mutation and reconciled into the server cart at login.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use greengate_core::{CartItemId, GuestCart, ProductId};

use crate::api::types::ServerCart;
use crate::filters;
use crate::middleware::expire_auth;
use crate::models::session::{AuthSession, keys, load, store};
use crate::state::AppState;

/// One cart line as rendered, for either cart flavor.
///
/// Server lines carry an `item_id` for mutations; guest lines carry the
/// `product_id` instead.
#[derive(Clone)]
pub struct CartLineView {
    pub item_id: Option<CartItemId>,
    pub product_id: Option<ProductId>,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
    pub line_total: Decimal,
    pub unit: Option<String>,
    pub photo_url: Option<String>,
    pub farm_name: Option<String>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub subtotal: Decimal,
    /// Server-computed; absent for guest carts.
    pub tax: Option<Decimal>,
    /// Server-computed; absent for guest carts.
    pub total: Option<Decimal>,
    pub total_quantity: u32,
    pub is_guest: bool,
}

impl CartView {
    /// An empty cart view.
    #[must_use]
    pub fn empty(is_guest: bool) -> Self {
        Self {
            lines: Vec::new(),
            subtotal: Decimal::ZERO,
            tax: None,
            total: None,
            total_quantity: 0,
            is_guest,
        }
    }
}

impl From<&ServerCart> for CartView {
    fn from(cart: &ServerCart) -> Self {
        Self {
            lines: cart
                .items
                .iter()
                .map(|item| CartLineView {
                    item_id: Some(item.id),
                    product_id: None,
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    price: item.product_price,
                    line_total: item.subtotal,
                    unit: None,
                    photo_url: None,
                    farm_name: None,
                })
                .collect(),
            subtotal: cart.subtotal,
            tax: Some(cart.tax),
            total: Some(cart.total),
            total_quantity: cart.total_quantity(),
            is_guest: false,
        }
    }
}

impl From<&GuestCart> for CartView {
    fn from(cart: &GuestCart) -> Self {
        Self {
            lines: cart
                .items()
                .iter()
                .map(|line| CartLineView {
                    item_id: None,
                    product_id: Some(line.product_id),
                    name: line.snapshot.name.clone(),
                    quantity: line.quantity,
                    price: line.snapshot.price,
                    line_total: line.line_total(),
                    unit: line.snapshot.unit.clone(),
                    photo_url: line.snapshot.photo_url.clone(),
                    farm_name: line.snapshot.farm_name.clone(),
                })
                .collect(),
            subtotal: cart.subtotal(),
            tax: None,
            total: None,
            total_quantity: cart.total_quantity(),
            is_guest: true,
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the guest cart from the session, treating failures as an empty cart.
pub async fn load_guest_cart(session: &Session) -> GuestCart {
    load(session, keys::GUEST_CART).await.unwrap_or_default()
}

/// Persist the guest cart; a write failure logs and drops the mutation.
pub async fn save_guest_cart(session: &Session, cart: &GuestCart) {
    store(session, keys::GUEST_CART, cart).await;
}

/// Load the auth session, if any.
async fn auth_session(session: &Session) -> Option<AuthSession> {
    load(session, keys::AUTH_SESSION).await
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i64,
    pub quantity: Option<u32>,
}

/// Update cart form data. Server lines are addressed by `item_id`, guest
/// lines by `product_id`; the rendered form only carries the relevant one.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: Option<i64>,
    pub product_id: Option<i64>,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: Option<i64>,
    pub product_id: Option<i64>,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// Build the current cart view for whichever cart flavor applies.
///
/// An expired token drops the auth session and falls back to the (empty or
/// not) guest cart; other API failures surface as an inline message.
async fn current_view(
    state: &AppState,
    session: &Session,
) -> (CartView, Option<String>) {
    let Some(auth) = auth_session(session).await else {
        return (CartView::from(&load_guest_cart(session).await), None);
    };

    match state.api().get_cart(&auth.access_token).await {
        Ok(cart) => (CartView::from(&cart), None),
        Err(e) if e.is_unauthorized() => {
            expire_auth(session).await;
            (CartView::from(&load_guest_cart(session).await), None)
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to fetch server cart");
            (CartView::empty(false), Some(e.user_message()))
        }
    }
}

/// Display the cart page.
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let (cart, error) = current_view(&state, &session).await;
    CartShowTemplate { cart, error }
}

/// Add an item to the cart (HTMX).
///
/// Returns the count badge with an `HX-Trigger` so other fragments refresh.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let product_id = ProductId::new(form.product_id);
    if !product_id.is_valid() {
        // Malformed markup or stale page; adding nothing is the contract.
        tracing::warn!(product_id = form.product_id, "ignoring add with invalid product id");
        return count_badge(&state, &session).await.into_response();
    }
    let quantity = form.quantity.unwrap_or(1);

    if let Some(auth) = auth_session(&session).await {
        match state
            .api()
            .add_to_cart(&auth.access_token, product_id, quantity)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_unauthorized() => {
                expire_auth(&session).await;
                return StatusCode::UNAUTHORIZED.into_response();
            }
            Err(e) => {
                tracing::warn!(error = %e, %product_id, "add to server cart failed");
                return (StatusCode::UNPROCESSABLE_ENTITY, e.user_message()).into_response();
            }
        }
    } else {
        // Guest add: resolve the display snapshot from the cached catalog.
        // An unknown product is a logged no-op.
        match state.api().list_products().await {
            Ok(products) => match products.iter().find(|p| p.id == product_id) {
                Some(product) => {
                    let mut cart = load_guest_cart(&session).await;
                    cart.add_item(product_id, product.snapshot(), quantity);
                    save_guest_cart(&session, &cart).await;
                }
                None => {
                    tracing::warn!(%product_id, "ignoring add for product not in catalog");
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "catalog unavailable during guest add");
                return (StatusCode::UNPROCESSABLE_ENTITY, e.user_message()).into_response();
            }
        }
    }

    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        count_badge(&state, &session).await,
    )
        .into_response()
}

/// Set a cart line's quantity (HTMX). Zero removes the line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let error = apply_update(&state, &session, form.item_id, form.product_id, form.quantity).await;
    items_fragment(&state, &session, error).await
}

/// Remove a cart line (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let error = apply_update(&state, &session, form.item_id, form.product_id, 0).await;
    items_fragment(&state, &session, error).await
}

/// Apply a quantity change to whichever cart flavor applies.
///
/// Returns an inline error message, if any.
async fn apply_update(
    state: &AppState,
    session: &Session,
    item_id: Option<i64>,
    product_id: Option<i64>,
    quantity: u32,
) -> Option<String> {
    if let Some(auth) = auth_session(session).await {
        let Some(item_id) = item_id.map(CartItemId::new) else {
            return Some("This item is no longer in your cart.".to_string());
        };
        let result = if quantity == 0 {
            state
                .api()
                .remove_cart_item(&auth.access_token, item_id)
                .await
        } else {
            state
                .api()
                .update_cart_item(&auth.access_token, item_id, quantity)
                .await
        };
        match result {
            Ok(()) => None,
            Err(e) if e.is_unauthorized() => {
                expire_auth(session).await;
                Some(e.user_message())
            }
            Err(e) => {
                tracing::warn!(error = %e, %item_id, "server cart update failed");
                Some(e.user_message())
            }
        }
    } else {
        let Some(product_id) = product_id.map(ProductId::new) else {
            return Some("This item is no longer in your cart.".to_string());
        };
        let mut cart = load_guest_cart(session).await;
        cart.set_quantity(product_id, quantity);
        save_guest_cart(session, &cart).await;
        None
    }
}

/// Empty the cart (HTMX).
///
/// The server cart has no bulk-clear endpoint, so lines are deleted one at a
/// time, sequentially; a failed delete leaves that line in place.
#[instrument(skip_all)]
pub async fn clear(State(state): State<AppState>, session: Session) -> Response {
    if let Some(auth) = auth_session(&session).await {
        let token = &auth.access_token;
        match state.api().get_cart(token).await {
            Ok(cart) => {
                for item in &cart.items {
                    match state.api().remove_cart_item(token, item.id).await {
                        Ok(()) => {}
                        Err(e) if e.is_unauthorized() => {
                            expire_auth(&session).await;
                            return Redirect::to("/auth/login").into_response();
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, item_id = %item.id, "failed to clear cart line");
                        }
                    }
                }
            }
            Err(e) if e.is_unauthorized() => {
                expire_auth(&session).await;
                return Redirect::to("/auth/login").into_response();
            }
            Err(e) => {
                return items_fragment(&state, &session, Some(e.user_message())).await;
            }
        }
    } else {
        let mut cart = load_guest_cart(&session).await;
        cart.clear();
        save_guest_cart(&session, &cart).await;
    }

    items_fragment(&state, &session, None).await
}

/// Get the cart count badge (HTMX).
#[instrument(skip_all)]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    count_badge(&state, &session).await
}

async fn count_badge(state: &AppState, session: &Session) -> CartCountTemplate {
    let (cart, _) = current_view(state, session).await;
    CartCountTemplate {
        count: cart.total_quantity,
    }
}

async fn items_fragment(state: &AppState, session: &Session, error: Option<String>) -> Response {
    let (cart, fetch_error) = current_view(state, session).await;
    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart,
            error: error.or(fetch_error),
        },
    )
        .into_response()
}
