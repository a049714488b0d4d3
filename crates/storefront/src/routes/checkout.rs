//! Checkout route handlers.
//!
//! Checkout turns the server cart into an order. When the marketplace
//! requires a payment step, the order ID and payment intent survive the
//! widget redirect as the session's pending-order marker; confirmation
//! clears it. The delivery address is cached in the session and prefills
//! the next checkout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use greengate_core::OrderId;

use crate::api::types::{CheckoutRequest, DeliveryAddress};
use crate::filters;
use crate::middleware::{RequireAuth, expire_auth};
use crate::models::session::{PendingOrder, clear, keys, load, store};
use crate::routes::cart::CartView;
use crate::state::AppState;

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub recipient: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub phone: Option<String>,
    pub note: Option<String>,
}

/// Checkout page template: the delivery address form plus a cart summary.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/index.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub address: DeliveryAddress,
    pub error: Option<String>,
}

/// Payment page template, rendered when the order needs a payment step.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub order_id: OrderId,
    pub publishable_key: String,
    pub client_secret: Option<String>,
    pub error: Option<String>,
}

/// Order-complete page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/complete.html")]
pub struct CompleteTemplate {
    pub order_id: OrderId,
}

/// Display the checkout page.
///
/// An empty server cart has nothing to check out and bounces back to the
/// cart page.
#[instrument(skip_all)]
pub async fn page(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    session: Session,
) -> Response {
    let cart = match state.api().get_cart(&auth.access_token).await {
        Ok(cart) => cart,
        Err(e) => {
            if e.is_unauthorized() {
                expire_auth(&session).await;
            }
            return crate::error::AppError::from(e).into_response();
        }
    };
    if cart.items.is_empty() {
        return Redirect::to("/cart").into_response();
    }

    let address: DeliveryAddress = load(&session, keys::DELIVERY_ADDRESS)
        .await
        .unwrap_or_default();

    CheckoutTemplate {
        cart: CartView::from(&cart),
        address,
        error: None,
    }
    .into_response()
}

/// Handle checkout form submission: create the order.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let address = DeliveryAddress {
        recipient: form.recipient.trim().to_string(),
        street: form.street.trim().to_string(),
        city: form.city.trim().to_string(),
        postal_code: form.postal_code.trim().to_string(),
        phone: form.phone.filter(|p| !p.trim().is_empty()),
    };
    // Cache for the next checkout regardless of how this one goes.
    store(&session, keys::DELIVERY_ADDRESS, &address).await;

    let request = CheckoutRequest {
        delivery_address: address.clone(),
        note: form.note.filter(|n| !n.trim().is_empty()),
    };

    let response = match state.api().checkout(&auth.access_token, &request).await {
        Ok(response) => response,
        Err(e) if e.is_unauthorized() => {
            expire_auth(&session).await;
            return crate::error::AppError::from(e).into_response();
        }
        Err(e) => {
            tracing::warn!(error = %e, "checkout failed");
            let cart = state
                .api()
                .get_cart(&auth.access_token)
                .await
                .map(|c| CartView::from(&c))
                .unwrap_or_else(|_| CartView::empty(false));
            return CheckoutTemplate {
                cart,
                address,
                error: Some(e.user_message()),
            }
            .into_response();
        }
    };

    if response.payment_intent_id.is_some() || response.client_secret.is_some() {
        let pending = PendingOrder {
            order_id: response.order_id,
            payment_intent_id: response.payment_intent_id,
        };
        store(&session, keys::PENDING_ORDER, &pending).await;

        return PaymentTemplate {
            order_id: response.order_id,
            publishable_key: state.config().payment.publishable_key.clone(),
            client_secret: response.client_secret,
            error: None,
        }
        .into_response();
    }

    // No payment step required; confirm straight away.
    finalize(&state, &auth.access_token, &session, response.order_id, None).await
}

/// Confirm the pending order after the payment step.
#[instrument(skip_all)]
pub async fn confirm(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    session: Session,
) -> Response {
    resume_pending(&state, &auth.access_token, &session).await
}

/// Resume after the payment widget's redirect round trip.
#[instrument(skip_all)]
pub async fn payment_return(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    session: Session,
) -> Response {
    resume_pending(&state, &auth.access_token, &session).await
}

/// Confirm whatever order the pending marker points at.
///
/// Without a marker there is nothing in flight and the visitor lands on
/// their order history.
async fn resume_pending(state: &AppState, token: &str, session: &Session) -> Response {
    let Some(pending): Option<PendingOrder> = load(session, keys::PENDING_ORDER).await else {
        return Redirect::to("/orders").into_response();
    };

    finalize(
        state,
        token,
        session,
        pending.order_id,
        pending.payment_intent_id.as_deref(),
    )
    .await
}

/// Confirm an order and clear the pending marker on success.
async fn finalize(
    state: &AppState,
    token: &str,
    session: &Session,
    order_id: OrderId,
    payment_intent_id: Option<&str>,
) -> Response {
    match state
        .api()
        .confirm_order(token, order_id, payment_intent_id)
        .await
    {
        Ok(()) => {
            clear(session, keys::PENDING_ORDER).await;
            CompleteTemplate { order_id }.into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, %order_id, "order confirmation failed");
            // The marker stays so /checkout/return can retry.
            PaymentTemplate {
                order_id,
                publishable_key: state.config().payment.publishable_key.clone(),
                client_secret: None,
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}
