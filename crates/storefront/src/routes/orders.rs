//! Order history route handlers.
//!
//! History is read-only; starring an order is a session-local affordance
//! that never touches the API.

use std::collections::HashSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use greengate_core::OrderId;

use crate::api::types::Order;
use crate::filters;
use crate::middleware::{RequireAuth, expire_auth};
use crate::models::session::{keys, load, store};
use crate::state::AppState;

/// One order with its session-local star state.
#[derive(Clone)]
pub struct OrderView {
    pub order: Order,
    pub starred: bool,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub orders: Vec<OrderView>,
    pub error: Option<String>,
}

/// Load the starred-order set from the session.
async fn starred_orders(session: &Session) -> HashSet<OrderId> {
    load(session, keys::STARRED_ORDERS).await.unwrap_or_default()
}

/// Display the order history page.
///
/// A backend without a history endpoint degrades to an inline notice
/// instead of a dead page.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    session: Session,
) -> Response {
    let orders = match state.api().order_history(&auth.access_token).await {
        Ok(orders) => orders,
        Err(e) if e.is_unauthorized() => {
            expire_auth(&session).await;
            return crate::error::AppError::from(e).into_response();
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load order history");
            return OrdersTemplate {
                orders: Vec::new(),
                error: Some(e.user_message()),
            }
            .into_response();
        }
    };

    let starred = starred_orders(&session).await;
    let orders = orders
        .into_iter()
        .map(|order| OrderView {
            starred: starred.contains(&order.id),
            order,
        })
        .collect();

    OrdersTemplate {
        orders,
        error: None,
    }
    .into_response()
}

/// Toggle the session-local star on an order.
#[instrument(skip(session))]
pub async fn toggle_star(
    RequireAuth(_auth): RequireAuth,
    session: Session,
    Path(id): Path<i64>,
) -> Response {
    let order_id = OrderId::new(id);
    let mut starred = starred_orders(&session).await;
    if !starred.insert(order_id) {
        starred.remove(&order_id);
    }
    store(&session, keys::STARRED_ORDERS, &starred).await;

    Redirect::to("/orders").into_response()
}
