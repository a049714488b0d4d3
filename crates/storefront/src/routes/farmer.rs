//! Farmer portal route handlers.
//!
//! Inventory management and incoming orders for approved providers, served
//! against the farmer API root. Backends that have not shipped the portal
//! yet answer 404/405; those pages degrade to an availability notice.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use greengate_core::{OrderId, OrderStatus, ProductId};

use crate::api::types::{FarmerOrder, FarmerProduct, FarmerProductInput};
use crate::filters;
use crate::middleware::{RequireFarmer, expire_auth};
use crate::state::AppState;

/// Inventory form data, shared by create and update.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub unit: Option<String>,
    pub stock_quantity: Option<u32>,
    /// Checkbox; absent means unavailable.
    pub is_available: Option<String>,
}

/// Order status form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Query parameters carrying an inline error from a redirect.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

/// Inventory page template.
#[derive(Template, WebTemplate)]
#[template(path = "farmer/index.html")]
pub struct InventoryTemplate {
    pub products: Vec<FarmerProduct>,
    pub unavailable: bool,
    pub error: Option<String>,
}

/// Incoming orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "farmer/orders.html")]
pub struct FarmerOrdersTemplate {
    pub orders: Vec<FarmerOrder>,
    pub unavailable: bool,
    pub error: Option<String>,
}

/// Display the inventory page.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireFarmer(auth): RequireFarmer,
    Query(query): Query<MessageQuery>,
    session: Session,
) -> Response {
    match state.api().farmer_products(&auth.access_token).await {
        Ok(products) => InventoryTemplate {
            products,
            unavailable: false,
            error: query.error,
        }
        .into_response(),
        Err(e) if e.is_unavailable() => InventoryTemplate {
            products: Vec::new(),
            unavailable: true,
            error: None,
        }
        .into_response(),
        Err(e) if e.is_unauthorized() => {
            expire_auth(&session).await;
            crate::error::AppError::from(e).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load farmer inventory");
            InventoryTemplate {
                products: Vec::new(),
                unavailable: false,
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}

/// Decode the shared inventory form into an API payload.
fn parse_product_form(form: ProductForm) -> Result<FarmerProductInput, String> {
    if form.name.trim().is_empty() {
        return Err("Product name is required.".to_string());
    }
    let price: Decimal = form
        .price
        .trim()
        .parse()
        .map_err(|_| "Price must be a number like 2.50.".to_string())?;
    if price < Decimal::ZERO {
        return Err("Price cannot be negative.".to_string());
    }

    Ok(FarmerProductInput {
        name: form.name.trim().to_string(),
        price,
        unit: form.unit.filter(|u| !u.trim().is_empty()),
        stock_quantity: form.stock_quantity,
        is_available: form.is_available.is_some(),
    })
}

fn inventory_redirect(error: Option<&str>) -> Response {
    match error {
        Some(message) => {
            let message = urlencoding::encode(message).into_owned();
            Redirect::to(&format!("/farmer?error={message}")).into_response()
        }
        None => Redirect::to("/farmer").into_response(),
    }
}

/// Create an inventory item.
#[instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    RequireFarmer(auth): RequireFarmer,
    Form(form): Form<ProductForm>,
) -> Response {
    let input = match parse_product_form(form) {
        Ok(input) => input,
        Err(message) => return inventory_redirect(Some(&message)),
    };

    match state
        .api()
        .farmer_create_product(&auth.access_token, &input)
        .await
    {
        Ok(()) => inventory_redirect(None),
        Err(e) => {
            tracing::warn!(error = %e, "farmer product create failed");
            inventory_redirect(Some(&e.user_message()))
        }
    }
}

/// Update an inventory item.
#[instrument(skip(state, auth, form))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireFarmer(auth): RequireFarmer,
    Path(id): Path<i64>,
    Form(form): Form<ProductForm>,
) -> Response {
    let input = match parse_product_form(form) {
        Ok(input) => input,
        Err(message) => return inventory_redirect(Some(&message)),
    };

    match state
        .api()
        .farmer_update_product(&auth.access_token, ProductId::new(id), &input)
        .await
    {
        Ok(()) => inventory_redirect(None),
        Err(e) => {
            tracing::warn!(error = %e, product_id = id, "farmer product update failed");
            inventory_redirect(Some(&e.user_message()))
        }
    }
}

/// Delete an inventory item.
#[instrument(skip(state, auth))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireFarmer(auth): RequireFarmer,
    Path(id): Path<i64>,
) -> Response {
    match state
        .api()
        .farmer_delete_product(&auth.access_token, ProductId::new(id))
        .await
    {
        Ok(()) => inventory_redirect(None),
        Err(e) => {
            tracing::warn!(error = %e, product_id = id, "farmer product delete failed");
            inventory_redirect(Some(&e.user_message()))
        }
    }
}

/// Display incoming orders.
#[instrument(skip_all)]
pub async fn orders(
    State(state): State<AppState>,
    RequireFarmer(auth): RequireFarmer,
    Query(query): Query<MessageQuery>,
    session: Session,
) -> Response {
    match state.api().farmer_orders(&auth.access_token).await {
        Ok(orders) => FarmerOrdersTemplate {
            orders,
            unavailable: false,
            error: query.error,
        }
        .into_response(),
        Err(e) if e.is_unavailable() => FarmerOrdersTemplate {
            orders: Vec::new(),
            unavailable: true,
            error: None,
        }
        .into_response(),
        Err(e) if e.is_unauthorized() => {
            expire_auth(&session).await;
            crate::error::AppError::from(e).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load farmer orders");
            FarmerOrdersTemplate {
                orders: Vec::new(),
                unavailable: false,
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}

/// Move an order to a new status.
#[instrument(skip(state, auth))]
pub async fn update_order_status(
    State(state): State<AppState>,
    RequireFarmer(auth): RequireFarmer,
    Path(id): Path<i64>,
    Form(form): Form<StatusForm>,
) -> Response {
    // Unknown strings fall back to pending rather than failing the form.
    let status: OrderStatus =
        serde_json::from_value(serde_json::Value::String(form.status)).unwrap_or_default();

    match state
        .api()
        .farmer_update_order_status(&auth.access_token, OrderId::new(id), status)
        .await
    {
        Ok(()) => Redirect::to("/farmer/orders").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, order_id = id, "farmer order status update failed");
            let message = urlencoding::encode(&e.user_message()).into_owned();
            Redirect::to(&format!("/farmer/orders?error={message}")).into_response()
        }
    }
}
