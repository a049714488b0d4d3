//! Wire types for the marketplace REST API.
//!
//! Everything here mirrors what the backend serializes. Money fields are
//! decimal strings on the wire (`"2.50"`); server-computed totals are carried
//! through verbatim and never recomputed by this client.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use greengate_core::{
    CartItemId, FarmId, FavoriteId, OrderId, OrderStatus, ProductId, ProductSnapshot,
    RegistrationId, RegistrationStatus, UserId, UserRole,
};

use super::{ApiError, extract_access_token, extract_product_id};

/// Unwrap a listing response that may be a bare array or a DRF-style
/// paginated object (`{"results": [...]}`)
///
/// Any other shape is a decode failure.
pub(super) fn list_items(value: Value) -> Result<Vec<Value>, ApiError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => match object.remove("results") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ApiError::Decode {
                detail: "listing response is neither an array nor a paginated object".to_string(),
            }),
        },
        _ => Err(ApiError::Decode {
            detail: "listing response is not an array".to_string(),
        }),
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub unit: Option<String>,
    pub photo_url: Option<String>,
    pub farm_id: Option<FarmId>,
    pub farm_name: Option<String>,
    pub is_available: bool,
}

/// Product fields other than the ID, which needs shape normalization.
#[derive(Debug, Deserialize)]
struct ProductFields {
    #[serde(default)]
    name: String,
    #[serde(default)]
    price: Decimal,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default, alias = "photo", alias = "image")]
    photo_url: Option<String>,
    #[serde(default)]
    farm_id: Option<FarmId>,
    #[serde(default)]
    farm_name: Option<String>,
    #[serde(default = "default_true")]
    is_available: bool,
}

const fn default_true() -> bool {
    true
}

impl Product {
    /// Decode a product object, resolving the ID through the documented
    /// priority order (`id`, `product_id`, `pk`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if the ID cannot be resolved to a
    /// positive integer or the remaining fields do not deserialize.
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        let id = extract_product_id(&value)?;
        let fields: ProductFields =
            serde_json::from_value(value).map_err(|e| ApiError::Decode {
                detail: format!("product fields: {e}"),
            })?;
        Ok(Self {
            id,
            name: fields.name,
            price: fields.price,
            unit: fields.unit,
            photo_url: fields.photo_url,
            farm_id: fields.farm_id,
            farm_name: fields.farm_name,
            is_available: fields.is_available,
        })
    }

    /// The bounded display snapshot cached alongside a guest-cart quantity.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            name: self.name.clone(),
            price: self.price,
            unit: self.unit.clone(),
            photo_url: self.photo_url.clone(),
            farm_name: self.farm_name.clone(),
        }
    }
}

/// A producer ("farm").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    #[serde(alias = "pk")]
    pub id: FarmId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "photo")]
    pub photo_url: Option<String>,
}

// =============================================================================
// Server cart (authoritative)
// =============================================================================

/// The authenticated server-side cart. Totals are server-computed and
/// authoritative; this client renders them verbatim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ServerCart {
    #[serde(default)]
    pub items: Vec<ServerCartItem>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub total: Decimal,
}

impl ServerCart {
    /// Total unit count across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |acc, item| acc.saturating_add(item.quantity))
    }
}

/// One server-cart line item.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerCartItem {
    #[serde(alias = "pk")]
    pub id: CartItemId,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_price: Decimal,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub subtotal: Decimal,
}

// =============================================================================
// Auth
// =============================================================================

/// A successful credential issuance.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests. Never empty.
    pub access_token: String,
    /// Optional refresh token; stored but unused until the backend ships
    /// token refresh.
    pub refresh_token: Option<String>,
    /// Profile of the authenticated user, when the backend includes one.
    pub user: Option<UserProfile>,
}

impl LoginResponse {
    /// Decode a credential response, resolving the token through the
    /// documented priority order (`access`, `access_token`, `token`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if no non-empty access token is present.
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        let access_token = extract_access_token(value)?;
        let refresh_token = value
            .get("refresh")
            .or_else(|| value.get("refresh_token"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);
        let user = value
            .get("user")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok());
        Ok(Self {
            access_token,
            refresh_token,
            user,
        })
    }
}

/// The authenticated user's profile as the backend serializes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(alias = "pk")]
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "full_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

/// Registration form payload.
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Provider registration form payload.
#[derive(Debug, Serialize)]
pub struct RegisterProviderRequest {
    pub email: String,
    pub password: String,
    pub farm_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Provider approval-polling response.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationStatusResponse {
    #[serde(default)]
    pub status: RegistrationStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// Resolve a provider registration ID from a registration response.
pub(super) fn extract_registration_id(value: &Value) -> Result<RegistrationId, ApiError> {
    for key in ["id", "registration_id", "pk"] {
        if let Some(id) = value.get(key).and_then(Value::as_i64)
            && id > 0
        {
            return Ok(RegistrationId::new(id));
        }
    }
    Err(ApiError::Decode {
        detail: "no registration id under any of 'id', 'registration_id', 'pk'".to_string(),
    })
}

// =============================================================================
// Orders & checkout
// =============================================================================

/// Checkout form payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub delivery_address: DeliveryAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A delivery address, also cached in the session between checkouts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub recipient: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Result of creating an order.
#[derive(Debug, Clone)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    /// Present when a third-party payment confirmation step is required.
    pub payment_intent_id: Option<String>,
    /// Client secret the payment widget consumes, when payment is required.
    pub client_secret: Option<String>,
}

impl CheckoutResponse {
    /// Decode a checkout response, resolving the order ID through the
    /// documented priority order (`id`, `order_id`, `pk`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if no positive order ID is present.
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        let mut order_id = None;
        for key in ["id", "order_id", "pk"] {
            if let Some(id) = value.get(key).and_then(Value::as_i64)
                && id > 0
            {
                order_id = Some(OrderId::new(id));
                break;
            }
        }
        let order_id = order_id.ok_or_else(|| ApiError::Decode {
            detail: "no order id under any of 'id', 'order_id', 'pk'".to_string(),
        })?;

        let payment_intent_id = value
            .get("payment_intent_id")
            .or_else(|| value.get("payment_intent"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);
        let client_secret = value
            .get("client_secret")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        Ok(Self {
            order_id,
            payment_intent_id,
            client_secret,
        })
    }
}

/// An order as rendered on the history page.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Order {
    #[serde(alias = "pk")]
    pub id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// One order line.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderItem {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub price: Decimal,
}

// =============================================================================
// Favorites
// =============================================================================

/// A favorited farm.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Favorite {
    #[serde(alias = "pk")]
    pub id: FavoriteId,
    pub farm_id: FarmId,
    #[serde(default)]
    pub farm_name: String,
}

// =============================================================================
// Farmer portal
// =============================================================================

/// A product as managed through the farmer portal.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FarmerProduct {
    #[serde(alias = "pk")]
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub stock_quantity: Option<u32>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

/// Payload for creating or updating a farmer-portal product.
#[derive(Debug, Clone, Serialize)]
pub struct FarmerProductInput {
    pub name: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<u32>,
    pub is_available: bool,
}

/// An incoming order as seen by a farmer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FarmerOrder {
    #[serde(alias = "pk")]
    pub id: OrderId,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_from_value_with_alternate_id_key() {
        let product = Product::from_value(json!({
            "product_id": 9,
            "name": "Raw Honey",
            "price": "9.50",
            "unit": "jar",
            "farm_name": "Bee Kind"
        }))
        .unwrap();
        assert_eq!(product.id, ProductId::new(9));
        assert_eq!(product.price, "9.50".parse::<Decimal>().unwrap());
        assert!(product.is_available);
    }

    #[test]
    fn test_product_from_value_rejects_missing_id() {
        let err = Product::from_value(json!({"name": "Mystery"})).unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn test_product_snapshot_copies_display_fields() {
        let product = Product::from_value(json!({
            "id": 42,
            "name": "Tomatoes",
            "price": "2.50",
            "unit": "lb",
            "farm_name": "Hilltop"
        }))
        .unwrap();
        let snap = product.snapshot();
        assert_eq!(snap.name, "Tomatoes");
        assert_eq!(snap.farm_name.as_deref(), Some("Hilltop"));
    }

    #[test]
    fn test_list_items_accepts_both_shapes() {
        let bare = json!([{"id": 1}]);
        assert_eq!(list_items(bare).unwrap().len(), 1);

        let paginated = json!({"count": 2, "results": [{"id": 1}, {"id": 2}]});
        assert_eq!(list_items(paginated).unwrap().len(), 2);

        assert!(list_items(json!("nope")).is_err());
        assert!(list_items(json!({"items": []})).is_err());
    }

    #[test]
    fn test_login_response_shapes() {
        let v = json!({"access": "tok", "refresh": "ref", "user": {"id": 3, "email": "a@b.c", "role": "buyer"}});
        let login = LoginResponse::from_value(&v).unwrap();
        assert_eq!(login.access_token, "tok");
        assert_eq!(login.refresh_token.as_deref(), Some("ref"));
        assert_eq!(login.user.unwrap().id, UserId::new(3));

        // Malformed user payload degrades to None rather than failing login.
        let v = json!({"token": "tok", "user": "oops"});
        let login = LoginResponse::from_value(&v).unwrap();
        assert!(login.user.is_none());
    }

    #[test]
    fn test_checkout_response_payment_fields() {
        let v = json!({"order_id": 11, "payment_intent_id": "pi_1", "client_secret": "cs_1"});
        let checkout = CheckoutResponse::from_value(&v).unwrap();
        assert_eq!(checkout.order_id, OrderId::new(11));
        assert_eq!(checkout.payment_intent_id.as_deref(), Some("pi_1"));

        let v = json!({"id": 12});
        let checkout = CheckoutResponse::from_value(&v).unwrap();
        assert!(checkout.payment_intent_id.is_none());
        assert!(checkout.client_secret.is_none());
    }

    #[test]
    fn test_server_cart_decodes_with_string_decimals() {
        let cart: ServerCart = serde_json::from_value(json!({
            "items": [
                {"id": 1, "product_name": "Kale", "product_price": "3.00", "quantity": 2, "subtotal": "6.00"}
            ],
            "subtotal": "6.00",
            "tax": "0.42",
            "total": "6.42"
        }))
        .unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.total, "6.42".parse::<Decimal>().unwrap());
    }
}
