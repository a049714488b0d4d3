//! Order lifecycle and favorites endpoints.

use serde_json::json;
use tracing::instrument;

use greengate_core::{FarmId, FavoriteId, OrderId};

use super::types::{CheckoutRequest, CheckoutResponse, Favorite, Order, list_items};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Create an order from the current server cart.
    ///
    /// When the marketplace requires a payment-confirmation step, the
    /// response carries a payment intent; the caller persists it as the
    /// pending-order marker for the redirect round trip.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` on an empty cart or address validation
    /// failure.
    #[instrument(skip(self, token, request))]
    pub async fn checkout(
        &self,
        token: &str,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, ApiError> {
        let body = serde_json::to_value(request).map_err(|e| ApiError::Decode {
            detail: format!("checkout payload: {e}"),
        })?;
        let value = self.post("orders/checkout/", Some(token), &body).await?;
        CheckoutResponse::from_value(&value)
    }

    /// Confirm an order after the payment step completed.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` if the payment is not actually settled.
    #[instrument(skip(self, token))]
    pub async fn confirm_order(
        &self,
        token: &str,
        order_id: OrderId,
        payment_intent_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let body = match payment_intent_id {
            Some(intent) => json!({ "payment_intent_id": intent }),
            None => json!({}),
        };
        self.post(&format!("orders/{order_id}/confirm/"), Some(token), &body)
            .await?;
        Ok(())
    }

    /// Fetch the order history.
    ///
    /// Older backends only serve `orders/`; a 404/405 on `orders/history/`
    /// falls back to it instead of failing the page.
    ///
    /// # Errors
    ///
    /// Returns an error if both endpoints fail.
    #[instrument(skip(self, token))]
    pub async fn order_history(&self, token: &str) -> Result<Vec<Order>, ApiError> {
        let value = match self.get("orders/history/", Some(token)).await {
            Ok(value) => value,
            Err(e) if e.is_unavailable() => {
                tracing::debug!("orders/history/ not available, falling back to orders/");
                self.get("orders/", Some(token)).await?
            }
            Err(e) => return Err(e),
        };

        list_items(value)?
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| ApiError::Decode {
                    detail: format!("order fields: {e}"),
                })
            })
            .collect()
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// List the user's favorited farms.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self, token))]
    pub async fn list_favorites(&self, token: &str) -> Result<Vec<Favorite>, ApiError> {
        let value = self.get("favorites/", Some(token)).await?;
        list_items(value)?
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| ApiError::Decode {
                    detail: format!("favorite fields: {e}"),
                })
            })
            .collect()
    }

    /// Favorite a farm.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn add_favorite(&self, token: &str, farm_id: FarmId) -> Result<(), ApiError> {
        let body = json!({ "farm_id": farm_id });
        self.post("favorites/add/", Some(token), &body).await?;
        Ok(())
    }

    /// Remove a favorite.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn remove_favorite(
        &self,
        token: &str,
        favorite_id: FavoriteId,
    ) -> Result<(), ApiError> {
        self.delete(&format!("favorites/{favorite_id}/"), Some(token))
            .await?;
        Ok(())
    }
}
