//! Server cart CRUD. Never cached - mutable state.
//!
//! Every mutation is followed by a fresh `get_cart` in the route layer so
//! the rendered totals are always the server-computed ones.

use serde_json::json;
use tracing::instrument;

use greengate_core::{CartItemId, ProductId};

use super::types::ServerCart;
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Fetch the authenticated cart with its server-computed totals.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is no longer valid.
    #[instrument(skip(self, token))]
    pub async fn get_cart(&self, token: &str) -> Result<ServerCart, ApiError> {
        let value = self.get("cart/", Some(token)).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            detail: format!("cart: {e}"),
        })
    }

    /// Add a quantity of a product to the server cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` when the product is gone or out of stock;
    /// `ApiError::Unauthorized` when the token is no longer valid.
    #[instrument(skip(self, token))]
    pub async fn add_to_cart(
        &self,
        token: &str,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let body = json!({ "product_id": product_id, "quantity": quantity });
        self.post("cart/add/", Some(token), &body).await?;
        Ok(())
    }

    /// Set the absolute quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn update_cart_item(
        &self,
        token: &str,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let body = json!({ "quantity": quantity });
        self.patch(&format!("cart/update/{item_id}/"), Some(token), &body)
            .await?;
        Ok(())
    }

    /// Remove a cart line entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn remove_cart_item(
        &self,
        token: &str,
        item_id: CartItemId,
    ) -> Result<(), ApiError> {
        self.delete(&format!("cart/remove/{item_id}/"), Some(token))
            .await?;
        Ok(())
    }
}
