//! Farmer portal endpoints.
//!
//! These live under their own root (not the `/api` prefix) and require a
//! farmer-role bearer token. A 404/405 anywhere here means the portal is not
//! deployed on this backend; routes render a "not available yet" notice.

use reqwest::Method;
use serde_json::{Value, json};
use tracing::instrument;

use greengate_core::{OrderId, OrderStatus, ProductId};

use super::types::{FarmerOrder, FarmerProduct, FarmerProductInput, list_items};
use super::{ApiClient, ApiError};

impl ApiClient {
    async fn farmer_send(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.farmer_url(path)?;
        let mut builder = self.request(method, url, Some(token));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await
    }

    /// List the farmer's own inventory.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self, token))]
    pub async fn farmer_products(&self, token: &str) -> Result<Vec<FarmerProduct>, ApiError> {
        let value = self
            .farmer_send(Method::GET, "products/", token, None)
            .await?;
        list_items(value)?
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| ApiError::Decode {
                    detail: format!("farmer product fields: {e}"),
                })
            })
            .collect()
    }

    /// Create an inventory item.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` with validation messages on bad input.
    #[instrument(skip(self, token, input), fields(name = %input.name))]
    pub async fn farmer_create_product(
        &self,
        token: &str,
        input: &FarmerProductInput,
    ) -> Result<(), ApiError> {
        let body = serde_json::to_value(input).map_err(|e| ApiError::Decode {
            detail: format!("farmer product payload: {e}"),
        })?;
        self.farmer_send(Method::POST, "products/", token, Some(&body))
            .await?;
        Ok(())
    }

    /// Replace an inventory item.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token, input))]
    pub async fn farmer_update_product(
        &self,
        token: &str,
        product_id: ProductId,
        input: &FarmerProductInput,
    ) -> Result<(), ApiError> {
        let body = serde_json::to_value(input).map_err(|e| ApiError::Decode {
            detail: format!("farmer product payload: {e}"),
        })?;
        self.farmer_send(
            Method::PUT,
            &format!("products/{product_id}/"),
            token,
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Delete an inventory item.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token))]
    pub async fn farmer_delete_product(
        &self,
        token: &str,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        self.farmer_send(
            Method::DELETE,
            &format!("products/{product_id}/"),
            token,
            None,
        )
        .await?;
        Ok(())
    }

    /// List orders containing this farmer's products.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self, token))]
    pub async fn farmer_orders(&self, token: &str) -> Result<Vec<FarmerOrder>, ApiError> {
        let value = self.farmer_send(Method::GET, "orders/", token, None).await?;
        list_items(value)?
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| ApiError::Decode {
                    detail: format!("farmer order fields: {e}"),
                })
            })
            .collect()
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Api` on an invalid status transition.
    #[instrument(skip(self, token))]
    pub async fn farmer_update_order_status(
        &self,
        token: &str,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        let body = json!({ "status": status.wire_value() });
        self.farmer_send(
            Method::POST,
            &format!("orders/{order_id}/status/"),
            token,
            Some(&body),
        )
        .await?;
        Ok(())
    }
}
