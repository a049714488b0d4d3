//! Read-only catalog endpoints, cached for 5 minutes.

use tracing::{debug, instrument};

use super::types::{Farm, Product, list_items};
use super::{ApiClient, ApiError, CacheValue};

const PRODUCTS_CACHE_KEY: &str = "products";
const FARMS_CACHE_KEY: &str = "farms";

impl ApiClient {
    /// List the product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or any product in the listing
    /// has an unresolvable ID.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(PRODUCTS_CACHE_KEY).await
        {
            debug!("cache hit for products");
            return Ok(products);
        }

        let value = self.get("products/", None).await?;
        let products = list_items(value)?
            .into_iter()
            .map(Product::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        self.inner
            .cache
            .insert(
                PRODUCTS_CACHE_KEY.to_string(),
                CacheValue::Products(products.clone()),
            )
            .await;

        Ok(products)
    }

    /// List the participating farms.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    #[instrument(skip(self))]
    pub async fn list_farms(&self) -> Result<Vec<Farm>, ApiError> {
        if let Some(CacheValue::Farms(farms)) = self.inner.cache.get(FARMS_CACHE_KEY).await {
            debug!("cache hit for farms");
            return Ok(farms);
        }

        let value = self.get("farms/", None).await?;
        let farms = list_items(value)?
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| ApiError::Decode {
                    detail: format!("farm fields: {e}"),
                })
            })
            .collect::<Result<Vec<Farm>, _>>()?;

        self.inner
            .cache
            .insert(FARMS_CACHE_KEY.to_string(), CacheValue::Farms(farms.clone()))
            .await;

        Ok(farms)
    }
}
