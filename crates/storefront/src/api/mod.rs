//! Marketplace REST API client.
//!
//! # Architecture
//!
//! - The marketplace backend is the source of truth - no local sync, direct
//!   API calls with a bearer token when a session exists
//! - Every response is normalized into a typed result: 401 becomes
//!   [`ApiError::Unauthorized`], 404/405 become [`ApiError::Unavailable`]
//!   ("feature not shipped on this backend yet"), other non-2xx become
//!   [`ApiError::Api`] with the server's message extracted from its
//!   conventional error shapes
//! - In-memory caching via `moka` for read-only catalog responses (5 minute TTL)
//! - No retries. The only resilience at this boundary is a request timeout;
//!   callers decide whether a failure is fatal for their page
//!
//! # Example
//!
//! ```rust,ignore
//! use greengate_storefront::api::ApiClient;
//!
//! let api = ApiClient::new(&config.market);
//! let products = api.list_products().await?;
//! api.add_to_cart(token, products[0].id, 2).await?;
//! ```

mod auth;
mod cart;
mod catalog;
mod farmer;
mod orders;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use greengate_core::ProductId;

use crate::config::MarketApiConfig;
use types::{Farm, Product};

/// Request timeout. The original client had none at all; this is the one
/// piece of resilience added at this boundary.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How much of a raw response body to keep for diagnostics.
const SNIPPET_LEN: usize = 500;

/// Errors that can occur when talking to the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failure (DNS, connect, timeout, ...).
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the bearer token (HTTP 401).
    #[error("authentication required")]
    Unauthorized,

    /// The endpoint does not exist on this backend yet (HTTP 404/405).
    /// Callers treat this as "feature not available" and degrade.
    #[error("endpoint not available (HTTP {0})")]
    Unavailable(u16),

    /// Validation or business failure with a server-provided message.
    #[error("marketplace error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body was not the shape this client understands.
    #[error("malformed response: {detail}")]
    Decode { detail: String },
}

impl ApiError {
    /// Whether this error means the session token is no longer valid.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Whether this error means the endpoint is simply absent.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// A message safe to show inline on the current page.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Http(_) => "Network error. Please check your connection and try again.".to_string(),
            Self::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            Self::Unavailable(_) => "This feature is not available yet.".to_string(),
            Self::Api { message, .. } => message.clone(),
            Self::Decode { .. } => "The server returned an unexpected response.".to_string(),
        }
    }
}

/// Cached catalog responses.
#[derive(Clone)]
enum CacheValue {
    Products(Vec<Product>),
    Farms(Vec<Farm>),
}

/// Client for the marketplace REST API.
///
/// Cheap to clone; all state lives behind an `Arc`. Catalog reads are cached
/// for 5 minutes, cart/order/auth calls are never cached.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base: Url,
    farmer_base: Url,
    cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a new marketplace API client.
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized, which only happens
    /// in broken build environments.
    #[must_use]
    pub fn new(config: &MarketApiConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        #[allow(clippy::expect_used)]
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client construction cannot fail with static config");

        Self {
            inner: Arc::new(ApiClientInner {
                client,
                base: config.base_url.clone(),
                farmer_base: config.farmer_base_url.clone(),
                cache,
            }),
        }
    }

    /// Build an absolute URL under the buyer API base.
    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner.base.join(path).map_err(|e| ApiError::Decode {
            detail: format!("invalid request path {path}: {e}"),
        })
    }

    /// Build an absolute URL under the farmer portal root.
    fn farmer_url(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .farmer_base
            .join(path)
            .map_err(|e| ApiError::Decode {
                detail: format!("invalid farmer request path {path}: {e}"),
            })
    }

    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let mut builder = self.inner.client.request(method, url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send a request and normalize the response.
    ///
    /// Always attempts to read the body; on JSON parse failure the raw text
    /// is preserved (truncated) for error display.
    async fn send(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let raw = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::METHOD_NOT_ALLOWED {
            return Err(ApiError::Unavailable(status.as_u16()));
        }
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: extract_error_message(&raw),
            });
        }

        // 204s and empty bodies are fine for mutation endpoints.
        if raw.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&raw).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %snippet(&raw),
                "failed to parse marketplace API response"
            );
            ApiError::Decode {
                detail: format!("{e} (body: {})", snippet(&raw)),
            }
        })
    }

    /// GET a path under the buyer API base.
    async fn get(&self, path: &str, token: Option<&str>) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        self.send(self.request(Method::GET, url, token)).await
    }

    /// POST a JSON body to a path under the buyer API base.
    async fn post(&self, path: &str, token: Option<&str>, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        self.send(self.request(Method::POST, url, token).json(body))
            .await
    }

    /// PATCH a JSON body to a path under the buyer API base.
    async fn patch(
        &self,
        path: &str,
        token: Option<&str>,
        body: &Value,
    ) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        self.send(self.request(Method::PATCH, url, token).json(body))
            .await
    }

    /// DELETE a path under the buyer API base.
    async fn delete(&self, path: &str, token: Option<&str>) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        self.send(self.request(Method::DELETE, url, token)).await
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

// =============================================================================
// Response-shape normalization
// =============================================================================

/// Truncate a raw response body for logs and error messages.
fn snippet(raw: &str) -> String {
    raw.chars().take(SNIPPET_LEN).collect()
}

/// Extract a human-readable error message from a non-2xx response body.
///
/// The backend uses several conventional shapes; they are checked in a fixed
/// priority order:
/// 1. `{"detail": "..."}`
/// 2. `{"error": "..."}`
/// 3. `{"message": "..."}`
/// 4. A field-error map, `{"field": ["msg", ...]}` - first field wins
/// 5. Anything else falls back to a generic message
fn extract_error_message(raw: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return "Request failed.".to_string();
    };

    for key in ["detail", "error", "message"] {
        if let Some(message) = value.get(key).and_then(Value::as_str) {
            return message.to_string();
        }
    }

    // DRF-style field errors: {"quantity": ["Must be positive."]}
    if let Some(object) = value.as_object() {
        for (field, errors) in object {
            if let Some(first) = errors
                .as_array()
                .and_then(|list| list.first())
                .and_then(Value::as_str)
            {
                return format!("{field}: {first}");
            }
        }
    }

    "Request failed.".to_string()
}

/// Resolve a product ID that may appear under several keys.
///
/// Priority order: `id`, then `product_id`, then `pk`. Accepts integers and
/// numeric strings; the result must be positive. Any other shape is a decode
/// failure surfaced to the caller, never a silent fallthrough.
pub fn extract_product_id(value: &Value) -> Result<ProductId, ApiError> {
    for key in ["id", "product_id", "pk"] {
        let Some(candidate) = value.get(key) else {
            continue;
        };
        let id = match candidate {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        return match id {
            Some(id) if id > 0 => Ok(ProductId::new(id)),
            _ => Err(ApiError::Decode {
                detail: format!("product id under '{key}' is not a positive integer"),
            }),
        };
    }
    Err(ApiError::Decode {
        detail: "no product id under any of 'id', 'product_id', 'pk'".to_string(),
    })
}

/// Resolve an access token that may appear under several keys.
///
/// Priority order: `access`, then `access_token`, then `token`. An empty
/// string is treated as absent - a non-empty access token is the sole
/// definition of "logged in".
pub fn extract_access_token(value: &Value) -> Result<String, ApiError> {
    for key in ["access", "access_token", "token"] {
        if let Some(token) = value.get(key).and_then(Value::as_str)
            && !token.is_empty()
        {
            return Ok(token.to_string());
        }
    }
    Err(ApiError::Decode {
        detail: "no access token under any of 'access', 'access_token', 'token'".to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_priority() {
        let raw = json!({"detail": "No stock.", "error": "ignored"}).to_string();
        assert_eq!(extract_error_message(&raw), "No stock.");

        let raw = json!({"error": "Bad input."}).to_string();
        assert_eq!(extract_error_message(&raw), "Bad input.");

        let raw = json!({"message": "Try later."}).to_string();
        assert_eq!(extract_error_message(&raw), "Try later.");
    }

    #[test]
    fn test_error_message_field_errors() {
        let raw = json!({"quantity": ["Must be positive."]}).to_string();
        assert_eq!(extract_error_message(&raw), "quantity: Must be positive.");
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(extract_error_message("<html>boom</html>"), "Request failed.");
        assert_eq!(extract_error_message("[1,2,3]"), "Request failed.");
    }

    #[test]
    fn test_extract_product_id_priority() {
        let v = json!({"id": 42, "product_id": 7});
        assert_eq!(extract_product_id(&v).unwrap(), ProductId::new(42));

        let v = json!({"product_id": 7});
        assert_eq!(extract_product_id(&v).unwrap(), ProductId::new(7));

        let v = json!({"pk": "13"});
        assert_eq!(extract_product_id(&v).unwrap(), ProductId::new(13));
    }

    #[test]
    fn test_extract_product_id_rejects_bad_shapes() {
        assert!(extract_product_id(&json!({})).is_err());
        assert!(extract_product_id(&json!({"id": 0})).is_err());
        assert!(extract_product_id(&json!({"id": -4})).is_err());
        assert!(extract_product_id(&json!({"id": "banana"})).is_err());
        assert!(extract_product_id(&json!({"id": null})).is_err());
    }

    #[test]
    fn test_extract_access_token_priority() {
        let v = json!({"access": "a1", "token": "t1"});
        assert_eq!(extract_access_token(&v).unwrap(), "a1");

        let v = json!({"access_token": "a2"});
        assert_eq!(extract_access_token(&v).unwrap(), "a2");

        let v = json!({"token": "t3"});
        assert_eq!(extract_access_token(&v).unwrap(), "t3");
    }

    #[test]
    fn test_extract_access_token_empty_is_absent() {
        let v = json!({"access": "", "token": "t"});
        assert_eq!(extract_access_token(&v).unwrap(), "t");
        assert!(extract_access_token(&json!({"access": ""})).is_err());
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "x".repeat(2000);
        assert_eq!(snippet(&long).len(), SNIPPET_LEN);
    }
}
