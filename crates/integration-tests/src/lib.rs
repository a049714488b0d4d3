//! Integration tests for Greengate Market.
//!
//! Two flavors live under `tests/`:
//!
//! - API-client tests drive [`greengate_storefront::api::ApiClient`] against
//!   a wiremock stand-in for the marketplace API. These run everywhere.
//! - Live tests drive a running storefront over HTTP and are marked
//!   `#[ignore]`; start the server first:
//!
//! ```bash
//! cargo run -p greengate-storefront
//! cargo test -p greengate-integration-tests -- --ignored
//! ```

use reqwest::Client;
use url::Url;
use wiremock::MockServer;

use greengate_storefront::api::ApiClient;
use greengate_storefront::config::MarketApiConfig;

/// Shared context for live tests against a running storefront.
pub struct TestContext {
    pub client: Client,
    pub storefront_url: String,
}

impl TestContext {
    /// Build a cookie-keeping client pointed at the storefront under test.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be constructed.
    #[must_use]
    pub fn new() -> Self {
        let storefront_url = std::env::var("GREENGATE_STOREFRONT_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            storefront_url,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// An [`ApiClient`] pointed at a wiremock marketplace API.
///
/// # Panics
///
/// Panics if the mock server URI does not parse.
#[must_use]
pub fn mock_api_client(server: &MockServer) -> ApiClient {
    let base = Url::parse(&format!("{}/api/", server.uri())).expect("mock server uri");
    let farmer = Url::parse(&format!("{}/farmer/", server.uri())).expect("mock server uri");
    ApiClient::new(&MarketApiConfig {
        base_url: base,
        farmer_base_url: farmer,
        farmer_portal_enabled: true,
    })
}
