//! Integration tests for the marketplace API client against a wiremock
//! backend, covering the response shapes the real API variants serve.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use greengate_core::OrderId;
use greengate_integration_tests::mock_api_client;

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_login_decodes_token_and_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .and(body_json(json!({"email": "kim@example.com", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "tok-123",
            "refresh": "ref-456",
            "user": {"pk": 7, "email": "kim@example.com", "role": "farmer"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = mock_api_client(&server);
    let login = api.login("kim@example.com", "hunter22").await.unwrap();

    assert_eq!(login.access_token, "tok-123");
    assert_eq!(login.refresh_token.as_deref(), Some("ref-456"));
    let user = login.user.unwrap();
    assert_eq!(user.id.as_i64(), 7);
    assert!(user.role.is_farmer());
}

#[tokio::test]
async fn test_login_rejection_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login/"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "Invalid email or password."})),
        )
        .mount(&server)
        .await;

    let api = mock_api_client(&server);
    let err = api.login("kim@example.com", "wrong").await.unwrap_err();

    assert!(!err.is_unauthorized());
    assert_eq!(err.user_message(), "Invalid email or password.");
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_product_listing_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": "3", "name": "Raw honey", "price": "9.00", "unit": "jar"},
                {"pk": 4, "name": "Sourdough", "price": "6.50"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = mock_api_client(&server);
    let first = api.list_products().await.unwrap();
    let second = api.list_products().await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first[0].id.as_i64(), 3);
    assert_eq!(first[1].id.as_i64(), 4);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_catalog_accepts_bare_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/farms/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Hillside Dairy", "location": "Derry"}
        ])))
        .mount(&server)
        .await;

    let api = mock_api_client(&server);
    let farms = api.list_farms().await.unwrap();

    assert_eq!(farms.len(), 1);
    assert_eq!(farms[0].name, "Hillside Dairy");
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_order_history_falls_back_on_older_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders/history/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders/"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"pk": 42, "status": "delivered", "total": "31.00"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let api = mock_api_client(&server);
    let orders = api.order_history("tok").await.unwrap();

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id.as_i64(), 42);
}

#[tokio::test]
async fn test_checkout_and_confirm_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/checkout/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "order_id": 55,
            "payment_intent_id": "pi_9",
            "client_secret": "cs_9"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/orders/55/confirm/"))
        .and(body_json(json!({"payment_intent_id": "pi_9"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "confirmed"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = mock_api_client(&server);
    let request = greengate_storefront::api::types::CheckoutRequest {
        delivery_address: greengate_storefront::api::types::DeliveryAddress {
            recipient: "Kim".to_string(),
            street: "1 Orchard Ln".to_string(),
            city: "Derry".to_string(),
            postal_code: "03038".to_string(),
            phone: None,
        },
        note: None,
    };
    let response = api.checkout("tok", &request).await.unwrap();
    assert_eq!(response.order_id, OrderId::new(55));
    assert_eq!(response.payment_intent_id.as_deref(), Some("pi_9"));

    api.confirm_order("tok", response.order_id, response.payment_intent_id.as_deref())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_token_is_reported_as_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cart/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .mount(&server)
        .await;

    let api = mock_api_client(&server);
    let err = api.get_cart("stale").await.unwrap_err();

    assert!(err.is_unauthorized());
}
