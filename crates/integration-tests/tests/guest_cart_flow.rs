//! End-to-end guest-to-authenticated cart flow against a wiremock backend:
//! shop logged out, log in, and land with the same lines in the server cart.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use greengate_core::{GuestCart, ProductId, ProductSnapshot};
use greengate_integration_tests::mock_api_client;
use greengate_storefront::services::reconcile_after_login;

fn snapshot(name: &str, price: &str) -> ProductSnapshot {
    ProductSnapshot {
        name: name.to_string(),
        price: price.parse().unwrap(),
        unit: None,
        photo_url: None,
        farm_name: None,
    }
}

#[tokio::test]
async fn test_guest_lines_reach_the_server_cart() {
    let server = MockServer::start().await;

    // Each line lands as one add; repeated adds of the same product were
    // already accumulated locally.
    Mock::given(method("POST"))
        .and(path("/api/cart/add/"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({"product_id": 1, "quantity": 3})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 11})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/cart/add/"))
        .and(body_json(json!({"product_id": 2, "quantity": 1})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 12})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"id": 11, "product_name": "Kale", "product_price": "2.50",
                 "quantity": 3, "subtotal": "7.50"},
                {"id": 12, "product_name": "Honey", "product_price": "9.00",
                 "quantity": 1, "subtotal": "9.00"}
            ],
            "subtotal": "16.50",
            "tax": "1.24",
            "total": "17.74"
        })))
        .mount(&server)
        .await;

    let mut cart = GuestCart::new();
    cart.add_item(ProductId::new(1), snapshot("Kale", "2.50"), 2);
    cart.add_item(ProductId::new(1), snapshot("Kale", "2.50"), 1);
    cart.add_item(ProductId::new(2), snapshot("Honey", "9.00"), 1);

    let api = mock_api_client(&server);
    let report = reconcile_after_login(&api, "tok", &mut cart).await;

    assert!(report.is_complete());
    assert_eq!(report.synced, 2);
    assert!(cart.is_empty(), "a completed pass empties the local cart");

    let server_cart = api.get_cart("tok").await.unwrap();
    assert_eq!(server_cart.total_quantity(), 4);
    assert_eq!(server_cart.total.to_string(), "17.74");
}

#[tokio::test]
async fn test_rejected_token_preserves_the_guest_cart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cart/add/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let mut cart = GuestCart::new();
    cart.add_item(ProductId::new(1), snapshot("Kale", "2.50"), 2);
    cart.add_item(ProductId::new(2), snapshot("Honey", "9.00"), 1);

    let api = mock_api_client(&server);
    let report = reconcile_after_login(&api, "tok", &mut cart).await;

    assert!(report.unauthorized);
    assert_eq!(report.synced, 0);
    assert_eq!(cart.len(), 2, "nothing landed, so nothing is dropped");
}
