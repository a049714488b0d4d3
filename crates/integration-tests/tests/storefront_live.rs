//! Live tests against a running storefront.
//!
//! These require:
//! - The storefront running (cargo run -p greengate-storefront)
//! - A reachable marketplace API behind it
//!
//! Run with: cargo test -p greengate-integration-tests -- --ignored

use reqwest::StatusCode;

use greengate_integration_tests::TestContext;

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoint() {
    let ctx = TestContext::new();
    let resp = ctx
        .client
        .get(ctx.url("/health"))
        .send()
        .await
        .expect("Failed to reach storefront");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_store_page_renders() {
    let ctx = TestContext::new();
    let resp = ctx
        .client
        .get(ctx.url("/"))
        .send()
        .await
        .expect("Failed to reach storefront");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Greengate Market"));
    assert!(body.contains("cart-count"));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_cart_page_starts_empty_for_guests() {
    let ctx = TestContext::new();
    let resp = ctx
        .client
        .get(ctx.url("/cart"))
        .send()
        .await
        .expect("Failed to reach storefront");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Your cart is empty"));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_guest_add_to_cart_sticks_to_the_session() {
    let ctx = TestContext::new();

    // The cookie store keeps the signed session across requests.
    let resp = ctx
        .client
        .post(ctx.url("/cart/add"))
        .form(&[("product_id", "1"), ("quantity", "2")])
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(resp.status(), StatusCode::OK);

    let body = ctx
        .client
        .get(ctx.url("/cart/count"))
        .send()
        .await
        .expect("Failed to fetch cart count")
        .text()
        .await
        .expect("Failed to read body");
    assert!(body.contains('2'), "badge should show the added quantity");
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_protected_pages_redirect_guests_to_login() {
    let ctx = TestContext::new();
    let resp = ctx
        .client
        .get(ctx.url("/orders"))
        .send()
        .await
        .expect("Failed to reach storefront");

    // reqwest follows the redirect; the login form is the landing page.
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.url().path().starts_with("/auth/login"));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_static_assets_are_served() {
    let ctx = TestContext::new();
    let resp = ctx
        .client
        .get(ctx.url("/static/css/main.css"))
        .send()
        .await
        .expect("Failed to reach storefront");

    assert_eq!(resp.status(), StatusCode::OK);
}
