//! HTTP-level tests for the two upstream clients, against a local mock
//! server: request shape (auth, body, no client-side prices), response
//! parsing, and the rewriting of authentication failures into operator
//! hints.

use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use veda_checkout::clients::{
    CommerceApi, HttpCommerceClient, HttpGatewayClient, OrderUpdate, PaymentGateway,
};
use veda_checkout::errors::ServiceError;
use veda_checkout::services::intake::{Address, OrderRequest, RequestLineItem};
use rust_decimal_macros::dec;
use serde_json::json;

fn order_request() -> OrderRequest {
    let billing = Address {
        first_name: "Asha".into(),
        last_name: "Rao".into(),
        email: "asha@example.com".into(),
        phone: "+91-9000000000".into(),
        address: "12 Herb Lane".into(),
        city: "Pune".into(),
        postcode: "411001".into(),
        country: "IN".into(),
    };
    OrderRequest {
        shipping: billing.clone(),
        billing,
        line_items: vec![RequestLineItem {
            product_id: "P1".into(),
            quantity: 2,
            unit_price: dec!(99.75),
        }],
        note: Some("leave at the gate".into()),
    }
}

fn commerce_client(server: &MockServer) -> HttpCommerceClient {
    HttpCommerceClient::new(reqwest::Client::new(), server.uri(), "ck_test", "cs_test")
}

fn gateway_client(server: &MockServer) -> HttpGatewayClient {
    HttpGatewayClient::new(reqwest::Client::new(), server.uri(), "key_id", "key_secret")
}

#[tokio::test]
async fn create_order_posts_a_pending_unpaid_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({
            "status": "pending",
            "set_paid": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 801,
            "total": "199.50"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let order = commerce_client(&server)
        .create_order(&order_request())
        .await
        .unwrap();

    assert_eq!(order.id, 801);
    assert_eq!(order.total.as_deref(), Some("199.50"));
}

#[tokio::test]
async fn create_order_never_sends_client_side_prices() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .mount(&server)
        .await;

    commerce_client(&server)
        .create_order(&order_request())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let line = &body["line_items"][0];
    assert_eq!(line["product_id"], "P1");
    assert_eq!(line["quantity"], 2);
    assert!(line.get("unit_price").is_none());
    assert!(line.get("price").is_none());
}

#[tokio::test]
async fn create_order_tolerates_a_numeric_total() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 802,
            "total": 199.5
        })))
        .mount(&server)
        .await;

    let order = commerce_client(&server)
        .create_order(&order_request())
        .await
        .unwrap();

    assert_eq!(order.id, 802);
    assert_eq!(order.total.as_deref(), Some("199.5"));
}

#[tokio::test]
async fn commerce_auth_failure_becomes_an_operator_hint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "woocommerce_rest_authentication_error",
            "message": "Consumer key is invalid."
        })))
        .mount(&server)
        .await;

    let err = commerce_client(&server)
        .create_order(&order_request())
        .await
        .unwrap_err();

    match err {
        ServiceError::UpstreamCommerce { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("operator"));
            assert!(!message.to_lowercase().contains("consumer key"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn commerce_business_errors_keep_their_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Product #17 is out of stock"
        })))
        .mount(&server)
        .await;

    let err = commerce_client(&server)
        .create_order(&order_request())
        .await
        .unwrap_err();

    match err {
        ServiceError::UpstreamCommerce { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Product #17 is out of stock");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn update_order_puts_the_processing_status() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/orders/801"))
        .and(body_partial_json(json!({
            "status": "processing",
            "transaction_id": "pay_42"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 801 })))
        .expect(1)
        .mount(&server)
        .await;

    commerce_client(&server)
        .update_order(801, OrderUpdate::processing("pay_42"))
        .await
        .unwrap();
}

#[tokio::test]
async fn update_order_failure_carries_the_upstream_message() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/orders/801"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "order is locked"
        })))
        .mount(&server)
        .await;

    let err = commerce_client(&server)
        .update_order(801, OrderUpdate::processing("pay_42"))
        .await
        .unwrap_err();

    match err {
        ServiceError::UpstreamUpdate(message) => assert!(message.contains("order is locked")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn create_payment_intent_sends_minor_units_and_receipt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({
            "amount": 19950,
            "currency": "INR",
            "receipt": "rcpt_order_801"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "order_N9sX2",
            "amount": 19950,
            "currency": "INR",
            "status": "created"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let intent = gateway_client(&server)
        .create_payment_intent(19950, "INR", "rcpt_order_801")
        .await
        .unwrap();

    assert_eq!(intent.id, "order_N9sX2");
}

#[tokio::test]
async fn gateway_errors_surface_the_error_description() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": "BAD_REQUEST_ERROR",
                "description": "amount exceeds maximum amount allowed"
            }
        })))
        .mount(&server)
        .await;

    let err = gateway_client(&server)
        .create_payment_intent(10_000_000_000, "INR", "rcpt_order_9")
        .await
        .unwrap_err();

    match err {
        ServiceError::UpstreamPayment { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("exceeds maximum"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn gateway_auth_failure_becomes_an_operator_hint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "code": "BAD_REQUEST_ERROR",
                "description": "Authentication failed"
            }
        })))
        .mount(&server)
        .await;

    let err = gateway_client(&server)
        .create_payment_intent(19950, "INR", "rcpt_order_801")
        .await
        .unwrap_err();

    match err {
        ServiceError::UpstreamPayment { message, .. } => {
            assert!(message.contains("operator"));
            assert!(!message.contains("Authentication failed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
