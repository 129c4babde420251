#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use veda_checkout::{
    clients::{CommerceApi, CreatedOrder, OrderUpdate, PaymentGateway, PaymentIntent},
    config::AppConfig,
    errors::ServiceError,
    events::{self, EventSender},
    services::cart::AddLineInput,
    services::intake::OrderRequest,
    AppState,
};

pub const TEST_GATEWAY_SECRET: &str = "test_gateway_secret_0123456789";
pub const TEST_ORDER_ID: i64 = 801;
pub const TEST_INTENT_ID: &str = "intent_test_1";

/// Commerce system double. Returns a fixed order id with a configurable
/// total, counts calls, and records the last status update it received.
pub struct MockCommerce {
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    /// Total quoted by the "commerce system" on order creation.
    pub total: Mutex<Option<String>>,
    /// When set, `create_order` fails with this upstream status/message.
    pub create_failure: Mutex<Option<(u16, String)>>,
    /// When set, `update_order` fails with this message.
    pub update_failure: Mutex<Option<String>>,
    pub last_update: Mutex<Option<(i64, OrderUpdate)>>,
}

impl MockCommerce {
    pub fn quoting(total: &str) -> Arc<Self> {
        Arc::new(Self {
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            total: Mutex::new(Some(total.to_string())),
            create_failure: Mutex::new(None),
            update_failure: Mutex::new(None),
            last_update: Mutex::new(None),
        })
    }

    pub fn with_total(total: Option<&str>) -> Arc<Self> {
        let mock = Self::quoting("0");
        *mock.total.lock().unwrap() = total.map(str::to_string);
        mock
    }

    pub fn failing_create(status: u16, message: &str) -> Arc<Self> {
        let mock = Self::quoting("199.50");
        *mock.create_failure.lock().unwrap() = Some((status, message.to_string()));
        mock
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommerceApi for MockCommerce {
    async fn create_order(&self, _request: &OrderRequest) -> Result<CreatedOrder, ServiceError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((status, message)) = self.create_failure.lock().unwrap().clone() {
            return Err(ServiceError::UpstreamCommerce { status, message });
        }
        Ok(CreatedOrder {
            id: TEST_ORDER_ID,
            total: self.total.lock().unwrap().clone(),
        })
    }

    async fn update_order(&self, order_id: i64, update: OrderUpdate) -> Result<(), ServiceError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.update_failure.lock().unwrap().clone() {
            return Err(ServiceError::UpstreamUpdate(message));
        }
        *self.last_update.lock().unwrap() = Some((order_id, update));
        Ok(())
    }
}

/// Payment gateway double. Counts calls and records the last intent request.
pub struct MockGateway {
    pub calls: AtomicUsize,
    /// When set, `create_payment_intent` fails with this status/message.
    pub failure: Mutex<Option<(u16, String)>>,
    pub last_intent: Mutex<Option<(i64, String, String)>>,
}

impl MockGateway {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
            last_intent: Mutex::new(None),
        })
    }

    pub fn failing(status: u16, message: &str) -> Arc<Self> {
        let mock = Self::succeeding();
        *mock.failure.lock().unwrap() = Some((status, message.to_string()));
        mock
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((status, message)) = self.failure.lock().unwrap().clone() {
            return Err(ServiceError::UpstreamPayment { status, message });
        }
        *self.last_intent.lock().unwrap() = Some((
            amount_minor_units,
            currency.to_string(),
            receipt.to_string(),
        ));
        Ok(PaymentIntent {
            id: TEST_INTENT_ID.to_string(),
        })
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        environment: "test".into(),
        log_level: "debug".into(),
        log_json: false,
        commerce_base_url: "http://commerce.invalid".into(),
        commerce_consumer_key: "ck_test".into(),
        commerce_consumer_secret: "cs_test".into(),
        gateway_base_url: "http://gateway.invalid".into(),
        gateway_key_id: "key_test_id".into(),
        gateway_key_secret: TEST_GATEWAY_SECRET.into(),
        currency: "INR".into(),
        minimum_charge_minor_units: 100,
        upstream_timeout_secs: 2,
        event_channel_capacity: 64,
        session_ttl_secs: 3600,
        notification_webhook_url: None,
        cors_allowed_origins: None,
        cors_allow_any_origin: true,
    }
}

/// In-process application harness over mock upstream clients.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub commerce: Arc<MockCommerce>,
    pub gateway: Arc<MockGateway>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub fn new(commerce: Arc<MockCommerce>, gateway: Arc<MockGateway>) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let event_task = tokio::spawn(events::process_events(rx));

        let state = veda_checkout::build_state(
            test_config(),
            commerce.clone(),
            gateway.clone(),
            EventSender::new(tx),
        );
        let router = veda_checkout::app(state.clone());

        Self {
            router,
            state,
            commerce,
            gateway,
            _event_task: event_task,
        }
    }

    /// Harness with a commerce system quoting `199.50` and a healthy gateway.
    pub fn happy() -> Self {
        Self::new(MockCommerce::quoting("199.50"), MockGateway::succeeding())
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response")
    }

    /// Seeds one cart line directly through the store.
    pub fn seed_cart_line(&self, session_id: &str, product_id: &str, price: Decimal, quantity: i32) {
        self.state.cart_store.add_line(
            session_id,
            AddLineInput {
                product_id: product_id.to_string(),
                product_name: format!("Product {}", product_id),
                unit_price: price,
                quantity,
                image_ref: None,
            },
        );
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// A checkout payload with a fully filled billing address.
pub fn checkout_payload(session_id: &str) -> Value {
    serde_json::json!({
        "session_id": session_id,
        "billing": {
            "first_name": "Asha",
            "last_name": "Rao",
            "email": "asha@example.com",
            "phone": "+91-9000000000",
            "address": "12 Herb Lane",
            "city": "Pune",
            "postcode": "411001",
            "country": "IN"
        }
    })
}
