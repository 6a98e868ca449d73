//! Shared harness for HTTP-level tests.
//!
//! Builds the real router over [`MemoryStorage`] and a mailer that records
//! confirmation links instead of sending them.

#![allow(dead_code, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use rockland_api::config::{ApiConfig, EmailConfig, JwtConfig};
use rockland_api::db::MemoryStorage;
use rockland_api::services::email::{EmailError, Mailer};
use rockland_api::services::timezones::TimeZoneCatalog;
use rockland_api::state::AppState;
use rockland_core::{Amount, Email};

pub const JWT_KEY: &str = "k9#Qm2vL8x!Tz4Rw7pYb1Nc6Hd3Jf5Gs";
pub const BASE_URL: &str = "https://orders.test";
pub const FILE_SIZE_LIMIT: usize = 1024;

/// Mailer that keeps every confirmation link it was asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    links: Mutex<Vec<String>>,
}

impl RecordingMailer {
    pub fn links(&self) -> Vec<String> {
        self.links.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email_confirmation(
        &self,
        _to: &Email,
        _first_name: &str,
        link: &str,
    ) -> Result<(), EmailError> {
        self.links.lock().unwrap().push(link.to_string());
        Ok(())
    }
}

pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://unused"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: BASE_URL.to_string(),
        jwt: JwtConfig {
            key: SecretString::from(JWT_KEY),
            issuer: "rockland-test".to_string(),
            audience: "rockland-clients".to_string(),
            expiration_minutes: 60,
        },
        email: EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 2525,
            smtp_username: "test".to_string(),
            smtp_password: SecretString::from("unused"),
            from_address: "orders@rockland.test".to_string(),
            from_name: "Rockland Orders".to_string(),
        },
        file_size_limit: FILE_SIZE_LIMIT,
        tz_database_dir: PathBuf::from("/nonexistent"),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A running app plus handles on its fakes.
pub struct TestApp {
    pub router: Router,
    pub storage: Arc<MemoryStorage>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    /// App with one shipping option (id 1, 10.00) and two products
    /// (id 1 at 50.00, id 2 at 25.00).
    pub fn new() -> Self {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .add_shipping_option("Ground", "3-5 business days", Amount::from_cents(1000))
            .unwrap();
        storage
            .add_product("Widget", "A widget", Amount::from_cents(5000), vec![0xFF, 0xD8])
            .unwrap();
        storage
            .add_product("Gadget", "A gadget", Amount::from_cents(2500), vec![])
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let time_zones = TimeZoneCatalog::from_names(["America/New_York", "Europe/London", "UTC"]);
        let state = AppState::new(test_config(), storage.clone(), mailer.clone(), time_zones);

        Self {
            router: rockland_api::app(state),
            storage,
            mailer,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> (StatusCode, String) {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_order(&self, token: &str, body: impl Into<Body>) -> (StatusCode, String) {
        self.send(
            Request::post("/create-order")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(body.into())
                .unwrap(),
        )
        .await
    }

    /// Register `username` and return its token.
    pub async fn register(&self, username: &str, email: &str) -> String {
        let (status, body) = self
            .post_json("/register", &registration(username, email))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        token_from(&body)
    }
}

pub fn registration(username: &str, email: &str) -> Value {
    json!({
        "username": username,
        "password": "Secr3t!",
        "email": email,
        "firstName": "A",
        "lastName": "B",
        "address1": "1 Main",
        "city": "X",
        "state": "NY",
        "postalCode": "10001",
        "timeZoneId": "America/New_York",
        "optInAccountNotices": true,
        "optInProductNotices": false
    })
}

pub fn token_from(body: &str) -> String {
    let value: Value = serde_json::from_str(body).unwrap();
    value["token"].as_str().unwrap().to_string()
}

/// Base64 of a minimal byte string that starts with `%PDF`.
pub fn pdf_base64() -> String {
    use base64::{Engine, engine::general_purpose::STANDARD};
    STANDARD.encode(b"%PDF-1.4\n%%EOF\n")
}

/// A valid order for product 1 x2 (100.00) with shipping option 1 (10.00).
pub fn valid_order() -> Value {
    json!({
        "shippingAddress1": "1 Main",
        "shippingCity": "X",
        "shippingState": "NY",
        "shippingPostalCode": "10001",
        "shippingOptionId": 1,
        "orderTotal": "110.00",
        "purchaseOrderPDF": pdf_base64(),
        "details": [
            {"productId": 1, "quantity": 2, "totalPrice": "100.00"}
        ]
    })
}
