#![allow(dead_code)]

use invoicing_api::config::{
    InvoicingConfig, JwtConfig, StoreBackend, StoreConfig, UploadsConfig,
};
use invoicing_api::Application;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use service_core::config::{Config as CoreConfig, Environment};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    /// Cookie-holding client; carries the session after `signup`/`login`.
    pub api_client: Client,
    pub uploads_dir: Arc<TempDir>,
}

pub fn test_config(uploads_dir: &TempDir) -> InvoicingConfig {
    InvoicingConfig {
        common: CoreConfig {
            port: 0,
            environment: Environment::Development,
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
            mongodb: None,
        },
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            expires_in_days: 7,
        },
        uploads: UploadsConfig {
            local_path: uploads_dir.path().to_string_lossy().into_owned(),
            public_base_url: "/uploads".to_string(),
        },
        frontend_url: "http://localhost:3000".to_string(),
        otlp_endpoint: None,
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let uploads_dir = tempfile::tempdir().expect("Failed to create uploads dir");
        let config = test_config(&uploads_dir);

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let api_client = cookie_client();

        let address = format!("http://127.0.0.1:{}", port);
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if api_client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            api_client,
            uploads_dir: Arc::new(uploads_dir),
        }
    }

    /// Same server, separate cookie jar: a second, signed-out user.
    pub fn another_user(&self) -> TestApp {
        TestApp {
            address: self.address.clone(),
            port: self.port,
            api_client: cookie_client(),
            uploads_dir: self.uploads_dir.clone(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.api_client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.api_client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, body: &Value) -> Response {
        self.api_client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.api_client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register a fresh user; the session cookie lands in `api_client`.
    pub async fn signup(&self) -> Value {
        let email = format!("user-{}@example.com", Uuid::new_v4());
        let response = self
            .post(
                "/auth/signup",
                &json!({
                    "email": email,
                    "password": TEST_PASSWORD,
                    "firstName": "Ada",
                    "lastName": "Lovelace"
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body(response).await["data"].clone()
    }

    pub async fn create_profile(&self, extra: Value) -> Value {
        let mut payload = json!({ "name": "Acme Studio" });
        merge(&mut payload, extra);
        let response = self.post("/business-profile", &payload).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body(response).await["data"]["workspace"].clone()
    }

    /// Signed-up user with a business profile.
    pub async fn onboard(&self) -> Value {
        self.signup().await;
        self.create_profile(json!({})).await
    }

    pub async fn create_client(&self, name: &str) -> Value {
        let response = self
            .post(
                "/clients",
                &json!({ "name": name, "email": "billing@example.com" }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body(response).await["data"]["client"].clone()
    }

    pub async fn create_invoice(&self, payload: &Value) -> Value {
        let response = self.post("/invoices", payload).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body(response).await["data"]["invoice"].clone()
    }
}

fn cookie_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build HTTP client")
}

pub async fn body(response: Response) -> Value {
    response.json().await.expect("Failed to parse JSON body")
}

/// A one-item invoice payload due in 30 days.
pub fn invoice_payload(client_id: &str) -> Value {
    json!({
        "clientId": client_id,
        "dueDate": (chrono::Utc::now() + chrono::Duration::days(30)).to_rfc3339(),
        "lineItems": [
            { "description": "Design work", "quantity": 2, "rate": 50, "taxRate": 10 }
        ]
    })
}

/// Shallow-merge the keys of `extra` into `target`.
pub fn merge(target: &mut Value, extra: Value) {
    if let (Some(target), Value::Object(extra)) = (target.as_object_mut(), extra) {
        for (key, value) in extra {
            target.insert(key, value);
        }
    }
}
