//! HTTP backend adapter.
//!
//! One `reqwest::Client` serves every outbound port. Response bodies are read
//! as text first so that error bodies can be classified and success bodies
//! decoded with a precise error.

use async_trait::async_trait;
use ic_01_session::{AuthResponse, SessionBackend, SignupRequest};
use ic_02_task_ledger::{ImageUpload, TaskBackend};
use ic_03_payment_flow::{PaymentBackend, VerifyPaymentRequest, VerifyPaymentResponse};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{AuthToken, BackendError, PaymentOrder, Task, TaskId, User};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{classify, ApiError};

#[derive(Serialize)]
struct CreateOrderRequest {
    amount: u64,
}

/// Backend client implementing `SessionBackend`, `TaskBackend` and
/// `PaymentBackend`.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new backend client from a validated configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("ic-api-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Http)?;

        Ok(Self {
            client,
            base_url: config.api_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn transport(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Transport(format!("request to {} timed out", self.base_url))
        } else if err.is_connect() {
            BackendError::Transport(format!("cannot connect to {}", self.base_url))
        } else {
            BackendError::Transport(err.to_string())
        }
    }

    /// Sends a request and decodes a JSON success body.
    async fn send<R: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<R, BackendError> {
        let response = request.send().await.map_err(|e| self.transport(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport(e))?;
        debug!(path, status = status.as_u16(), bytes = body.len(), "backend response");

        if !status.is_success() {
            return Err(classify(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| BackendError::Decode(format!("{path}: {e}")))
    }
}

#[async_trait]
impl SessionBackend for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError> {
        let request = self
            .client
            .post(self.url("auth/login"))
            .form(&[("username", email), ("password", password)]);
        self.send("auth/login", request).await
    }

    async fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, BackendError> {
        let builder = self.client.post(self.url("auth/signup")).json(request);
        self.send("auth/signup", builder).await
    }

    async fn fetch_profile(&self, token: &AuthToken) -> Result<User, BackendError> {
        let request = self
            .client
            .get(self.url("users/me"))
            .bearer_auth(token.expose());
        self.send("users/me", request).await
    }
}

#[async_trait]
impl TaskBackend for HttpBackend {
    async fn list_tasks(&self, token: &AuthToken) -> Result<Vec<Task>, BackendError> {
        let request = self.client.get(self.url("tasks")).bearer_auth(token.expose());
        self.send("tasks", request).await
    }

    async fn get_task(&self, token: &AuthToken, id: TaskId) -> Result<Task, BackendError> {
        let path = format!("tasks/{id}");
        let request = self.client.get(self.url(&path)).bearer_auth(token.expose());
        self.send(&path, request).await
    }

    async fn create_task(
        &self,
        token: &AuthToken,
        image: &ImageUpload,
        metadata: Option<&str>,
    ) -> Result<Task, BackendError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.content_type())
            .map_err(|e| {
                BackendError::Transport(format!(
                    "invalid content type {}: {e}",
                    image.content_type()
                ))
            })?;
        let mut form = Form::new().part("image", part);
        if let Some(metadata) = metadata {
            form = form.text("metadata", metadata.to_string());
        }

        let request = self
            .client
            .post(self.url("tasks"))
            .bearer_auth(token.expose())
            .multipart(form);
        self.send("tasks", request).await
    }
}

#[async_trait]
impl PaymentBackend for HttpBackend {
    async fn create_order(
        &self,
        token: &AuthToken,
        amount: u64,
    ) -> Result<PaymentOrder, BackendError> {
        let request = self
            .client
            .post(self.url("payments/create"))
            .bearer_auth(token.expose())
            .json(&CreateOrderRequest { amount });
        self.send("payments/create", request).await
    }

    async fn verify_payment(
        &self,
        token: &AuthToken,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, BackendError> {
        let builder = self
            .client
            .post(self.url("payments/verify"))
            .bearer_auth(token.expose())
            .json(request);
        self.send("payments/verify", builder).await
    }
}
