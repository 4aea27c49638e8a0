/// Stripe REST client
use crate::{
    account::UserManager,
    billing::{CheckoutSession, RedirectUrls, SubscriptionBridge},
    error::{AppError, AppResult},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Customer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Session {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortalSession {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionList {
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Stripe-backed subscription bridge
pub struct StripeBridge {
    http_client: Client,
    api_url: String,
    secret_key: String,
    default_price_id: Option<String>,
    urls: RedirectUrls,
    users: Arc<UserManager>,
}

impl StripeBridge {
    pub fn new(
        api_url: &str,
        secret_key: &str,
        default_price_id: Option<String>,
        urls: RedirectUrls,
        users: Arc<UserManager>,
    ) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            default_price_id,
            urls,
            users,
        })
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> AppResult<T> {
        self.post_form_with_key(path, form, None).await
    }

    /// POST with an optional `Idempotency-Key`; Stripe replays the first
    /// result for repeated keys
    async fn post_form_with_key<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
        idempotency_key: Option<&str>,
    ) -> AppResult<T> {
        let mut request = self
            .http_client
            .post(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.secret_key)
            .form(form);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Billing(format!("Request to {} failed: {}", path, e)))?;

        Self::decode(path, response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> AppResult<T> {
        let response = self
            .http_client
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.secret_key)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Billing(format!("Request to {} failed: {}", path, e)))?;

        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| AppError::Billing(format!("Invalid response from {}: {}", path, e)));
        }

        let body = response.json::<ErrorBody>().await.ok();
        let message = body
            .as_ref()
            .and_then(|b| b.error.message.clone())
            .unwrap_or_else(|| format!("status {}", status));
        let invalid_request = body
            .as_ref()
            .and_then(|b| b.error.kind.as_deref())
            .map_or(false, |kind| kind == "invalid_request_error");

        tracing::warn!(path, status = %status, message = %message, "Stripe request failed");

        if status == StatusCode::BAD_REQUEST && invalid_request {
            Err(AppError::Validation(format!(
                "Invalid request to Stripe API: {}",
                message
            )))
        } else {
            Err(AppError::Billing(message))
        }
    }
}

#[async_trait]
impl SubscriptionBridge for StripeBridge {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        user_id: &str,
    ) -> AppResult<CheckoutSession> {
        if price_id.trim().is_empty() {
            return Err(AppError::Validation("Invalid or missing priceId".to_string()));
        }

        tracing::info!(user_id, price_id, "creating checkout session");

        let session: Session = self
            .post_form(
                "/v1/checkout/sessions",
                &[
                    ("mode", "subscription"),
                    ("payment_method_types[0]", "card"),
                    ("line_items[0][price]", price_id),
                    ("line_items[0][quantity]", "1"),
                    ("success_url", self.urls.success.as_str()),
                    ("cancel_url", self.urls.cancel.as_str()),
                    ("client_reference_id", user_id),
                ],
            )
            .await?;

        tracing::info!(user_id, session_id = %session.id, "checkout session created");

        Ok(CheckoutSession {
            session_id: session.id,
            url: session.url,
        })
    }

    async fn has_active_subscription(&self, user_id: &str) -> AppResult<bool> {
        let user = self.users.get_user(user_id).await?;
        let Some(customer_id) = user.stripe_customer_id else {
            return Ok(false);
        };

        let subscriptions: SubscriptionList = self
            .get(
                "/v1/subscriptions",
                &[
                    ("customer", customer_id.as_str()),
                    ("status", "active"),
                    ("limit", "1"),
                ],
            )
            .await?;

        Ok(!subscriptions.data.is_empty())
    }

    async fn get_or_create_customer_id(&self, user_id: &str) -> AppResult<String> {
        let user = self.users.get_user(user_id).await?;
        if let Some(customer_id) = user.stripe_customer_id {
            return Ok(customer_id);
        }

        let idempotency_key = format!("customer-{}", user_id);
        let customer: Customer = self
            .post_form_with_key(
                "/v1/customers",
                &[
                    ("email", user.email.as_str()),
                    ("name", user.name.as_str()),
                    ("metadata[user_id]", user_id),
                ],
                Some(&idempotency_key),
            )
            .await?;

        let linked = self.users.set_customer_id(user_id, &customer.id).await?;
        tracing::info!(user_id, customer_id = %linked, "linked Stripe customer");

        Ok(linked)
    }

    async fn create_portal_link(&self, customer_id: &str) -> AppResult<String> {
        let session: PortalSession = self
            .post_form(
                "/v1/billing_portal/sessions",
                &[
                    ("customer", customer_id),
                    ("return_url", self.urls.portal_return.as_str()),
                ],
            )
            .await?;

        Ok(session.url)
    }

    async fn create_checkout_link(&self, customer_id: &str) -> AppResult<String> {
        let price_id = self
            .default_price_id
            .as_deref()
            .ok_or_else(|| AppError::Billing("No default price configured".to_string()))?;

        let session: Session = self
            .post_form(
                "/v1/checkout/sessions",
                &[
                    ("mode", "subscription"),
                    ("customer", customer_id),
                    ("line_items[0][price]", price_id),
                    ("line_items[0][quantity]", "1"),
                    ("success_url", self.urls.success.as_str()),
                    ("cancel_url", self.urls.cancel.as_str()),
                ],
            )
            .await?;

        session
            .url
            .ok_or_else(|| AppError::Billing("Checkout session has no URL".to_string()))
    }
}
