/// Subscription bridge to the payment provider
///
/// Checkout sessions, subscription status, customer linkage and portal
/// links. Stripe is used in production and an in-process mock otherwise.
mod mock;
mod stripe;

pub use mock::MockBridge;
pub use stripe::StripeBridge;

use crate::{
    account::UserManager,
    config::{BillingConfig, ServerConfig},
    error::AppResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of creating a checkout session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    /// Hosted checkout page, when the provider returns one
    pub url: Option<String>,
}

/// Payment provider operations used by the service
#[async_trait]
pub trait SubscriptionBridge: Send + Sync {
    /// Start a subscription checkout for a price on behalf of a user
    async fn create_checkout_session(
        &self,
        price_id: &str,
        user_id: &str,
    ) -> AppResult<CheckoutSession>;

    /// Whether the user currently holds an active subscription
    async fn has_active_subscription(&self, user_id: &str) -> AppResult<bool>;

    /// Linked customer id, creating the customer on first use
    async fn get_or_create_customer_id(&self, user_id: &str) -> AppResult<String>;

    /// Self-service billing portal for a customer
    async fn create_portal_link(&self, customer_id: &str) -> AppResult<String>;

    /// Upgrade checkout for a customer at the default price
    async fn create_checkout_link(&self, customer_id: &str) -> AppResult<String>;
}

/// Redirect targets derived from the public base URL
#[derive(Debug, Clone)]
pub struct RedirectUrls {
    pub success: String,
    pub cancel: String,
    pub portal_return: String,
}

impl RedirectUrls {
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            success: format!("{}/generate?session_id={{CHECKOUT_SESSION_ID}}", base),
            cancel: format!("{}/pricing", base),
            portal_return: format!("{}/dashboard/course", base),
        }
    }
}

/// Build the configured bridge
pub fn from_config(
    config: &ServerConfig,
    users: Arc<UserManager>,
) -> AppResult<Arc<dyn SubscriptionBridge>> {
    let urls = RedirectUrls::new(&config.service.base_url);

    match &config.billing {
        BillingConfig::Stripe {
            api_url,
            secret_key,
            default_price_id,
        } => {
            tracing::info!("Billing provider: stripe");
            Ok(Arc::new(StripeBridge::new(
                api_url,
                secret_key,
                default_price_id.clone(),
                urls,
                users,
            )?))
        }
        BillingConfig::Mock => {
            tracing::warn!("STRIPE_SECRET_KEY not set, using the mock billing provider");
            Ok(Arc::new(MockBridge::new(users, urls)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_urls() {
        let urls = RedirectUrls::new("https://threadcraft.app/");
        assert_eq!(
            urls.success,
            "https://threadcraft.app/generate?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(urls.cancel, "https://threadcraft.app/pricing");
    }
}
