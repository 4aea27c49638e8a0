/// In-process billing provider for development and tests
use crate::{
    account::UserManager,
    billing::{CheckoutSession, RedirectUrls, SubscriptionBridge},
    error::{AppError, AppResult},
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Mock bridge; subscriptions are granted explicitly with [`MockBridge::subscribe`]
pub struct MockBridge {
    users: Arc<UserManager>,
    urls: RedirectUrls,
    subscribed: RwLock<HashSet<String>>,
}

impl MockBridge {
    pub fn new(users: Arc<UserManager>, urls: RedirectUrls) -> Self {
        Self {
            users,
            urls,
            subscribed: RwLock::new(HashSet::new()),
        }
    }

    /// Mark a user as holding an active subscription
    pub async fn subscribe(&self, user_id: &str) {
        self.subscribed.write().await.insert(user_id.to_string());
    }
}

#[async_trait]
impl SubscriptionBridge for MockBridge {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        user_id: &str,
    ) -> AppResult<CheckoutSession> {
        if price_id.trim().is_empty() {
            return Err(AppError::Validation("Invalid or missing priceId".to_string()));
        }

        let session_id = format!("cs_mock_{}", Uuid::new_v4());
        let url = self
            .urls
            .success
            .replace("{CHECKOUT_SESSION_ID}", &session_id);

        tracing::info!(user_id, price_id, session_id = %session_id, "Mock checkout session created");

        Ok(CheckoutSession {
            session_id,
            url: Some(url),
        })
    }

    async fn has_active_subscription(&self, user_id: &str) -> AppResult<bool> {
        Ok(self.subscribed.read().await.contains(user_id))
    }

    async fn get_or_create_customer_id(&self, user_id: &str) -> AppResult<String> {
        let user = self.users.get_user(user_id).await?;
        if let Some(customer_id) = user.stripe_customer_id {
            return Ok(customer_id);
        }

        let customer_id = format!("cus_mock_{}", Uuid::new_v4());
        self.users.set_customer_id(user_id, &customer_id).await
    }

    async fn create_portal_link(&self, _customer_id: &str) -> AppResult<String> {
        Ok(self.urls.portal_return.clone())
    }

    async fn create_checkout_link(&self, customer_id: &str) -> AppResult<String> {
        Ok(self
            .urls
            .success
            .replace("{CHECKOUT_SESSION_ID}", &format!("cs_mock_{}", customer_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{account::Identity, db};

    async fn bridge() -> MockBridge {
        let users = Arc::new(UserManager::new(db::memory_pool().await, 50));
        users
            .upsert_user(&Identity {
                id: "user_a".to_string(),
                primary_email: "a@example.com".to_string(),
                first_name: None,
                last_name: None,
            })
            .await
            .unwrap();
        MockBridge::new(users, RedirectUrls::new("http://localhost:3000"))
    }

    #[tokio::test]
    async fn test_customer_id_is_stable() {
        let bridge = bridge().await;

        let first = bridge.get_or_create_customer_id("user_a").await.unwrap();
        let second = bridge.get_or_create_customer_id("user_a").await.unwrap();
        assert!(first.starts_with("cus_mock_"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_customer() {
        let bridge = bridge().await;

        let (first, second) = tokio::join!(
            bridge.get_or_create_customer_id("user_a"),
            bridge.get_or_create_customer_id("user_a")
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first, second);
        let stored = bridge.users.get_user("user_a").await.unwrap();
        assert_eq!(stored.stripe_customer_id.as_deref(), Some(first.as_str()));
    }

    #[tokio::test]
    async fn test_subscription_and_checkout() {
        let bridge = bridge().await;
        assert!(!bridge.has_active_subscription("user_a").await.unwrap());

        bridge.subscribe("user_a").await;
        assert!(bridge.has_active_subscription("user_a").await.unwrap());

        let session = bridge
            .create_checkout_session("price_123", "user_a")
            .await
            .unwrap();
        assert!(session
            .url
            .unwrap()
            .starts_with("http://localhost:3000/generate?session_id=cs_mock_"));

        assert!(matches!(
            bridge.create_checkout_session(" ", "user_a").await,
            Err(AppError::Validation(_))
        ));
    }
}
