/// User manager implementation using runtime queries
use crate::{
    account::{Identity, User},
    error::{AppError, AppResult},
};
use chrono::Utc;
use sqlx::SqlitePool;

/// User manager service
pub struct UserManager {
    db: SqlitePool,
    initial_points: i64,
}

impl UserManager {
    /// Create a new user manager
    pub fn new(db: SqlitePool, initial_points: i64) -> Self {
        Self { db, initial_points }
    }

    /// Create the user if absent; an existing row is left untouched
    pub async fn upsert_user(&self, identity: &Identity) -> AppResult<User> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, name, points, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&identity.id)
        .bind(&identity.primary_email)
        .bind(identity.display_name())
        .bind(self.initial_points)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(user_id = %identity.id, points = self.initial_points, "created user");
        }

        self.get_user(&identity.id).await
    }

    /// Get a user by identity-provider id
    pub async fn get_user(&self, user_id: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, name, points, stripe_customer_id, created_at
             FROM users WHERE id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Link a payment-provider customer to the user.
    ///
    /// The first link wins: when the user already has a customer, that id is
    /// kept and returned instead of `customer_id`.
    pub async fn set_customer_id(&self, user_id: &str, customer_id: &str) -> AppResult<String> {
        let result = sqlx::query(
            "UPDATE users SET stripe_customer_id = ?1
             WHERE id = ?2 AND stripe_customer_id IS NULL",
        )
        .bind(customer_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(customer_id.to_string());
        }

        let user = self.get_user(user_id).await?;
        let linked = user.stripe_customer_id.ok_or_else(|| {
            AppError::Internal(format!("Customer link for {} was not stored", user_id))
        })?;
        tracing::warn!(
            user_id,
            kept = %linked,
            discarded = customer_id,
            "user already linked to a customer"
        );
        Ok(linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn identity() -> Identity {
        Identity {
            id: "user_2abc".to_string(),
            primary_email: "grace@example.com".to_string(),
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_with_initial_points() {
        let manager = UserManager::new(db::memory_pool().await, 50);

        let user = manager.upsert_user(&identity()).await.unwrap();
        assert_eq!(user.id, "user_2abc");
        assert_eq!(user.name, "Grace Hopper");
        assert_eq!(user.points, 50);
        assert!(user.stripe_customer_id.is_none());
    }

    #[tokio::test]
    async fn test_upsert_does_not_reset_existing_user() {
        let pool = db::memory_pool().await;
        let manager = UserManager::new(pool.clone(), 50);
        manager.upsert_user(&identity()).await.unwrap();

        sqlx::query("UPDATE users SET points = 5 WHERE id = ?1")
            .bind("user_2abc")
            .execute(&pool)
            .await
            .unwrap();

        let mut renamed = identity();
        renamed.primary_email = "other@example.com".to_string();
        let user = manager.upsert_user(&renamed).await.unwrap();

        assert_eq!(user.points, 5);
        assert_eq!(user.email, "grace@example.com");
    }

    #[tokio::test]
    async fn test_set_customer_id() {
        let manager = UserManager::new(db::memory_pool().await, 50);
        manager.upsert_user(&identity()).await.unwrap();

        let linked = manager.set_customer_id("user_2abc", "cus_123").await.unwrap();
        assert_eq!(linked, "cus_123");
        let user = manager.get_user("user_2abc").await.unwrap();
        assert_eq!(user.stripe_customer_id.as_deref(), Some("cus_123"));

        // A second link keeps the first customer
        let linked = manager.set_customer_id("user_2abc", "cus_999").await.unwrap();
        assert_eq!(linked, "cus_123");
        let user = manager.get_user("user_2abc").await.unwrap();
        assert_eq!(user.stripe_customer_id.as_deref(), Some("cus_123"));

        assert!(matches!(
            manager.set_customer_id("missing", "cus_456").await,
            Err(AppError::NotFound(_))
        ));
    }
}
