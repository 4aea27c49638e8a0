/// Credit ledger
///
/// Integer point balance per user. Debits are a single conditional
/// update, so concurrent debits can never take the balance below zero.
use crate::error::{AppError, AppResult};
use sqlx::{SqliteConnection, SqlitePool};

/// Credit ledger service
pub struct CreditLedger {
    db: SqlitePool,
}

impl CreditLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Current balance of a user
    pub async fn get_balance(&self, user_id: &str) -> AppResult<i64> {
        let mut conn = self.db.acquire().await?;
        balance_in(&mut conn, user_id).await
    }

    /// Deduct points, returning the new balance
    pub async fn debit(&self, user_id: &str, amount: i64) -> AppResult<i64> {
        let mut conn = self.db.acquire().await?;
        debit_in(&mut conn, user_id, amount).await
    }

    /// Add points, returning the new balance
    pub async fn credit(&self, user_id: &str, amount: i64) -> AppResult<i64> {
        if amount < 0 {
            return Err(AppError::Validation(
                "Credit amount cannot be negative".to_string(),
            ));
        }

        let balance: i64 = sqlx::query_scalar(
            "UPDATE users SET points = points + ?1 WHERE id = ?2 RETURNING points",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        tracing::info!(user_id, amount, balance, "credited points");
        Ok(balance)
    }
}

/// Balance read on a caller-owned connection or transaction
pub async fn balance_in(conn: &mut SqliteConnection, user_id: &str) -> AppResult<i64> {
    sqlx::query_scalar("SELECT points FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

/// Deduct points on a caller-owned connection or transaction.
///
/// The balance is left unchanged when it is lower than `amount`.
pub async fn debit_in(conn: &mut SqliteConnection, user_id: &str, amount: i64) -> AppResult<i64> {
    if amount < 0 {
        return Err(AppError::Validation(
            "Debit amount cannot be negative".to_string(),
        ));
    }

    let updated: Option<i64> = sqlx::query_scalar(
        "UPDATE users SET points = points - ?1
         WHERE id = ?2 AND points >= ?1
         RETURNING points",
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(balance) => {
            tracing::info!(user_id, amount, balance, "debited points");
            Ok(balance)
        }
        None => {
            let balance = balance_in(conn, user_id).await?;
            tracing::info!(user_id, amount, balance, "insufficient points");
            Err(AppError::InsufficientCredit {
                balance,
                required: amount,
            })
        }
    }
}
