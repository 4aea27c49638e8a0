/// User accounts
///
/// Users are created on first authenticated access and keyed by the
/// identity provider's id. The balance column is owned by the ledger.
mod manager;

pub use manager::UserManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Caller identity supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub primary_email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Identity {
    /// "First Last", falling back to the email when no name is known
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            self.primary_email.clone()
        } else {
            name
        }
    }
}

/// User record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub points: i64,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(first: Option<&str>, last: Option<&str>) -> Identity {
        Identity {
            id: "user_1".to_string(),
            primary_email: "ada@example.com".to_string(),
            first_name: first.map(String::from),
            last_name: last.map(String::from),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(identity(Some("Ada"), Some("Lovelace")).display_name(), "Ada Lovelace");
        assert_eq!(identity(Some("Ada"), None).display_name(), "Ada");
        assert_eq!(identity(None, Some("  ")).display_name(), "ada@example.com");
    }
}
