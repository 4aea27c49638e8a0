/// Eligibility gate
///
/// Decides whether a user may generate content right now, from their
/// subscription status and remaining points.
use crate::{billing::SubscriptionBridge, error::AppResult, ledger::CreditLedger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Generations left before the balance runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "camelCase")]
pub enum RemainingGenerations {
    Unlimited,
    Remaining(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityDecision {
    pub is_eligible: bool,
    pub message: String,
    pub remaining_generations: RemainingGenerations,
}

/// Decide eligibility from a balance and subscription status
pub fn decide(balance: i64, subscribed: bool, cost: i64) -> EligibilityDecision {
    let remaining = if subscribed {
        RemainingGenerations::Unlimited
    } else if cost > 0 {
        RemainingGenerations::Remaining(balance.max(0) / cost)
    } else {
        RemainingGenerations::Unlimited
    };

    let is_eligible = subscribed || balance >= cost;

    let message = match (is_eligible, remaining) {
        (false, _) => format!(
            "You need at least {} points to generate content. Subscribe or get more points to continue.",
            cost
        ),
        (true, RemainingGenerations::Remaining(count)) => format!(
            "You have {} generation{} remaining.",
            count,
            if count == 1 { "" } else { "s" }
        ),
        (true, RemainingGenerations::Unlimited) => {
            "Your subscription includes unlimited generations.".to_string()
        }
    };

    EligibilityDecision {
        is_eligible,
        message,
        remaining_generations: remaining,
    }
}

/// Gate combining the ledger and the subscription bridge
pub struct EligibilityGate {
    ledger: Arc<CreditLedger>,
    billing: Arc<dyn SubscriptionBridge>,
    cost: i64,
}

impl EligibilityGate {
    pub fn new(ledger: Arc<CreditLedger>, billing: Arc<dyn SubscriptionBridge>, cost: i64) -> Self {
        Self {
            ledger,
            billing,
            cost,
        }
    }

    /// Points charged per generation
    pub fn cost(&self) -> i64 {
        self.cost
    }

    pub async fn check_eligibility(&self, user_id: &str) -> AppResult<EligibilityDecision> {
        let (balance, subscribed) = futures::try_join!(
            self.ledger.get_balance(user_id),
            self.billing.has_active_subscription(user_id),
        )?;

        let decision = decide(balance, subscribed, self.cost);
        tracing::debug!(
            user_id,
            balance,
            subscribed,
            eligible = decision.is_eligible,
            "checked eligibility"
        );

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::{Identity, UserManager},
        billing::{MockBridge, RedirectUrls},
        db,
    };

    #[test]
    fn test_decision_table() {
        let decision = decide(12, false, 5);
        assert!(decision.is_eligible);
        assert_eq!(decision.remaining_generations, RemainingGenerations::Remaining(2));
        assert!(decision.message.contains("2 generations"));

        let decision = decide(5, false, 5);
        assert_eq!(decision.remaining_generations, RemainingGenerations::Remaining(1));
        assert!(decision.message.contains("1 generation remaining"));

        let decision = decide(4, false, 5);
        assert!(!decision.is_eligible);
        assert_eq!(decision.remaining_generations, RemainingGenerations::Remaining(0));

        let decision = decide(0, true, 5);
        assert!(decision.is_eligible);
        assert_eq!(decision.remaining_generations, RemainingGenerations::Unlimited);
        assert!(decision.message.contains("unlimited"));
    }

    #[test]
    fn test_decision_messages_are_distinct() {
        let blocked = decide(0, false, 5).message;
        let finite = decide(10, false, 5).message;
        let unlimited = decide(10, true, 5).message;

        assert_ne!(blocked, finite);
        assert_ne!(finite, unlimited);
        assert_ne!(blocked, unlimited);
    }

    #[test]
    fn test_remaining_serialization() {
        let value = serde_json::to_value(decide(12, false, 5)).unwrap();
        assert_eq!(value["isEligible"], true);
        assert_eq!(
            value["remainingGenerations"],
            serde_json::json!({"kind": "remaining", "count": 2})
        );
    }

    #[tokio::test]
    async fn test_gate_uses_ledger_and_billing() {
        let pool = db::memory_pool().await;
        let users = Arc::new(UserManager::new(pool.clone(), 3));
        users
            .upsert_user(&Identity {
                id: "user_a".to_string(),
                primary_email: "a@example.com".to_string(),
                first_name: None,
                last_name: None,
            })
            .await
            .unwrap();

        let bridge = Arc::new(MockBridge::new(
            users,
            RedirectUrls::new("http://localhost:3000"),
        ));
        let gate = EligibilityGate::new(Arc::new(CreditLedger::new(pool)), bridge.clone(), 5);

        assert!(!gate.check_eligibility("user_a").await.unwrap().is_eligible);

        bridge.subscribe("user_a").await;
        let decision = gate.check_eligibility("user_a").await.unwrap();
        assert!(decision.is_eligible);
        assert_eq!(decision.remaining_generations, RemainingGenerations::Unlimited);
    }
}
