/// Dashboard load
use crate::{
    account::{Identity, User},
    content::{HistoryEntry, LessonPlan},
    context::AppContext,
    eligibility::{decide, EligibilityDecision},
    error::AppResult,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub user: User,
    pub subscribed: bool,
    pub eligibility: EligibilityDecision,
    pub history: Vec<HistoryEntry>,
    pub lesson_plans: Vec<LessonPlan>,
    pub portal_link: Option<String>,
    pub checkout_link: Option<String>,
}

/// Everything the dashboard page renders, in as few round trips as possible.
///
/// History and lesson plan failures degrade to empty lists, and billing
/// link failures to `None`.
pub async fn load_dashboard(ctx: &AppContext, identity: &Identity) -> AppResult<Dashboard> {
    let user = ctx.users.upsert_user(identity).await?;

    let (subscribed, history, lesson_plans) = futures::join!(
        ctx.billing.has_active_subscription(&user.id),
        ctx.content.get_history(&user.id),
        ctx.content.list_lesson_plans(&user.id),
    );
    let subscribed = subscribed?;

    let history: Vec<HistoryEntry> = history
        .map(|records| records.into_iter().map(HistoryEntry::from).collect())
        .unwrap_or_else(|e| {
            tracing::warn!(user_id = %user.id, error = %e, "failed to load history");
            Vec::new()
        });
    let lesson_plans = lesson_plans.unwrap_or_else(|e| {
        tracing::warn!(user_id = %user.id, error = %e, "failed to load lesson plans");
        Vec::new()
    });

    let eligibility = decide(user.points, subscribed, ctx.gate.cost());

    let (portal_link, checkout_link) = match ctx.billing.get_or_create_customer_id(&user.id).await {
        Ok(customer_id) => {
            let (portal, checkout) = futures::join!(
                ctx.billing.create_portal_link(&customer_id),
                ctx.billing.create_checkout_link(&customer_id),
            );
            (
                portal
                    .map_err(|e| tracing::warn!(error = %e, "failed to create portal link"))
                    .ok(),
                checkout
                    .map_err(|e| tracing::warn!(error = %e, "failed to create checkout link"))
                    .ok(),
            )
        }
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "failed to link billing customer");
            (None, None)
        }
    };

    // Customer linkage may have updated the row
    let user = ctx.users.get_user(&user.id).await.unwrap_or(user);

    Ok(Dashboard {
        user,
        subscribed,
        eligibility,
        history,
        lesson_plans,
        portal_link,
        checkout_link,
    })
}
