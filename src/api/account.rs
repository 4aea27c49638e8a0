/// Account, eligibility, history and dashboard endpoints
use crate::{
    account::User,
    auth::CurrentUser,
    content::HistoryEntry,
    context::AppContext,
    eligibility::EligibilityDecision,
    error::AppResult,
    generation::dashboard::{load_dashboard, Dashboard},
};
use axum::{extract::State, routing::get, Json, Router};

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/eligibility", get(get_eligibility))
        .route("/api/history", get(get_history))
        .route("/api/dashboard", get(get_dashboard))
}

/// Current user, created on first access
async fn get_me(
    State(ctx): State<AppContext>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Json<User>> {
    let user = ctx.users.upsert_user(&identity).await?;
    Ok(Json(user))
}

async fn get_eligibility(
    State(ctx): State<AppContext>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Json<EligibilityDecision>> {
    let user = ctx.users.upsert_user(&identity).await?;
    let decision = ctx.gate.check_eligibility(&user.id).await?;
    Ok(Json(decision))
}

/// Generated content, most recent first. Read failures degrade to an empty list.
async fn get_history(
    State(ctx): State<AppContext>,
    CurrentUser(identity): CurrentUser,
) -> Json<Vec<HistoryEntry>> {
    let history = ctx.content.get_history(&identity.id).await.unwrap_or_else(|e| {
        tracing::warn!(user_id = %identity.id, error = %e, "failed to load history");
        Vec::new()
    });
    Json(history.into_iter().map(HistoryEntry::from).collect())
}

async fn get_dashboard(
    State(ctx): State<AppContext>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Json<Dashboard>> {
    let dashboard = load_dashboard(&ctx, &identity).await?;
    Ok(Json(dashboard))
}
