/// Checkout and billing portal endpoints
use crate::{
    auth::CurrentUser,
    billing::CheckoutSession,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub price_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub url: String,
}

/// Build billing routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/create-checkout-session", post(create_checkout_session))
        .route("/api/billing/portal", get(billing_portal))
}

async fn create_checkout_session(
    State(ctx): State<AppContext>,
    CurrentUser(identity): CurrentUser,
    Json(req): Json<CheckoutRequest>,
) -> AppResult<Json<CheckoutSession>> {
    let price_id = req
        .price_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Invalid or missing priceId".to_string()))?;

    let user = ctx.users.upsert_user(&identity).await?;
    let session = ctx
        .billing
        .create_checkout_session(&price_id, &user.id)
        .await?;

    Ok(Json(session))
}

async fn billing_portal(
    State(ctx): State<AppContext>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Json<PortalResponse>> {
    let user = ctx.users.upsert_user(&identity).await?;
    let customer_id = ctx.billing.get_or_create_customer_id(&user.id).await?;
    let url = ctx.billing.create_portal_link(&customer_id).await?;

    Ok(Json(PortalResponse { url }))
}
