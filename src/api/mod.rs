/// API routes and handlers
pub mod account;
pub mod billing;
pub mod generate;
pub mod health;
pub mod lesson_plans;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(account::routes())
        .merge(generate::routes())
        .merge(lesson_plans::routes())
        .merge(billing::routes())
}
