/// Lesson plan endpoints
use crate::{
    auth::CurrentUser,
    content::{LessonPlan, LessonPlanInput},
    context::AppContext,
    error::AppResult,
    generation::{GenerationOutcome, LessonPlanCreated},
};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

/// Build lesson plan routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/lesson-plans",
            get(list_lesson_plans).post(create_lesson_plan),
        )
        .route("/api/lesson-plans/:id", get(get_lesson_plan))
}

async fn create_lesson_plan(
    State(ctx): State<AppContext>,
    CurrentUser(identity): CurrentUser,
    Json(input): Json<LessonPlanInput>,
) -> GenerationOutcome<LessonPlanCreated> {
    tracing::info!(user_id = %identity.id, topic = %input.topic, "create_lesson_plan");
    ctx.pipeline.create_lesson_plan(&identity, input).await
}

async fn list_lesson_plans(
    State(ctx): State<AppContext>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Json<Vec<LessonPlan>>> {
    let plans = ctx.content.list_lesson_plans(&identity.id).await?;
    Ok(Json(plans))
}

async fn get_lesson_plan(
    State(ctx): State<AppContext>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<LessonPlan>> {
    let plan = ctx.content.get_lesson_plan(&identity.id, &id).await?;
    Ok(Json(plan))
}
