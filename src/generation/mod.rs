/// Generation pipeline
///
/// Orchestrates eligibility, the AI call, normalization and persistence.
/// The record and the debit are written in one transaction, after the AI
/// reply has been structured, so a failure at any step costs nothing.
pub mod dashboard;

use crate::{
    account::{Identity, UserManager},
    ai::{AiClient, ImageInput},
    content::{
        insert_generated_content, insert_lesson_plan, ContentType, GeneratedContent, LessonPlan,
        LessonPlanInput, SEGMENT_SEPARATOR,
    },
    eligibility::{decide, EligibilityGate, RemainingGenerations},
    error::{AppError, AppResult},
    ledger,
    normalizer::{self, lesson_plan::LessonPlanDraft},
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use validator::Validate;

/// Largest accepted image upload
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// Social content request
#[derive(Debug, Clone, Validate)]
pub struct ContentRequest {
    pub content_type: ContentType,
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    pub image: Option<ImageInput>,
}

impl ContentRequest {
    fn check(&self) -> AppResult<()> {
        self.validate()?;

        if self.prompt.trim().is_empty() {
            return Err(AppError::Validation("Prompt cannot be empty".to_string()));
        }

        if let Some(image) = &self.image {
            if !image.mime_type.starts_with("image/") {
                return Err(AppError::Validation(format!(
                    "Unsupported image type: {}",
                    image.mime_type
                )));
            }
            if image.data.is_empty() || image.data.len() > MAX_IMAGE_BYTES {
                return Err(AppError::Validation(format!(
                    "Image must be between 1 byte and {} bytes",
                    MAX_IMAGE_BYTES
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentGenerated {
    /// Output segments in order
    pub content: Vec<String>,
    pub record: GeneratedContent,
    pub balance: i64,
    pub remaining_generations: RemainingGenerations,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanCreated {
    pub lesson_plan: LessonPlan,
    pub balance: i64,
    pub remaining_generations: RemainingGenerations,
}

/// `{success: true, ...data}` or `{success: false, error}`
#[derive(Debug, Serialize)]
pub struct GenerationOutcome<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub failure: Option<AppError>,
}

impl<T> From<AppResult<T>> for GenerationOutcome<T> {
    fn from(result: AppResult<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
                failure: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(err.public_message()),
                failure: Some(err),
            },
        }
    }
}

impl<T: Serialize> IntoResponse for GenerationOutcome<T> {
    fn into_response(self) -> Response {
        let status = self
            .failure
            .as_ref()
            .map(AppError::status_code)
            .unwrap_or(StatusCode::OK);

        if status.is_server_error() {
            if let Some(err) = &self.failure {
                tracing::error!(error = %err, "generation failed");
            }
        }

        (status, Json(self)).into_response()
    }
}

/// Generation pipeline service
pub struct GenerationPipeline {
    db: SqlitePool,
    users: Arc<UserManager>,
    gate: Arc<EligibilityGate>,
    ai: Arc<AiClient>,
}

impl GenerationPipeline {
    pub fn new(
        db: SqlitePool,
        users: Arc<UserManager>,
        gate: Arc<EligibilityGate>,
        ai: Arc<AiClient>,
    ) -> Self {
        Self {
            db,
            users,
            gate,
            ai,
        }
    }

    /// Generate a social post for the caller
    pub async fn generate_content(
        &self,
        identity: &Identity,
        request: ContentRequest,
    ) -> GenerationOutcome<ContentGenerated> {
        let result = self.try_generate_content(identity, request).await;
        if let Err(err) = &result {
            tracing::warn!(user_id = %identity.id, error = %err, "content generation failed");
        }
        result.into()
    }

    /// Create a lesson plan for the caller
    pub async fn create_lesson_plan(
        &self,
        identity: &Identity,
        input: LessonPlanInput,
    ) -> GenerationOutcome<LessonPlanCreated> {
        let result = self.try_create_lesson_plan(identity, input).await;
        if let Err(err) = &result {
            tracing::warn!(user_id = %identity.id, error = %err, "lesson plan creation failed");
        }
        result.into()
    }

    async fn try_generate_content(
        &self,
        identity: &Identity,
        request: ContentRequest,
    ) -> AppResult<ContentGenerated> {
        request.check()?;

        let user = self.users.upsert_user(identity).await?;
        let remaining = self.ensure_eligible(&user.id).await?;

        let raw = self
            .ai
            .generate(request.content_type, &request.prompt, request.image.as_ref())
            .await?;

        let segments = if request.content_type.is_segmented() {
            normalizer::split_segments(&raw)
        } else {
            vec![raw.trim().to_string()]
        };
        if segments.iter().all(|segment| segment.is_empty()) {
            return Err(AppError::EmptyResponse);
        }
        let text = segments.join(SEGMENT_SEPARATOR);

        let mut tx = self.db.begin().await?;
        let record =
            insert_generated_content(&mut tx, &user.id, &text, &request.prompt, request.content_type)
                .await?;
        let balance = self.charge(&mut tx, &user.id, remaining).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user.id,
            content_id = record.id,
            content_type = %request.content_type,
            segments = segments.len(),
            balance,
            "generated content"
        );

        Ok(ContentGenerated {
            content: segments,
            record,
            balance,
            remaining_generations: self.remaining_after(balance, remaining),
        })
    }

    async fn try_create_lesson_plan(
        &self,
        identity: &Identity,
        input: LessonPlanInput,
    ) -> AppResult<LessonPlanCreated> {
        input.validate()?;

        let user = self.users.upsert_user(identity).await?;
        let remaining = self.ensure_eligible(&user.id).await?;

        let raw = self.ai.generate_lesson_plan(&input).await?;
        let plan = normalizer::normalize::<LessonPlanDraft>(&raw)?.into_new_plan(&user.id)?;

        let mut tx = self.db.begin().await?;
        let lesson_plan = insert_lesson_plan(&mut tx, &plan).await?;
        let balance = self.charge(&mut tx, &user.id, remaining).await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %user.id,
            plan_id = %lesson_plan.id,
            sections = lesson_plan.sections.len(),
            balance,
            "created lesson plan"
        );

        Ok(LessonPlanCreated {
            lesson_plan,
            balance,
            remaining_generations: self.remaining_after(balance, remaining),
        })
    }

    async fn ensure_eligible(&self, user_id: &str) -> AppResult<RemainingGenerations> {
        let decision = self.gate.check_eligibility(user_id).await?;
        if !decision.is_eligible {
            return Err(AppError::NotEligible(decision.message));
        }
        Ok(decision.remaining_generations)
    }

    /// Debit unsubscribed users; subscribed users keep their balance
    async fn charge(
        &self,
        conn: &mut SqliteConnection,
        user_id: &str,
        remaining: RemainingGenerations,
    ) -> AppResult<i64> {
        match remaining {
            RemainingGenerations::Remaining(_) => {
                ledger::debit_in(conn, user_id, self.gate.cost()).await
            }
            RemainingGenerations::Unlimited => ledger::balance_in(conn, user_id).await,
        }
    }

    fn remaining_after(&self, balance: i64, before: RemainingGenerations) -> RemainingGenerations {
        let subscribed = before == RemainingGenerations::Unlimited;
        decide(balance, subscribed, self.gate.cost()).remaining_generations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ai::testing::FakeModel,
        billing::{MockBridge, RedirectUrls},
        config::test_config,
        content::ContentManager,
        db,
        ledger::CreditLedger,
    };

    struct Harness {
        pipeline: GenerationPipeline,
        ledger: CreditLedger,
        content: ContentManager,
        bridge: Arc<MockBridge>,
        model: Arc<FakeModel>,
        pool: SqlitePool,
    }

    async fn harness(model: FakeModel, initial_points: i64) -> Harness {
        let pool = db::memory_pool().await;
        let users = Arc::new(UserManager::new(pool.clone(), initial_points));
        let bridge = Arc::new(MockBridge::new(
            users.clone(),
            RedirectUrls::new("http://localhost:3000"),
        ));
        let gate = Arc::new(EligibilityGate::new(
            Arc::new(CreditLedger::new(pool.clone())),
            bridge.clone(),
            5,
        ));
        let model = Arc::new(model);
        let ai = Arc::new(AiClient::new(model.clone(), test_config().ai));

        Harness {
            pipeline: GenerationPipeline::new(pool.clone(), users, gate, ai),
            ledger: CreditLedger::new(pool.clone()),
            content: ContentManager::new(pool.clone()),
            bridge,
            model,
            pool,
        }
    }

    fn identity() -> Identity {
        Identity {
            id: "user_a".to_string(),
            primary_email: "a@example.com".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
        }
    }

    fn thread_request() -> ContentRequest {
        ContentRequest {
            content_type: ContentType::Twitter,
            prompt: "why rust".to_string(),
            image: None,
        }
    }

    const PLAN: &str = r#"Sure! Here is the plan:
{"topic": "Fractions", "subtopic": "Adding", "duration": "30",
 "studentLevel": "Grade 4", "objective": "Add like fractions",
 "sections": [{"title": "Intro", "content": "Pizza slices", "duration": "10 minutes"}]}
Hope that helps!"#;

    fn plan_input() -> LessonPlanInput {
        LessonPlanInput {
            topic: "Fractions".to_string(),
            subtopic: "Adding".to_string(),
            duration: 30,
            student_level: "Grade 4".to_string(),
            objective: "Add like fractions".to_string(),
        }
    }

    #[tokio::test]
    async fn test_successful_generation_debits_and_records() {
        let h = harness(FakeModel::replying("1/ Memory safety\n\n2/ Speed\n\n\n\n3/ Tooling"), 10).await;

        let outcome = h.pipeline.generate_content(&identity(), thread_request()).await;
        assert!(outcome.success, "{:?}", outcome.error);

        let data = outcome.data.unwrap();
        assert_eq!(data.content, vec!["1/ Memory safety", "2/ Speed", "3/ Tooling"]);
        assert_eq!(data.balance, 5);
        assert_eq!(data.remaining_generations, RemainingGenerations::Remaining(1));

        assert_eq!(h.ledger.get_balance("user_a").await.unwrap(), 5);
        let history = h.content.get_history("user_a").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, data.record.id);
        assert_eq!(history[0].content, "1/ Memory safety\n\n2/ Speed\n\n3/ Tooling");
    }

    #[tokio::test]
    async fn test_new_record_is_first_in_history() {
        let h = harness(FakeModel::replying("fresh post"), 10).await;
        h.pipeline
            .generate_content(
                &identity(),
                ContentRequest {
                    content_type: ContentType::LinkedIn,
                    prompt: "first".to_string(),
                    image: None,
                },
            )
            .await;

        let outcome = h.pipeline.generate_content(&identity(), thread_request()).await;
        assert!(outcome.success);

        let history = h.content.get_history("user_a").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, outcome.data.unwrap().record.id);
        assert_eq!(h.ledger.get_balance("user_a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_single_post_keeps_its_layout() {
        let h = harness(FakeModel::replying("\nHook line\n\n\n\nBody paragraph\n\n#rust\n"), 10).await;

        let outcome = h
            .pipeline
            .generate_content(
                &identity(),
                ContentRequest {
                    content_type: ContentType::LinkedIn,
                    prompt: "rust adoption".to_string(),
                    image: None,
                },
            )
            .await;
        assert!(outcome.success, "{:?}", outcome.error);

        let expected = "Hook line\n\n\n\nBody paragraph\n\n#rust";
        let data = outcome.data.unwrap();
        assert_eq!(data.content, vec![expected]);
        assert_eq!(data.record.content, expected);
    }

    #[tokio::test]
    async fn test_blank_single_post_is_empty_response() {
        let h = harness(FakeModel::replying("  \n\n  "), 10).await;

        let outcome = h
            .pipeline
            .generate_content(
                &identity(),
                ContentRequest {
                    content_type: ContentType::Instagram,
                    prompt: "sunset".to_string(),
                    image: None,
                },
            )
            .await;

        assert!(!outcome.success);
        assert!(matches!(outcome.failure, Some(AppError::EmptyResponse)));
        assert_eq!(h.ledger.get_balance("user_a").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_ineligible_user_never_reaches_the_model() {
        let h = harness(FakeModel::replying("unused"), 3).await;

        let outcome = h.pipeline.generate_content(&identity(), thread_request()).await;
        assert!(!outcome.success);
        assert!(matches!(outcome.failure, Some(AppError::NotEligible(_))));
        assert_eq!(h.model.call_count(), 0);
        assert_eq!(h.ledger.get_balance("user_a").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_ai_failure_costs_nothing() {
        let h = harness(FakeModel::failing("503 from provider"), 10).await;

        let outcome = h.pipeline.generate_content(&identity(), thread_request()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("AI provider error"));
        assert!(matches!(outcome.failure, Some(AppError::Upstream(_))));

        assert_eq!(h.ledger.get_balance("user_a").await.unwrap(), 10);
        assert!(h.content.get_history("user_a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribed_user_is_not_debited() {
        let h = harness(FakeModel::replying("caption"), 0).await;
        h.pipeline.generate_content(&identity(), thread_request()).await;
        h.bridge.subscribe("user_a").await;

        let outcome = h.pipeline.generate_content(&identity(), thread_request()).await;
        assert!(outcome.success);

        let data = outcome.data.unwrap();
        assert_eq!(data.balance, 0);
        assert_eq!(data.remaining_generations, RemainingGenerations::Unlimited);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_upsert() {
        let h = harness(FakeModel::replying("unused"), 10).await;

        let outcome = h
            .pipeline
            .generate_content(
                &identity(),
                ContentRequest {
                    content_type: ContentType::Instagram,
                    prompt: "   ".to_string(),
                    image: None,
                },
            )
            .await;

        assert!(!outcome.success);
        assert_eq!(
            outcome.into_response().status(),
            StatusCode::BAD_REQUEST
        );

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&h.pool)
            .await
            .unwrap();
        assert_eq!(users, 0);
    }

    #[tokio::test]
    async fn test_lesson_plan_is_recovered_and_stored() {
        let h = harness(FakeModel::replying(PLAN), 10).await;

        let outcome = h.pipeline.create_lesson_plan(&identity(), plan_input()).await;
        assert!(outcome.success, "{:?}", outcome.error);

        let created = outcome.data.unwrap();
        assert_eq!(created.lesson_plan.title, "Fractions");
        assert_eq!(created.lesson_plan.subject, "Adding");
        assert_eq!(created.lesson_plan.sections[0].duration, 10);
        assert_eq!(created.balance, 5);
    }

    #[tokio::test]
    async fn test_unparsable_lesson_plan_writes_nothing() {
        let h = harness(FakeModel::replying("I cannot help with that."), 10).await;

        let outcome = h.pipeline.create_lesson_plan(&identity(), plan_input()).await;
        assert!(!outcome.success);
        assert!(matches!(outcome.failure, Some(AppError::UnparsableResponse)));

        assert_eq!(h.ledger.get_balance("user_a").await.unwrap(), 10);
        let plans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lesson_plan")
            .fetch_one(&h.pool)
            .await
            .unwrap();
        assert_eq!(plans, 0);
    }

    #[test]
    fn test_outcome_serialization() {
        let ok: GenerationOutcome<LessonPlanCreated> =
            Err(AppError::InsufficientCredit { balance: 0, required: 5 }).into();
        let value = serde_json::to_value(&ok).unwrap();

        assert_eq!(value["success"], false);
        assert!(value["error"].as_str().unwrap().contains("Insufficient credit"));
        assert!(value.get("lessonPlan").is_none());
    }
}
