/// Application context and dependency injection
use crate::{
    account::UserManager,
    ai::{
        gemini::{GeminiModel, GenerativeModel},
        AiClient,
    },
    billing::{self, SubscriptionBridge},
    config::ServerConfig,
    content::ContentManager,
    db,
    eligibility::EligibilityGate,
    error::AppResult,
    generation::GenerationPipeline,
    ledger::CreditLedger,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub users: Arc<UserManager>,
    pub content: Arc<ContentManager>,
    // Payment provider
    pub billing: Arc<dyn SubscriptionBridge>,
    pub gate: Arc<EligibilityGate>,
    pub pipeline: Arc<GenerationPipeline>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        let db = db::create_pool(
            &config.storage.database,
            db::DatabaseOptions {
                max_connections: config.storage.max_connections,
            },
        )
        .await?;

        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let model = Arc::new(GeminiModel::new(
            &config.ai.api_url,
            &config.ai.api_key,
            config.ai.timeout_secs,
        )?);

        let users = Arc::new(UserManager::new(db.clone(), config.credits.initial_points));
        let billing = billing::from_config(&config, users.clone())?;

        Ok(Self::assemble(config, db, model, billing, users))
    }

    /// Build a context around injected collaborators
    pub fn with_collaborators(
        config: ServerConfig,
        db: SqlitePool,
        model: Arc<dyn GenerativeModel>,
        billing: Arc<dyn SubscriptionBridge>,
    ) -> Self {
        let users = Arc::new(UserManager::new(db.clone(), config.credits.initial_points));
        Self::assemble(config, db, model, billing, users)
    }

    fn assemble(
        config: ServerConfig,
        db: SqlitePool,
        model: Arc<dyn GenerativeModel>,
        billing: Arc<dyn SubscriptionBridge>,
        users: Arc<UserManager>,
    ) -> Self {
        let content = Arc::new(ContentManager::new(db.clone()));
        let gate = Arc::new(EligibilityGate::new(
            Arc::new(CreditLedger::new(db.clone())),
            billing.clone(),
            config.credits.cost_per_generation,
        ));
        let ai = Arc::new(AiClient::new(model, config.ai.clone()));
        let pipeline = Arc::new(GenerationPipeline::new(
            db.clone(),
            users.clone(),
            gate.clone(),
            ai,
        ));

        Self {
            config: Arc::new(config),
            db,
            users,
            content,
            billing,
            gate,
            pipeline,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
