/// Configuration management for ThreadCraft
use crate::{
    ai::gemini::{HarmBlockThreshold, HarmCategory, SafetySetting},
    error::{AppError, AppResult},
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
    pub ai: AiConfig,
    pub billing: BillingConfig,
    pub credits: CreditConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Public URL of the web front end, used for checkout and portal redirects
    pub base_url: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub max_connections: u32,
}

/// Identity provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Shared secret used to verify the identity provider's session tokens
    pub jwt_secret: String,
}

/// Generative AI configuration, passed through unchanged to the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub api_url: String,
    pub api_key: String,
    /// Model used for social content
    pub content_model: String,
    /// Model used for lesson plans
    pub lesson_plan_model: String,
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
    pub safety_settings: Vec<SafetySetting>,
    /// HTTP timeout in seconds, 0 disables it
    pub timeout_secs: u64,
}

/// Payment provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum BillingConfig {
    Stripe {
        api_url: String,
        secret_key: String,
        /// Price used for the dashboard checkout link
        default_price_id: Option<String>,
    },
    Mock,
}

/// Points configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditConfig {
    pub cost_per_generation: i64,
    pub initial_points: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("THREADCRAFT_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("THREADCRAFT_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Config("Invalid port number".to_string()))?;
        let base_url = env::var("THREADCRAFT_BASE_URL")
            .or_else(|_| env::var("BASE_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let database = env::var("THREADCRAFT_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/threadcraft.sqlite"));
        let max_connections = env::var("THREADCRAFT_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let jwt_secret = env::var("THREADCRAFT_JWT_SECRET")
            .map_err(|_| AppError::Config("THREADCRAFT_JWT_SECRET required".to_string()))?;

        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| AppError::Config("GEMINI_API_KEY required".to_string()))?;
        let safety_threshold = match env::var("GEMINI_SAFETY_THRESHOLD") {
            Ok(value) => value.parse().map_err(AppError::Config)?,
            Err(_) => HarmBlockThreshold::BlockMediumAndAbove,
        };

        let ai = AiConfig {
            api_url: env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| crate::ai::gemini::API_URL.to_string()),
            api_key,
            content_model: env::var("GEMINI_CONTENT_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-pro".to_string()),
            lesson_plan_model: env::var("GEMINI_LESSON_PLAN_MODEL")
                .unwrap_or_else(|_| "gemini-pro".to_string()),
            temperature: env::var("GEMINI_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.7),
            top_k: env::var("GEMINI_TOP_K")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(40),
            top_p: env::var("GEMINI_TOP_P")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.95),
            max_output_tokens: env::var("GEMINI_MAX_OUTPUT_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4096),
            safety_settings: vec![SafetySetting {
                category: HarmCategory::DangerousContent,
                threshold: safety_threshold,
            }],
            timeout_secs: env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        };

        let billing = if let Ok(secret_key) = env::var("STRIPE_SECRET_KEY") {
            BillingConfig::Stripe {
                api_url: env::var("STRIPE_API_URL")
                    .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
                secret_key,
                default_price_id: env::var("STRIPE_DEFAULT_PRICE_ID").ok(),
            }
        } else {
            BillingConfig::Mock
        };

        let cost_per_generation = env::var("THREADCRAFT_POINTS_PER_GENERATION")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| AppError::Config("Invalid THREADCRAFT_POINTS_PER_GENERATION".to_string()))?;
        let initial_points = env::var("THREADCRAFT_INITIAL_POINTS")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .map_err(|_| AppError::Config("Invalid THREADCRAFT_INITIAL_POINTS".to_string()))?;

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("THREADCRAFT_LOG_JSON")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                base_url,
            },
            storage: StorageConfig {
                database,
                max_connections,
            },
            identity: IdentityConfig { jwt_secret },
            ai,
            billing,
            credits: CreditConfig {
                cost_per_generation,
                initial_points,
            },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Config("Hostname cannot be empty".to_string()));
        }

        if self.identity.jwt_secret.len() < 32 {
            return Err(AppError::Config(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.credits.cost_per_generation <= 0 {
            return Err(AppError::Config(
                "Points per generation must be positive".to_string(),
            ));
        }

        if self.credits.initial_points < 0 {
            return Err(AppError::Config(
                "Initial points cannot be negative".to_string(),
            ));
        }

        if self.ai.api_key.trim().is_empty() {
            return Err(AppError::Config("Gemini API key cannot be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "http://localhost:3000".to_string(),
        },
        storage: StorageConfig {
            database: PathBuf::from(":memory:"),
            max_connections: 1,
        },
        identity: IdentityConfig {
            jwt_secret: "test-secret-key-for-testing-only-000".to_string(),
        },
        ai: AiConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            api_key: "test-key".to_string(),
            content_model: "gemini-1.5-pro".to_string(),
            lesson_plan_model: "gemini-pro".to_string(),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 4096,
            safety_settings: vec![SafetySetting {
                category: HarmCategory::DangerousContent,
                threshold: HarmBlockThreshold::BlockMediumAndAbove,
            }],
            timeout_secs: 0,
        },
        billing: BillingConfig::Mock,
        credits: CreditConfig {
            cost_per_generation: 5,
            initial_points: 50,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            json: false,
        },
    }
}
