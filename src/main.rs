/// ThreadCraft - AI content generation service
///
/// Generates social posts and lesson plans through a generative AI
/// provider, charging points from a per-user ledger, with subscription
/// billing through a payment provider.

mod account;
mod ai;
mod api;
mod auth;
mod billing;
mod config;
mod content;
mod context;
mod db;
mod eligibility;
mod error;
mod generation;
mod ledger;
mod normalizer;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::AppResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration first so logging can honour it
    let config = ServerConfig::from_env()?;

    init_tracing(&config);
    print_banner();

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn init_tracing(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "threadcraft=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_banner() {
    println!(
        r#"
  _____ _                        _  ____            __ _
 |_   _| |__  _ __ ___  __ _  __| |/ ___|_ __ __ _ / _| |_
   | | | '_ \| '__/ _ \/ _` |/ _` | |   | '__/ _` | |_| __|
   | | | | | | | |  __/ (_| | (_| | |___| | | (_| |  _| |_
   |_| |_| |_|_|  \___|\__,_|\__,_|\____|_|  \__,_|_|  \__|

        AI content generation service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
