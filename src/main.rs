use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use support_desk_api::config::{self, Environment};
use support_desk_api::database::{DatabaseManager, PgStore};
use support_desk_api::notify::{RelayPushTransport, ResendMailer};
use support_desk_api::{app, is_production, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config().clone();
    tracing::info!("Starting Support Desk API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set");
    }
    if is_production!() && config.security.internal_api_key.is_none() {
        tracing::warn!("INTERNAL_API_KEY is not set; /api/push/send will refuse every call");
    }
    if config.environment != Environment::Development && config.security.legacy_email_superadmin {
        tracing::warn!("Email-keyed superadmin lookup is enabled outside development");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool));
    let mailer = Arc::new(ResendMailer::new(&config.notify));
    let push = Arc::new(RelayPushTransport::new(config.notify.push_relay_url.clone()));
    if config.notify.resend_api_key.is_none() {
        tracing::warn!("RESEND_API_KEY is not set; guest reply emails are disabled");
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let state = AppState::new(store, mailer, push, config);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Support Desk API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
