use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;
    pool.close().await;

    output_success(&output_format, "Migrations applied", None)
}
