//! Subcommands that need the PostgreSQL store.

use anyhow::{Context, Result};
use domain::{AggregationService, CatalogService, Config};
use sqlx::postgres::PgPoolOptions;
use store::{PostgresSequenceCounter, PostgresStore, SsccId};
use uuid::Uuid;

/// Connects to the database named by `DATABASE_URL`.
pub async fn connect(config: &Config) -> Result<PostgresStore> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set for this command")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await
        .context("failed to connect to the database")?;
    Ok(PostgresStore::new(pool))
}

pub async fn migrate(config: &Config) -> Result<String> {
    let store = connect(config).await?;
    store.run_migrations().await?;
    tracing::info!("migrations applied");
    Ok("migrations applied".to_string())
}

/// Prints a container and everything packed in it as JSON.
///
/// `container` is either the container id or its 18-digit SSCC.
pub async fn hierarchy(config: &Config, container: &str) -> Result<String> {
    let store = connect(config).await?;
    let counter = PostgresSequenceCounter::new(store.pool().clone(), config.sscc_counter_seed);
    let service = AggregationService::with_config(store, counter, config);

    let id = match Uuid::parse_str(container) {
        Ok(uuid) => SsccId::from_uuid(uuid),
        Err(_) => service.find_by_code(container).await?.id,
    };
    let tree = service.get_aggregation_hierarchy(id).await?;
    Ok(serde_json::to_string_pretty(&tree)?)
}

/// Prints the progress counts of a work order as JSON.
pub async fn summary(config: &Config, order_number: &str) -> Result<String> {
    let store = connect(config).await?;
    let catalog = CatalogService::with_config(store, config);

    let work_order = catalog.get_work_order_by_number(order_number).await?;
    let summary = catalog.work_order_summary(work_order.id).await?;
    Ok(serde_json::to_string_pretty(&summary)?)
}
