#![cfg(feature = "database")]

pub mod error;
pub mod order_repository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{error as log_error, info};

use self::error::DatabaseError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect the order store and check it answers
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, DatabaseError> {
    info!("Connecting order store: max_connections={}", max_connections);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
        .map_err(|e| {
            log_error!("Failed to connect order store: {}", e);
            DatabaseError::from_sqlx(e)
        })?;

    health_check(&pool).await?;
    info!("Order store ready");
    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DatabaseError::from_sqlx)
}
