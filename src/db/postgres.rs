use sqlx::{postgres::PgPoolOptions, PgPool};

const MAX_CONNECTIONS: u32 = 5;

/// Connects to PostgreSQL; runs and lookups share this pool
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;

    tracing::info!(max_connections = MAX_CONNECTIONS, "Database pool ready");
    Ok(pool)
}

/// Applies the embedded migrations (recipes table and its indexes)
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
