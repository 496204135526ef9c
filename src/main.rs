use std::{
    fs::OpenOptions,
    sync::{Arc, Mutex},
    time::Duration,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recipe_harvest::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache, PgRecipeStore},
    services::{
        progress::spawn_sweeper, BatchRunner, GeminiClient, ItemProcessor, RecipeExtractor,
        StatusBoard, YouTubeClient,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let file_layer = match config.log_path() {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_harvest=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    let http_timeout = Duration::from_secs(config.http_timeout_secs);

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    let store = Arc::new(PgRecipeStore::new(pool));

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = Cache::connect(redis_client).await?;

    let youtube = Arc::new(YouTubeClient::new(
        cache,
        config.youtube_api_key.clone(),
        config.youtube_api_url.clone(),
        config.youtube_web_url.clone(),
        config.caption_languages.clone(),
        http_timeout,
    )?);
    let gemini = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
        http_timeout,
    )?);

    let status = StatusBoard::new();
    let processor = ItemProcessor::new(
        youtube.clone(),
        RecipeExtractor::new(gemini),
        store.clone(),
        status.clone(),
        config.comment_limit,
    );
    let runner = BatchRunner::new(
        processor,
        status.clone(),
        config.free_tier_limit,
        Duration::from_millis(config.item_interval_ms),
    );

    let sweeper = spawn_sweeper(status.clone(), Duration::from_secs(config.status_ttl_secs));

    let state = AppState::new(store, youtube, runner, status);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        model = %config.gemini_model,
        free_tier_limit = config.free_tier_limit,
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    cache_handle.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
