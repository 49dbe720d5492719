// src/main.rs

use std::{sync::Arc, time::Duration};

use brightsteps::{
    config::{Config, RecorderSink},
    routes,
    runtime::{RunRegistry, recorder::SessionRecorder},
    state::AppState,
    store::{LocalSessionStore, SessionStore, SqlSessionStore},
};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "brightsteps.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    tracing::error!("Failed to connect to database after 5 retries: {}", e);
                    return Err(e.into());
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    let store: Arc<dyn SessionStore> = match config.recorder {
        RecorderSink::Remote => Arc::new(SqlSessionStore::new(pool.clone())),
        RecorderSink::Local => {
            tracing::info!(
                "Recording sessions to local files in {}",
                config.local_store_dir.display()
            );
            Arc::new(LocalSessionStore::new(config.local_store_dir.clone()))
        }
    };

    // Create AppState
    let runs = RunRegistry::new(SessionRecorder::new(store));
    runs.spawn_sweeper(Duration::from_secs(config.run_idle_secs));
    let state = AppState::new(pool, config.clone(), runs);

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}
