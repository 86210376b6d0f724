use std::env;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synopsis::config::Config;
use synopsis::handlers::{create_router, AppState};
use synopsis::services::{ModelCache, T5Loader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "synopsis=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting Synopsis PDF summarizer");
    tracing::info!("Max file size: {}MB", config.max_file_size_mb);
    tracing::info!("Summarization model: {} ({})", config.model_id, config.model_revision);

    let models = ModelCache::new(T5Loader::from_config(&config));

    // PORT takes precedence for hosted deployments
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(config.server_port);
    let addr = format!("{}:{}", config.server_host, port);

    let app = create_router(AppState::new(config, models));

    tracing::info!("Server listening on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
