use hire_power::{AppConfig, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hire_power=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Upload directory: {}", config.storage.upload_dir.display());
    tracing::info!("  - Chat model: {}", config.openai.chat_model);
    tracing::info!("  - Embedding model: {}", config.openai.embedding_model);
    tracing::info!("  - API base: {}", config.openai.base_url);
    if config.openai.api_key.is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set; requests to the provider go out unauthenticated");
    }

    hire_power::serve(AppState::from_config(config)).await?;
    Ok(())
}
