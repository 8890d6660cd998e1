mod configuration;
mod error;
mod routes;
mod state;

use anyhow::Result;
use scholar::pipeline::ResearchPipeline;
use scholar::providers::factory::{self, ProviderType};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = configuration::Settings::new()?;
    let addr = settings.server.socket_addr()?;

    let config = settings.provider.into_config();
    info!("Using {} provider", ProviderType::from(&config));
    let provider = factory::get_provider(config)?;
    let pipeline = ResearchPipeline::new(provider, settings.prompts.into_prompt_set());
    let state = state::AppState::new(pipeline);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
