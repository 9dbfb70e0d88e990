use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use memory_capsule::{AppConfig, AppState, create_router};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    if config.hunyuan.secret_id.is_none() || config.hunyuan.secret_key.is_none() {
        warn!("TENCENTCLOUD_SECRET_ID / TENCENTCLOUD_SECRET_KEY not set; /upload will fail");
    }
    if config.image_api.api_key.is_none() {
        warn!("VECTOR_ENGINE_API_KEY not set; /generate_image needs a key in the request");
    }

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config)?;
    state.storage.init().await?;
    info!(static_dir = %state.storage.base_dir().display(), "storage ready");

    let shutdown = state.shutdown.clone();
    let router = create_router(state);
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Memory Capsule server started at http://{}", bind_address);

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}
