mod config;

use clap::Parser as _;
use config::Config;
use switchyard::{
    AppState, build_metrics_layer_and_handle, build_metrics_router, build_router,
    chat::ChatBackend, summarizer::SummarizerHub,
};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

#[tokio::main]
#[instrument]
pub async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse().validate()?;
    info!("Starting model gateway with config: {:?}", config);

    let chat = ChatBackend::builder()
        .base_url(config.chat_base_url.clone())
        .api_key(config.chat_api_key.clone())
        .build();
    let summarizer = SummarizerHub::builder()
        .base_url(config.hub_base_url.clone())
        .build();

    let app_state = AppState::new(chat, summarizer);
    let mut router = build_router(app_state);

    if config.metrics {
        let (prometheus_layer, handle) =
            build_metrics_layer_and_handle(config.metrics_prefix.clone());
        router = router.layer(prometheus_layer);

        let metrics_router = build_metrics_router(handle);
        let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
        let metrics_listener = TcpListener::bind(&metrics_addr).await?;
        info!("Metrics server listening on {}", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, metrics_router).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Model gateway listening on {}", bind_addr);

    axum::serve(listener, router).await?;

    Ok(())
}
