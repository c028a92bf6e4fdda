use anyhow::Result;
use pixelsmith_server::{config, http};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "pixelsmith_server=debug,pixelsmith_core=info,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    let cfg = config::load()?;
    info!(
        listen = %cfg.app.listen,
        max_upload_bytes = cfg.app.max_upload_bytes,
        default_format = %cfg.app.default_format,
        "starting pixelsmith-server"
    );

    let router = http::bootstrap(&cfg)?;
    http::serve(router, &cfg.app.listen).await
}
