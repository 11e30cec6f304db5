use std::sync::Arc;

use anyhow::Context;

use gatekeeper_api::audit::TracingOutcomeSink;
use gatekeeper_api::config::AppConfig;
use gatekeeper_auth::StaticIdentityLookup;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    gatekeeper_observability::init(&config.log_filter);

    let lookup = match &config.identities_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read identities from {}", path.display()))?;
            StaticIdentityLookup::from_json(&raw)
                .with_context(|| format!("invalid identities file {}", path.display()))?
        }
        None => {
            tracing::warn!("GATEKEEPER_IDENTITIES_FILE not set; every token subject will be unknown");
            StaticIdentityLookup::new()
        }
    };
    tracing::info!(identities = lookup.len(), "identity lookup loaded");

    let app = gatekeeper_api::app::build_app(
        &config.security,
        Arc::new(lookup),
        Arc::new(TracingOutcomeSink),
    )
    .context("refusing to start with invalid security configuration")?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
