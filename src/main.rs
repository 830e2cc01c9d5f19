// src/main.rs
mod api;
mod config;
mod dispatch;
mod payload;
mod registry;
mod transport;
mod types;
mod vapid;

use std::sync::Arc;

use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api::AppState;
use config::Config;
use registry::SubscriptionRegistry;
use transport::{VapidIdentity, WebPushTransport};
use vapid::VapidKeys;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env()?;

    let keys = match &cfg.vapid_keys {
        Some((public, private)) => VapidKeys::from_base64url(public, private)?,
        None => {
            let keys = VapidKeys::generate();
            warn!(
                public_key = keys.public_key_base64url(),
                "VAPID keys not configured; generated an ephemeral pair, subscriptions will not survive a restart"
            );
            keys
        }
    };
    let vapid_public_key: Arc<str> = Arc::from(keys.public_key_base64url());

    let mut transport = WebPushTransport::new(cfg.push_ttl, cfg.push_timeout)?;
    transport.set_identity(VapidIdentity {
        keys,
        subject: cfg.vapid_subject.clone(),
    });

    let state = AppState {
        registry: Arc::new(SubscriptionRegistry::new()),
        transport: Arc::new(transport),
        vapid_public_key,
    };

    let app = api::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(cfg.request_timeout))
            .layer(CorsLayer::permissive()),
    );

    info!(subject = %cfg.vapid_subject, ttl = cfg.push_ttl, "push registry listening on {}", cfg.bind_addr);
    let listener = TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("push registry stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
