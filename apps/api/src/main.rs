use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use material_cell::AlertService;
use shared_config::AppConfig;
use shared_utils::clock::clinic_today;

/// Re-runs the material alert sweep every `interval`.
fn spawn_alert_sweep(config: Arc<AppConfig>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            match AlertService::new(&config).sweep(clinic_today(&config)).await {
                Ok(summary) => info!(
                    "Alert sweep done: {} deleted, {} created, {} active",
                    summary.deleted, summary.created, summary.active
                ),
                Err(e) => error!("Alert sweep failed: {}", e),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic back-office API server");

    let config = AppConfig::from_env();
    let port = config.server_port;
    let sweep_interval = config.alert_sweep_interval_secs;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = Arc::new(config);

    if sweep_interval > 0 {
        info!("Scheduling material alert sweep every {}s", sweep_interval);
        spawn_alert_sweep(state.clone(), Duration::from_secs(sweep_interval));
    }

    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
