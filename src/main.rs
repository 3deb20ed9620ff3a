use std::time::Duration;

use clinic_portal::{
    backend::BackendClient, config::Config, models::AppState, routes, session::SessionRegistry,
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let backend = BackendClient::new(
        &cfg.backend_url,
        Duration::from_secs(cfg.backend_timeout_secs),
    )?;

    let state = AppState {
        backend,
        sessions: SessionRegistry::default(),
        push_url: cfg.push_url.clone(),
        push_timeout: Duration::from_secs(cfg.backend_timeout_secs),
        page_limit: cfg.notification_page_limit,
        store_policy: cfg.store_policy,
    };
    let sessions = state.sessions.clone();
    tokio::spawn(sweep_expired_sessions(
        sessions.clone(),
        Duration::from_secs(cfg.session_sweep_secs),
    ));

    // The portal UI is served from a different origin than this gateway.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(
        backend = %cfg.backend_url,
        push = %cfg.push_url,
        "Listening on http://{}",
        cfg.bind_addr
    );
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sessions))
        .await?;
    Ok(())
}

/// Ends sessions whose token expired without the browser signing out.
async fn sweep_expired_sessions(sessions: SessionRegistry, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let ended = sessions.sweep_expired(chrono::Utc::now());
        if ended > 0 {
            tracing::info!(ended, remaining = sessions.len(), "expired portal sessions swept");
        }
    }
}

async fn shutdown_signal(sessions: SessionRegistry) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    let ended = sessions.end_all();
    tracing::info!(ended, "shutting down; portal sessions closed");
}
