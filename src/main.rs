use std::sync::Arc;

use tracing::info;

use cadence::engine::{Engine, InMemoryProfileStore, InMemorySessionStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("CADENCE_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    cadence::observability::init(metrics_port);

    let port = std::env::var("CADENCE_PORT").unwrap_or_else(|_| "8080".into());
    let bind = std::env::var("CADENCE_BIND").unwrap_or_else(|_| "0.0.0.0".into());

    // Reference stores; swap for real store implementations behind the same
    // traits without touching the engine.
    let profiles = Arc::new(InMemoryProfileStore::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let engine = Arc::new(Engine::new(profiles, sessions));
    let app = cadence::http::router(engine);

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("cadence listening on {addr}");
    info!("  metrics: {}", metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, drain in-flight requests
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
        info!("shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("cadence stopped");
    Ok(())
}
