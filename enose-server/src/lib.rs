pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use tokio::net::TcpListener;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;

/// Bind and serve the proxy until the process is stopped
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    log::info!(
        "E-Nose proxy listening on http://{} (backend {})",
        listener.local_addr()?,
        config.backend_url
    );
    axum::serve(listener, app).await?;
    Ok(())
}
