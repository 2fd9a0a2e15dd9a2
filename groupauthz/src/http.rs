use tracing::info;

use crate::{api::router::ApiRoutes, app_state::SharedAppState};

pub async fn setup_http_server(
    app_state: SharedAppState,
    bind_address: &str,
) -> anyhow::Result<tokio::task::JoinHandle<anyhow::Result<()>>> {
    let app = ApiRoutes::create(app_state.clone());

    println!("🚀 Server starting at {}", &bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    let handle = tokio::spawn(async move {
        info!("Starting HTTP server");
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Received shutdown signal, shutting down HTTP server gracefully");
            })
            .await?;
        info!("HTTP server is down");
        Ok::<(), anyhow::Error>(())
    });

    Ok(handle)
}
