//! todo-api バイナリのエントリポイント
//! ストアへの接続が確立してから HTTP サーバを起動します。

use anyhow::Context;
use infrastructure::{DynamoDbClient, DynamoDbTodoStore, TodoService};
use shared::{init_tracing, Config};
use std::net::SocketAddr;
use std::sync::Arc;
use todo_api::{app, cors_layer, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing().map_err(|e| anyhow::anyhow!("failed to initialise tracing: {e}"))?;

    let config = Config::from_env().context("invalid configuration")?;
    info!(environment = %config.environment, port = config.port, "Starting todo-api");

    // 接続できなければリクエストを受け付けずに終了する
    let db = match DynamoDbClient::connect(&config).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to initialise the store connection");
            return Err(e).context("store connection failed at startup");
        }
    };

    let service = TodoService::new(Arc::new(DynamoDbTodoStore::new(db)));
    let router = app(AppState::new(service)).layer(
        cors_layer(&config.cors_allowed_origin).context("invalid CORS_ALLOWED_ORIGIN")?,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server is running");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
