use axum::serve;
use notes_catalog::build_app;
use notes_catalog::config::AppConfig;
use notes_catalog::watcher::WatcherProcess;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Notes catalog server");

    // Load configuration
    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{}, catalog={}",
        config.server.host,
        config.server.port,
        config.storage.catalog_file().display()
    );

    let watcher = WatcherProcess::new(config.watcher.clone());
    if config.watcher.enabled {
        watcher.start();
    }

    let result = run_server(build_app(&config), &config).await;

    watcher.stop().await;
    result
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Notes server running on http://{}", bind_address);

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down...");
}
