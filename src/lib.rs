pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod store;
pub mod watcher;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{NotesError, NotesResult};

// Export logic types
pub use logic::{
    get_converted_filename, ConversionOutcome, DeleteMaterialRequest, DocumentConverter,
    NotesService, UploadOutcome, UploadRequest, UploadedFile,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{CatalogStore, JsonFileStore};

pub use watcher::WatcherProcess;

/// Builds the notes service and its router from configuration.
pub fn build_app(config: &config::AppConfig) -> axum::Router {
    let store = JsonFileStore::new(config.storage.catalog_file());
    let converter = DocumentConverter::new(&config.converters);
    let service = std::sync::Arc::new(NotesService::new(store, converter, &config.storage));
    api::routes::create_router(service, config.server.max_upload_bytes)
}

/// Runs the server until the listener fails; used by the integration tests
/// to serve from a scratch site root.
pub async fn run_server(
    config: config::AppConfig,
    listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    // Initialize logging with INFO level only (suppress DEBUG logs)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    axum::serve(listener, build_app(&config)).await?;

    Ok(())
}
