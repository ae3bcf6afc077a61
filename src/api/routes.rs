use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::api::handlers::{self, AppState};
use crate::store::traits::CatalogStore;

pub fn create_router<S: CatalogStore + 'static>(
    service: AppState<S>,
    max_upload_bytes: usize,
) -> Router {
    let site_root = service.site_root().to_path_buf();

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Admin endpoints
        .route("/api/admin/upload", post(handlers::admin_upload::<S>))
        .route(
            "/api/admin/delete-material",
            post(handlers::delete_material::<S>),
        )
        // Public downloads
        .route("/api/download", get(handlers::download::<S>))
        // Static site
        .route_service("/", ServeFile::new(site_root.join("index.html")))
        .nest_service("/pages", ServeDir::new(site_root.join("pages")))
        .nest_service("/assets", ServeDir::new(site_root.join("assets")))
        .nest_service("/data", ServeDir::new(site_root.join("data")))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(service)
}
