use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::NotesError;
use crate::logic::{DeleteMaterialRequest, NotesService, UploadRequest};
use crate::store::traits::CatalogStore;

pub type AppState<S> = Arc<NotesService<S>>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Envelope shared by every admin endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converted: Option<bool>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            converted: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            converted: None,
        }
    }
}

pub type ApiError = (StatusCode, Json<ApiResponse>);

fn error_response(err: NotesError) -> ApiError {
    if err.is_unexpected() {
        log::error!("{}", err);
    }
    (err.status_code(), Json(ApiResponse::error(err.to_string())))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub path: Option<String>,
}

/// POST /api/admin/upload
/// Store an uploaded document (converting it to PDF if needed) and add it to
/// the catalog
pub async fn admin_upload<S: CatalogStore>(
    State(service): State<AppState<S>>,
    request: UploadRequest,
) -> Result<Json<ApiResponse>, ApiError> {
    let outcome = service.upload(request).await.map_err(error_response)?;
    Ok(Json(ApiResponse {
        success: true,
        message: outcome.message,
        converted: Some(outcome.converted),
    }))
}

/// GET /api/download?path=...
/// Streams the file from disk as an attachment
pub async fn download<S: CatalogStore>(
    State(service): State<AppState<S>>,
    Query(query): Query<DownloadQuery>,
    request: Request,
) -> Response {
    let not_found = || (StatusCode::NOT_FOUND, "File not found").into_response();

    let Some(path) = query.path.filter(|p| !p.is_empty()) else {
        return not_found();
    };
    let Some(file) = service.resolve_download(&path).await else {
        return not_found();
    };

    let mut response = match ServeFile::new(&file).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };
    if response.status() == StatusCode::NOT_FOUND {
        return not_found();
    }

    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().replace('"', ""))
        .unwrap_or_default();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);
    response
}

/// POST /api/admin/delete-material
/// Remove a material from the catalog and delete its file
pub async fn delete_material<S: CatalogStore>(
    State(service): State<AppState<S>>,
    body: Result<Json<DeleteMaterialRequest>, JsonRejection>,
) -> Result<Json<ApiResponse>, ApiError> {
    // An unreadable body carries none of the required fields
    let request = body.map(|Json(req)| req).unwrap_or_default();
    service
        .delete_material(request)
        .await
        .map_err(error_response)?;
    Ok(Json(ApiResponse::ok("Material deleted successfully.")))
}
