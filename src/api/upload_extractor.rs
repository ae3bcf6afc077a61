use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::StatusCode,
    Json,
};

use crate::api::handlers::{ApiError, ApiResponse};
use crate::error::NotesError;
use crate::logic::{UploadRequest, UploadedFile};

/// Axum extractor for an admin upload form
///
/// Reads the multipart fields `semester`, `branch`, `subject`, `title`,
/// `description` and the file field `pdf`. Unknown fields are ignored;
/// missing ones stay `None` and are rejected later by the upload flow.
#[async_trait]
impl<S> FromRequest<S> for UploadRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // A non-multipart body has none of the required fields
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|_| bad_request(NotesError::MissingFields.to_string()))?;

        let mut upload = UploadRequest::default();
        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "pdf" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await.map_err(malformed)?;
                    upload.file = Some(UploadedFile {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
                "semester" => upload.semester = Some(field.text().await.map_err(malformed)?),
                "branch" => upload.branch = Some(field.text().await.map_err(malformed)?),
                "subject" => upload.subject = Some(field.text().await.map_err(malformed)?),
                "title" => upload.title = Some(field.text().await.map_err(malformed)?),
                "description" => {
                    upload.description = Some(field.text().await.map_err(malformed)?)
                }
                _ => {}
            }
        }
        Ok(upload)
    }
}

fn malformed(err: impl std::fmt::Display) -> ApiError {
    bad_request(format!("Malformed upload: {}", err))
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}
