use axum::http::StatusCode;

use crate::model::CatalogLevel;

/// Failures surfaced by the upload, delete and download flows.
///
/// Every variant maps to exactly one HTTP status; the handlers turn it into
/// the `{ success: false, message }` envelope.
#[derive(Debug, thiserror::Error)]
pub enum NotesError {
    #[error("Missing required fields.")]
    MissingFields,
    #[error("Invalid file name.")]
    InvalidFilename,
    #[error("{0} not found.")]
    NotFound(CatalogLevel),
    #[error("Material not found.")]
    MaterialNotFound,
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Conversion failed: {0}")]
    ConversionFailed(String),
    #[error("Catalog error: {0}")]
    Catalog(#[source] anyhow::Error),
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotesError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            NotesError::MissingFields
            | NotesError::InvalidFilename
            | NotesError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            NotesError::NotFound(_) | NotesError::MaterialNotFound => StatusCode::NOT_FOUND,
            NotesError::ConversionFailed(_) | NotesError::Catalog(_) | NotesError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True for failures that indicate a server-side problem rather than a
    /// bad request; these are logged at error level.
    pub fn is_unexpected(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<CatalogLevel> for NotesError {
    fn from(level: CatalogLevel) -> Self {
        NotesError::NotFound(level)
    }
}

pub type NotesResult<T> = Result<T, NotesError>;
