use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::StorageConfig;
use crate::error::{NotesError, NotesResult};
use crate::logic::converter::{dotted_extension, get_converted_filename, DocumentConverter};
use crate::logic::paths::{resolve_site_path, sanitize_filename, MaterialLocation};
use crate::model::{deserialize_optional_id, CatalogDocument, Material};
use crate::store::traits::CatalogStore;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Fields of an admin upload as received; any of them may be missing.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub semester: Option<String>,
    pub branch: Option<String>,
    pub subject: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub file: Option<UploadedFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteMaterialRequest {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub semester: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub branch: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub subject: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub message: String,
    pub converted: bool,
    /// The material was already in the catalog; only the file was replaced
    pub duplicate: bool,
    pub material: Option<Material>,
}

struct ValidUpload {
    semester: String,
    branch: String,
    subject: String,
    title: String,
    description: String,
    file: UploadedFile,
}

impl UploadRequest {
    fn validate(self) -> NotesResult<ValidUpload> {
        let file = self
            .file
            .filter(|f| !f.filename.is_empty())
            .ok_or(NotesError::MissingFields)?;
        Ok(ValidUpload {
            semester: required(self.semester)?,
            branch: required(self.branch)?,
            subject: required(self.subject)?,
            title: required(self.title)?,
            description: required(self.description)?,
            file,
        })
    }
}

fn required(value: Option<String>) -> NotesResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(NotesError::MissingFields)
}

/// A per-upload scratch directory.
///
/// [`StagingArea::remove`] cleans it up on the normal path. `Drop` only
/// catches what is left when the upload future is cancelled mid-flight.
struct StagingArea {
    dir: PathBuf,
    removed: bool,
}

impl StagingArea {
    async fn create(root: &Path) -> NotesResult<Self> {
        let dir = root.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            removed: false,
        })
    }

    fn path(&self) -> &Path {
        &self.dir
    }

    async fn remove(mut self) {
        self.removed = true;
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            log_cleanup_failure(&self.dir, e);
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            log_cleanup_failure(&self.dir, e);
        }
    }
}

fn log_cleanup_failure(dir: &Path, e: std::io::Error) {
    if e.kind() != ErrorKind::NotFound {
        log::warn!("Failed to clean staging dir {}: {}", dir.display(), e);
    }
}

/// Upload, delete and download flows over a [`CatalogStore`].
///
/// Every load → mutate → save cycle runs under `write_lock`, so concurrent
/// requests in this process cannot overwrite each other's changes. Writes by
/// the external watcher are not covered; the two-form duplicate check is the
/// only protection against those.
pub struct NotesService<S> {
    store: S,
    converter: DocumentConverter,
    site_root: PathBuf,
    upload_root: PathBuf,
    staging_root: PathBuf,
    write_lock: Mutex<()>,
}

impl<S: CatalogStore> NotesService<S> {
    pub fn new(store: S, converter: DocumentConverter, storage: &StorageConfig) -> Self {
        Self {
            store,
            converter,
            site_root: storage.site_root.clone(),
            upload_root: storage.upload_root.clone(),
            staging_root: storage.staging_root(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    async fn load(&self) -> NotesResult<CatalogDocument> {
        self.store.load().await.map_err(NotesError::Catalog)
    }

    pub async fn upload(&self, request: UploadRequest) -> NotesResult<UploadOutcome> {
        let upload = request.validate()?;

        // Fail fast on unknown catalog entries before touching the disk
        {
            let mut document = self.load().await?;
            document.resolve_subject_mut(&upload.semester, &upload.branch, &upload.subject)?;
        }

        let file_name =
            sanitize_filename(&upload.file.filename).ok_or(NotesError::InvalidFilename)?;
        let extension = dotted_extension(Path::new(&file_name));
        let needs_conversion = extension != ".pdf";
        if needs_conversion && !DocumentConverter::is_supported(&extension) {
            return Err(NotesError::UnsupportedFormat(extension));
        }

        let staging = StagingArea::create(&self.staging_root).await?;
        let result = self
            .upload_staged(upload, &staging, file_name, extension)
            .await;
        staging.remove().await;
        result
    }

    /// Stages, converts and commits an upload whose catalog entry and
    /// format have already been checked.
    async fn upload_staged(
        &self,
        upload: ValidUpload,
        staging: &StagingArea,
        file_name: String,
        extension: String,
    ) -> NotesResult<UploadOutcome> {
        let needs_conversion = extension != ".pdf";
        let staged = staging.path().join(&file_name);
        tokio::fs::write(&staged, &upload.file.bytes).await?;

        let (pdf_path, pdf_name, conversion_note) = if needs_conversion {
            let pdf_name = get_converted_filename(&file_name);
            let target = staging.path().join(&pdf_name);
            let outcome = self.converter.convert_to_pdf(&staged, Some(&target)).await;
            if !outcome.success {
                return Err(NotesError::ConversionFailed(outcome.message));
            }
            tokio::fs::remove_file(&staged).await?;
            let note = format!(
                " (Converted from {} to PDF)",
                extension.trim_start_matches('.').to_uppercase()
            );
            (outcome.output_path.unwrap_or(target), pdf_name, Some(note))
        } else {
            (staged, file_name, None)
        };
        let converted = conversion_note.is_some();

        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        let subject =
            document.resolve_subject_mut(&upload.semester, &upload.branch, &upload.subject)?;

        let location = MaterialLocation::new(
            &self.site_root,
            &self.upload_root,
            &upload.semester,
            &upload.branch,
            &subject.name,
            &pdf_name,
        );
        let catalog_path = location.catalog_path();
        let duplicate =
            subject.has_material_path(&[catalog_path.as_str(), location.watcher_path().as_str()]);

        commit_file(&pdf_path, &location).await?;

        if duplicate {
            log::info!("Material {} already in catalog, file replaced", catalog_path);
            return Ok(UploadOutcome {
                message: "File already exists in database".to_string(),
                converted,
                duplicate: true,
                material: None,
            });
        }

        let size = tokio::fs::metadata(location.disk_path()).await?.len();
        let material = Material {
            title: upload.title,
            description: upload.description,
            path: catalog_path.clone(),
            material_type: "pdf".to_string(),
            size: format!("{}KB", size / 1024),
            upload_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            download_url: location.download_url(),
            extra: Default::default(),
        };
        subject.add_material(material.clone());

        if let Err(e) = self.store.save(&document).await {
            if let Err(cleanup) = tokio::fs::remove_file(location.disk_path()).await {
                log::warn!(
                    "Failed to roll back {}: {}",
                    location.disk_path().display(),
                    cleanup
                );
            }
            return Err(NotesError::Catalog(e));
        }

        log::info!("Uploaded {} ({})", catalog_path, material.size);
        Ok(UploadOutcome {
            message: format!(
                "File uploaded and notes updated.{}",
                conversion_note.unwrap_or_default()
            ),
            converted,
            duplicate: false,
            material: Some(material),
        })
    }

    pub async fn delete_material(&self, request: DeleteMaterialRequest) -> NotesResult<()> {
        let semester = required(request.semester)?;
        let branch = required(request.branch)?;
        let subject_id = required(request.subject)?;
        let path = required(request.path)?;

        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        let subject = document.resolve_subject_mut(&semester, &branch, &subject_id)?;

        if subject.remove_material(&path) == 0 {
            return Err(NotesError::MaterialNotFound);
        }

        // The catalog goes first: a failed save must leave the file in place
        self.store.save(&document).await.map_err(NotesError::Catalog)?;
        log::info!("Removed material {} from {}/{}/{}", path, semester, branch, subject_id);

        match resolve_site_path(&self.site_root, &path) {
            Some(file) => match tokio::fs::remove_file(&file).await {
                Ok(()) => log::info!("Deleted file {}", file.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to delete file {}: {}", file.display(), e),
            },
            None => log::warn!("Not deleting file outside site root: {}", path),
        }
        Ok(())
    }

    /// Disk location of a downloadable file, if `path` names one under the
    /// site root.
    pub async fn resolve_download(&self, path: &str) -> Option<PathBuf> {
        let file = resolve_site_path(&self.site_root, path)?;
        match tokio::fs::metadata(&file).await {
            Ok(metadata) if metadata.is_file() => Some(file),
            _ => None,
        }
    }
}

/// Moves a staged PDF to its final place, replacing any previous file.
async fn commit_file(staged: &Path, location: &MaterialLocation) -> NotesResult<()> {
    tokio::fs::create_dir_all(location.folder()).await?;
    if tokio::fs::rename(staged, location.disk_path()).await.is_err() {
        // Staging may live on another filesystem
        tokio::fs::copy(staged, location.disk_path()).await?;
        tokio::fs::remove_file(staged).await?;
    }
    Ok(())
}
