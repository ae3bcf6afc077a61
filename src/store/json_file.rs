use crate::model::CatalogDocument;
use crate::store::traits::CatalogStore;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Catalog stored as a single pretty-printed JSON file.
///
/// Saves go through a sibling temporary file that is renamed over the
/// catalog, so readers (including the external watcher) never observe a
/// partially written document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "catalog.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()))
    }
}

#[async_trait::async_trait]
impl CatalogStore for JsonFileStore {
    async fn load(&self) -> Result<CatalogDocument> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read catalog {}", self.path.display()))?;
        let document = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse catalog {}", self.path.display()))?;
        Ok(document)
    }

    async fn save(&self, document: &CatalogDocument) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document).context("failed to serialize catalog")?;
        let temp_path = self.temp_path();

        tokio::fs::write(&temp_path, &bytes)
            .await
            .with_context(|| format!("failed to write catalog {}", temp_path.display()))?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e)
                .with_context(|| format!("failed to replace catalog {}", self.path.display()));
        }
        Ok(())
    }
}
