use crate::model::CatalogDocument;
use anyhow::Result;

/// Persistence for the notes catalog.
///
/// The whole document is loaded at the start of a mutating request and
/// written back in full at its end; implementations hold no cache between
/// calls.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn load(&self) -> Result<CatalogDocument>;
    async fn save(&self, document: &CatalogDocument) -> Result<()>;
}
