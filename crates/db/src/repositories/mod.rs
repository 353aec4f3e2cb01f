use async_trait::async_trait;
use thiserror::Error;

use signoff_core::domain::document::{Document, DocumentId};
use signoff_core::query::DocumentFilter;

pub mod document;
pub mod memory;

pub use document::SqlDocumentRepository;
pub use memory::InMemoryDocumentRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Storage seam for the approval engine. The state machine and validator
/// never assume a particular backend; anything that can upsert and filter
/// documents can sit behind this trait.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError>;

    async fn save(&self, document: Document) -> Result<(), RepositoryError>;

    /// Documents matching the filter, newest first.
    async fn list(&self, filter: &DocumentFilter) -> Result<Vec<Document>, RepositoryError>;

    async fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError>;
}
