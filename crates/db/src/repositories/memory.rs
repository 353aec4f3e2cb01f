use std::collections::HashMap;

use tokio::sync::RwLock;

use signoff_core::domain::document::{Document, DocumentId};
use signoff_core::query::{sort_newest_first, DocumentFilter};

use super::{DocumentRepository, RepositoryError};

/// Map-backed repository for tests and single-process setups. Filtering goes
/// through the same pure predicate the SQL repository mirrors.
#[derive(Default)]
pub struct InMemoryDocumentRepository {
    documents: RwLock<HashMap<String, Document>>,
}

#[async_trait::async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id.0).cloned())
    }

    async fn save(&self, document: Document) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        documents.insert(document.id.0.clone(), document);
        Ok(())
    }

    async fn list(&self, filter: &DocumentFilter) -> Result<Vec<Document>, RepositoryError> {
        let documents = self.documents.read().await;
        let mut matching: Vec<Document> =
            documents.values().filter(|document| filter.matches(document)).cloned().collect();
        sort_newest_first(&mut matching);
        Ok(matching)
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        documents.remove(&id.0);
        Ok(())
    }
}
