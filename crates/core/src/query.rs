use serde::{Deserialize, Serialize};

use crate::domain::document::{Document, DocumentStatus, DocumentType};

/// Read-side filter over a document collection. All provided predicates must
/// match; `free_text` is a case-insensitive substring match on title or
/// requester name. Holds no state; both the in-memory and SQL repositories
/// share these semantics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    pub doc_type: Option<DocumentType>,
    pub free_text: Option<String>,
}

impl DocumentFilter {
    pub fn matches(&self, document: &Document) -> bool {
        if let Some(status) = self.status {
            if document.status != status {
                return false;
            }
        }

        if let Some(doc_type) = self.doc_type {
            if document.doc_type() != doc_type {
                return false;
            }
        }

        if let Some(needle) = &self.free_text {
            let needle = needle.to_lowercase();
            let in_title = document.title.to_lowercase().contains(&needle);
            let in_requester = document.requester_name.to_lowercase().contains(&needle);
            if !in_title && !in_requester {
                return false;
            }
        }

        true
    }
}

/// Conventional default ordering for approval lists.
pub fn sort_newest_first(documents: &mut [Document]) {
    documents.sort_by(|left, right| right.created_at.cmp(&left.created_at));
}
