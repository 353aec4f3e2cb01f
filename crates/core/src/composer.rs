use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::document::{Document, DocumentStatus};
use crate::validation::{DocumentValidator, ValidationResult};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("document is missing required fields: {missing_fields:?}")]
    ValidationFailed { missing_fields: Vec<String> },
    #[error("a document needs at least one approver before submission")]
    NoApprovers,
    #[error("document is {status:?} and can no longer be composed")]
    NotDraft { status: DocumentStatus },
}

/// Brings validator, chain and attachments together into a submittable
/// document. Both operations validate first and leave the document untouched
/// on failure.
pub struct DraftComposer;

impl DraftComposer {
    /// Keeps a validated document as a draft. No approval chain is required
    /// at this stage.
    pub fn save_draft(document: &mut Document, now: DateTime<Utc>) -> Result<(), ComposeError> {
        Self::ensure_draft(document)?;
        Self::ensure_valid(document)?;

        document.updated_at = now;
        Ok(())
    }

    /// Validates, requires a non-empty approver chain, then moves the
    /// document to `Pending` with every chain entry reset to `Pending`.
    /// From here on the composed parts are frozen; only the state machine
    /// touches the document.
    pub fn submit(document: &mut Document, now: DateTime<Utc>) -> Result<(), ComposeError> {
        Self::ensure_draft(document)?;
        Self::ensure_valid(document)?;

        if document.chain.is_empty() {
            return Err(ComposeError::NoApprovers);
        }

        document.chain.reset_statuses();
        document
            .transition_to(DocumentStatus::Pending)
            .map_err(|_| ComposeError::NotDraft { status: document.status })?;
        document.updated_at = now;
        Ok(())
    }

    fn ensure_draft(document: &Document) -> Result<(), ComposeError> {
        if document.status != DocumentStatus::Draft {
            return Err(ComposeError::NotDraft { status: document.status });
        }
        Ok(())
    }

    fn ensure_valid(document: &Document) -> Result<(), ComposeError> {
        match DocumentValidator::validate(document) {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid { missing_fields } => {
                Err(ComposeError::ValidationFailed { missing_fields })
            }
        }
    }
}
