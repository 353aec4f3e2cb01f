use thiserror::Error;

use crate::attachments::AttachmentError;
use crate::chain::ChainError;
use crate::composer::ComposeError;
use crate::domain::document::DocumentStatus;
use crate::validation::ValidationError;
use crate::workflow::WorkflowError;

/// Umbrella over the per-component error enums. Every failure in this crate
/// is recoverable: the mutating call had no effect and the caller is told
/// which constraint failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid document transition from {from:?} to {to:?}")]
    InvalidDocumentTransition { from: DocumentStatus, to: DocumentStatus },
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::DomainError;
    use crate::chain::ChainError;
    use crate::workflow::WorkflowError;

    #[test]
    fn component_errors_convert_into_domain_error() {
        let domain: DomainError = ChainError::IndexOutOfRange { index: 3, len: 2 }.into();
        assert!(matches!(domain, DomainError::Chain(_)));

        let domain: DomainError = WorkflowError::CommentRequired.into();
        assert_eq!(domain.to_string(), "a rejection requires a comment");
    }
}
