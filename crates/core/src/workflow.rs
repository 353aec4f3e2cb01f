use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::{ApproverEntry, ApproverStatus};
use crate::domain::document::{Document, DocumentStatus, MemberId};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("no actionable approver entry exists for this document")]
    NotFound,
    #[error("member `{actor}` is not the currently actionable approver")]
    NotYourTurn { actor: String },
    #[error("a rejection requires a comment")]
    CommentRequired,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub entry_order: u32,
    pub entry_status: ApproverStatus,
    pub document_status: DocumentStatus,
}

/// Lifecycle rules for a submitted document: strictly sequential gating over
/// the approver chain, with `Approved`/`Rejected` as terminal states.
pub struct ApprovalStateMachine;

impl ApprovalStateMachine {
    /// The single entry the machine is currently waiting on: the
    /// lowest-order pending entry of a pending document. Every other
    /// approver is inert.
    pub fn actionable(document: &Document) -> Option<&ApproverEntry> {
        if document.status != DocumentStatus::Pending {
            return None;
        }
        document
            .chain
            .first_pending_index()
            .map(|index| &document.chain.approvers()[index])
    }

    /// Records an approval by the actionable approver. Approving the last
    /// entry in chain order moves the document to `Approved`.
    pub fn approve(
        document: &mut Document,
        actor: &MemberId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let index = Self::actionable_index(document, actor)?;

        let entry = &mut document.chain.approvers_mut()[index];
        entry.status = ApproverStatus::Approved;
        entry.comment = comment;
        entry.processed_at = Some(now);
        let entry_order = entry.order;

        if document.chain.first_pending_index().is_none() {
            document
                .transition_to(DocumentStatus::Approved)
                .map_err(|_| WorkflowError::NotFound)?;
        }
        document.updated_at = now;

        Ok(TransitionOutcome {
            entry_order,
            entry_status: ApproverStatus::Approved,
            document_status: document.status,
        })
    }

    /// Records a rejection by the actionable approver. A single rejection
    /// terminates the whole chain: the document becomes `Rejected` and no
    /// later entry ever becomes actionable.
    pub fn reject(
        document: &mut Document,
        actor: &MemberId,
        comment: &str,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        let index = Self::actionable_index(document, actor)?;

        if comment.trim().is_empty() {
            return Err(WorkflowError::CommentRequired);
        }

        let entry = &mut document.chain.approvers_mut()[index];
        entry.status = ApproverStatus::Rejected;
        entry.comment = Some(comment.to_string());
        entry.processed_at = Some(now);
        let entry_order = entry.order;

        document
            .transition_to(DocumentStatus::Rejected)
            .map_err(|_| WorkflowError::NotFound)?;
        document.updated_at = now;

        Ok(TransitionOutcome {
            entry_order,
            entry_status: ApproverStatus::Rejected,
            document_status: document.status,
        })
    }

    fn actionable_index(document: &Document, actor: &MemberId) -> Result<usize, WorkflowError> {
        if document.status != DocumentStatus::Pending {
            return Err(WorkflowError::NotFound);
        }
        let index = document.chain.first_pending_index().ok_or(WorkflowError::NotFound)?;

        let entry = &document.chain.approvers()[index];
        if &entry.member_id != actor {
            return Err(WorkflowError::NotYourTurn { actor: actor.0.clone() });
        }
        Ok(index)
    }
}
