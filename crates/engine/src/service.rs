use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use signoff_core::attachments::{AttachmentError, AttachmentPolicy, NewAttachment};
use signoff_core::chain::ChainError;
use signoff_core::composer::{ComposeError, DraftComposer};
use signoff_core::domain::attachment::AttachmentId;
use signoff_core::domain::document::{
    Document, DocumentId, DocumentStatus, MemberId, TypedFields, Urgency,
};
use signoff_core::query::DocumentFilter;
use signoff_core::workflow::{ApprovalStateMachine, TransitionOutcome, WorkflowError};
use signoff_db::{DocumentRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("document `{0}` not found")]
    NotFound(String),
    #[error("document is {status:?} and can no longer be edited")]
    NotEditable { status: DocumentStatus },
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Everything needed to open a new draft. Typed fields may be partially
/// filled; nothing is validated until save or submit.
#[derive(Clone, Debug)]
pub struct NewDraft {
    pub title: String,
    pub content: String,
    pub urgency: Urgency,
    pub typed_fields: TypedFields,
    pub requester_id: MemberId,
    pub requester_name: String,
}

/// Partial update applied to a draft. `None` leaves the field as is.
#[derive(Clone, Debug, Default)]
pub struct DraftPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub urgency: Option<Urgency>,
    pub typed_fields: Option<TypedFields>,
}

/// Application service over a [`DocumentRepository`]. Drafts are freely
/// editable; once submitted a document only moves through approve/reject.
/// approve, reject and submit serialize per document so two decisions
/// against the same chain cannot interleave.
pub struct ApprovalService<R> {
    repo: R,
    draft_policy: AttachmentPolicy,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<R: DocumentRepository> ApprovalService<R> {
    pub fn new(repo: R, draft_policy: AttachmentPolicy) -> Self {
        Self { repo, draft_policy, locks: Mutex::new(HashMap::new()) }
    }

    pub async fn create_draft(&self, draft: NewDraft) -> Result<Document, ServiceError> {
        let document = Document::new_draft(
            draft.title,
            draft.content,
            draft.urgency,
            draft.typed_fields,
            draft.requester_id,
            draft.requester_name,
            Utc::now(),
        );
        self.repo.save(document.clone()).await?;
        info!(document_id = %document.id.0, doc_type = document.doc_type().as_str(), "draft created");
        Ok(document)
    }

    pub async fn update_draft(
        &self,
        id: &DocumentId,
        patch: DraftPatch,
    ) -> Result<Document, ServiceError> {
        self.edit_draft(id, |document| {
            if let Some(title) = patch.title {
                document.title = title;
            }
            if let Some(content) = patch.content {
                document.content = content;
            }
            if let Some(urgency) = patch.urgency {
                document.urgency = urgency;
            }
            if let Some(typed_fields) = patch.typed_fields {
                document.typed_fields = typed_fields;
            }
            Ok(())
        })
        .await
    }

    pub async fn add_approver(
        &self,
        id: &DocumentId,
        member_id: MemberId,
    ) -> Result<Document, ServiceError> {
        self.edit_draft(id, |document| {
            document.chain.add_approver(member_id);
            Ok(())
        })
        .await
    }

    pub async fn remove_approver(
        &self,
        id: &DocumentId,
        member_id: &MemberId,
    ) -> Result<Document, ServiceError> {
        self.edit_draft(id, |document| {
            document.chain.remove_approver(member_id);
            Ok(())
        })
        .await
    }

    pub async fn move_approver(
        &self,
        id: &DocumentId,
        from: usize,
        to: usize,
    ) -> Result<Document, ServiceError> {
        self.edit_draft(id, |document| {
            document.chain.move_approver(from, to)?;
            Ok(())
        })
        .await
    }

    pub async fn add_reference(
        &self,
        id: &DocumentId,
        member_id: MemberId,
    ) -> Result<Document, ServiceError> {
        self.edit_draft(id, |document| {
            document.chain.add_reference(member_id);
            Ok(())
        })
        .await
    }

    pub async fn remove_reference(
        &self,
        id: &DocumentId,
        member_id: &MemberId,
    ) -> Result<Document, ServiceError> {
        self.edit_draft(id, |document| {
            document.chain.remove_reference(member_id);
            Ok(())
        })
        .await
    }

    pub async fn move_reference(
        &self,
        id: &DocumentId,
        from: usize,
        to: usize,
    ) -> Result<Document, ServiceError> {
        self.edit_draft(id, |document| {
            document.chain.move_reference(from, to)?;
            Ok(())
        })
        .await
    }

    pub async fn add_attachment(
        &self,
        id: &DocumentId,
        file: NewAttachment,
    ) -> Result<AttachmentId, ServiceError> {
        let mut document = self.load(id).await?;
        ensure_editable(&document)?;

        let attachment_id = document.attachments.add(file, &self.draft_policy, Utc::now())?;
        document.updated_at = Utc::now();
        self.repo.save(document).await?;
        debug!(document_id = %id.0, attachment_id = %attachment_id.0, "attachment added");
        Ok(attachment_id)
    }

    pub async fn remove_attachment(
        &self,
        id: &DocumentId,
        attachment_id: &AttachmentId,
    ) -> Result<Document, ServiceError> {
        self.edit_draft(id, |document| {
            document.attachments.remove(attachment_id);
            Ok(())
        })
        .await
    }

    pub async fn save_draft(&self, id: &DocumentId) -> Result<Document, ServiceError> {
        let mut document = self.load(id).await?;
        DraftComposer::save_draft(&mut document, Utc::now())?;
        self.repo.save(document.clone()).await?;
        debug!(document_id = %id.0, "draft saved");
        Ok(document)
    }

    pub async fn submit(&self, id: &DocumentId) -> Result<Document, ServiceError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let mut document = self.load(id).await?;
        DraftComposer::submit(&mut document, Utc::now())?;
        self.repo.save(document.clone()).await?;
        info!(
            document_id = %id.0,
            approvers = document.chain.len(),
            "document submitted for approval"
        );
        Ok(document)
    }

    pub async fn approve(
        &self,
        id: &DocumentId,
        actor: &MemberId,
        comment: Option<String>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let mut document = self.load(id).await?;
        let outcome = ApprovalStateMachine::approve(&mut document, actor, comment, Utc::now())?;
        document.updated_at = Utc::now();
        self.repo.save(document).await?;
        info!(
            document_id = %id.0,
            actor = %actor.0,
            entry_order = outcome.entry_order,
            document_status = ?outcome.document_status,
            "approval recorded"
        );
        Ok(outcome)
    }

    pub async fn reject(
        &self,
        id: &DocumentId,
        actor: &MemberId,
        comment: &str,
    ) -> Result<TransitionOutcome, ServiceError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let mut document = self.load(id).await?;
        let outcome = ApprovalStateMachine::reject(&mut document, actor, comment, Utc::now())?;
        document.updated_at = Utc::now();
        self.repo.save(document).await?;
        warn!(
            document_id = %id.0,
            actor = %actor.0,
            entry_order = outcome.entry_order,
            "document rejected"
        );
        Ok(outcome)
    }

    pub async fn delete_draft(&self, id: &DocumentId) -> Result<(), ServiceError> {
        let document = self.load(id).await?;
        ensure_editable(&document)?;
        self.repo.delete(id).await?;
        info!(document_id = %id.0, "draft deleted");
        Ok(())
    }

    pub async fn get(&self, id: &DocumentId) -> Result<Document, ServiceError> {
        self.load(id).await
    }

    pub async fn list(&self, filter: &DocumentFilter) -> Result<Vec<Document>, ServiceError> {
        Ok(self.repo.list(filter).await?)
    }

    async fn load(&self, id: &DocumentId) -> Result<Document, ServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.0.clone()))
    }

    async fn edit_draft<F>(&self, id: &DocumentId, apply: F) -> Result<Document, ServiceError>
    where
        F: FnOnce(&mut Document) -> Result<(), ServiceError>,
    {
        let mut document = self.load(id).await?;
        ensure_editable(&document)?;

        apply(&mut document)?;
        document.updated_at = Utc::now();
        self.repo.save(document.clone()).await?;
        Ok(document)
    }

    async fn lock_for(&self, id: &DocumentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id.0.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}

fn ensure_editable(document: &Document) -> Result<(), ServiceError> {
    if document.status != DocumentStatus::Draft {
        return Err(ServiceError::NotEditable { status: document.status });
    }
    Ok(())
}
