use chrono::{DateTime, Utc};
use sqlx::Row;

use signoff_core::chain::{ApprovalChain, ApproverEntry, ApproverStatus};
use signoff_core::domain::attachment::{AttachmentId, AttachmentRef};
use signoff_core::domain::document::{
    Document, DocumentId, DocumentStatus, MemberId, TypedFields, Urgency,
};
use signoff_core::query::DocumentFilter;

use super::{DocumentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDocumentRepository {
    pool: DbPool,
}

impl SqlDocumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Document, RepositoryError> {
        let mut document = row_to_document(row)?;
        let id = document.id.0.clone();

        let approver_rows = sqlx::query(
            "SELECT member_id, status, comment, processed_at
             FROM approver_entry WHERE document_id = ? ORDER BY position ASC",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;
        let approvers = approver_rows
            .iter()
            .map(row_to_approver_entry)
            .collect::<Result<Vec<_>, _>>()?;

        let reference_rows = sqlx::query(
            "SELECT member_id FROM document_reference WHERE document_id = ? ORDER BY position ASC",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;
        let references = reference_rows
            .iter()
            .map(|row| {
                row.try_get::<String, _>("member_id")
                    .map(MemberId)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let attachment_rows = sqlx::query(
            "SELECT id, name, size, mime_type, url, uploaded_at
             FROM attachment WHERE document_id = ? ORDER BY rowid ASC",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;
        let attachments = attachment_rows
            .iter()
            .map(row_to_attachment)
            .collect::<Result<Vec<_>, _>>()?;

        document.chain = ApprovalChain::from_parts(approvers, references);
        document.attachments = signoff_core::attachments::AttachmentSet::from_refs(attachments);
        Ok(document)
    }
}

pub fn status_as_str(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Draft => "draft",
        DocumentStatus::Pending => "pending",
        DocumentStatus::Approved => "approved",
        DocumentStatus::Rejected => "rejected",
    }
}

fn parse_status(raw: &str) -> Result<DocumentStatus, RepositoryError> {
    match raw {
        "draft" => Ok(DocumentStatus::Draft),
        "pending" => Ok(DocumentStatus::Pending),
        "approved" => Ok(DocumentStatus::Approved),
        "rejected" => Ok(DocumentStatus::Rejected),
        other => Err(RepositoryError::Decode(format!("unknown document status `{other}`"))),
    }
}

fn urgency_as_str(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Low => "low",
        Urgency::Normal => "normal",
        Urgency::High => "high",
        Urgency::Urgent => "urgent",
    }
}

fn parse_urgency(raw: &str) -> Result<Urgency, RepositoryError> {
    match raw {
        "low" => Ok(Urgency::Low),
        "normal" => Ok(Urgency::Normal),
        "high" => Ok(Urgency::High),
        "urgent" => Ok(Urgency::Urgent),
        other => Err(RepositoryError::Decode(format!("unknown urgency `{other}`"))),
    }
}

fn approver_status_as_str(status: ApproverStatus) -> &'static str {
    match status {
        ApproverStatus::Pending => "pending",
        ApproverStatus::Approved => "approved",
        ApproverStatus::Rejected => "rejected",
    }
}

fn parse_approver_status(raw: &str) -> Result<ApproverStatus, RepositoryError> {
    match raw {
        "pending" => Ok(ApproverStatus::Pending),
        "approved" => Ok(ApproverStatus::Approved),
        "rejected" => Ok(ApproverStatus::Rejected),
        other => Err(RepositoryError::Decode(format!("unknown approver status `{other}`"))),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp `{raw}`: {e}")))
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let content: String =
        row.try_get("content").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let urgency_str: String =
        row.try_get("urgency").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let typed_fields_json: String =
        row.try_get("typed_fields").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_id: String =
        row.try_get("requester_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_name: String =
        row.try_get("requester_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let typed_fields: TypedFields = serde_json::from_str(&typed_fields_json)
        .map_err(|e| RepositoryError::Decode(format!("bad typed_fields payload: {e}")))?;

    Ok(Document {
        id: DocumentId(id),
        title,
        content,
        urgency: parse_urgency(&urgency_str)?,
        status: parse_status(&status_str)?,
        typed_fields,
        chain: ApprovalChain::default(),
        attachments: signoff_core::attachments::AttachmentSet::default(),
        requester_id: MemberId(requester_id),
        requester_name,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

fn row_to_approver_entry(row: &sqlx::sqlite::SqliteRow) -> Result<ApproverEntry, RepositoryError> {
    let member_id: String =
        row.try_get("member_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comment: Option<String> =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let processed_at_str: Option<String> =
        row.try_get("processed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let processed_at = processed_at_str.as_deref().map(parse_timestamp).transpose()?;

    Ok(ApproverEntry {
        order: 0, // recomputed by ApprovalChain::from_parts
        member_id: MemberId(member_id),
        status: parse_approver_status(&status_str)?,
        comment,
        processed_at,
    })
}

fn row_to_attachment(row: &sqlx::sqlite::SqliteRow) -> Result<AttachmentRef, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let size: i64 = row.try_get("size").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let mime_type: String =
        row.try_get("mime_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let url: Option<String> =
        row.try_get("url").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let uploaded_at_str: String =
        row.try_get("uploaded_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(AttachmentRef {
        id: AttachmentId(id),
        name,
        size: size as u64,
        mime_type,
        url,
        uploaded_at: parse_timestamp(&uploaded_at_str)?,
    })
}

#[async_trait::async_trait]
impl DocumentRepository for SqlDocumentRepository {
    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, content, urgency, status, typed_fields,
                    requester_id, requester_name, created_at, updated_at
             FROM document WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn save(&self, document: Document) -> Result<(), RepositoryError> {
        let typed_fields_json = serde_json::to_string(&document.typed_fields)
            .map_err(|e| RepositoryError::Decode(format!("bad typed_fields payload: {e}")))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO document (id, title, content, urgency, status, doc_type, typed_fields,
                                   requester_id, requester_name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 content = excluded.content,
                 urgency = excluded.urgency,
                 status = excluded.status,
                 doc_type = excluded.doc_type,
                 typed_fields = excluded.typed_fields,
                 requester_name = excluded.requester_name,
                 updated_at = excluded.updated_at",
        )
        .bind(&document.id.0)
        .bind(&document.title)
        .bind(&document.content)
        .bind(urgency_as_str(document.urgency))
        .bind(status_as_str(document.status))
        .bind(document.doc_type().as_str())
        .bind(&typed_fields_json)
        .bind(&document.requester_id.0)
        .bind(&document.requester_name)
        .bind(document.created_at.to_rfc3339())
        .bind(document.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        // child rows are replaced wholesale; row order is the chain order
        sqlx::query("DELETE FROM approver_entry WHERE document_id = ?")
            .bind(&document.id.0)
            .execute(&mut *tx)
            .await?;
        for (position, entry) in document.chain.approvers().iter().enumerate() {
            sqlx::query(
                "INSERT INTO approver_entry (document_id, position, member_id, status, comment, processed_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&document.id.0)
            .bind(position as i64)
            .bind(&entry.member_id.0)
            .bind(approver_status_as_str(entry.status))
            .bind(&entry.comment)
            .bind(entry.processed_at.map(|dt| dt.to_rfc3339()))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM document_reference WHERE document_id = ?")
            .bind(&document.id.0)
            .execute(&mut *tx)
            .await?;
        for (position, member_id) in document.chain.references().iter().enumerate() {
            sqlx::query(
                "INSERT INTO document_reference (document_id, position, member_id)
                 VALUES (?, ?, ?)",
            )
            .bind(&document.id.0)
            .bind(position as i64)
            .bind(&member_id.0)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM attachment WHERE document_id = ?")
            .bind(&document.id.0)
            .execute(&mut *tx)
            .await?;
        for file in document.attachments.files() {
            sqlx::query(
                "INSERT INTO attachment (id, document_id, name, size, mime_type, url, uploaded_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&file.id.0)
            .bind(&document.id.0)
            .bind(&file.name)
            .bind(file.size as i64)
            .bind(&file.mime_type)
            .bind(&file.url)
            .bind(file.uploaded_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, filter: &DocumentFilter) -> Result<Vec<Document>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, title, content, urgency, status, typed_fields,
                    requester_id, requester_name, created_at, updated_at
             FROM document
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR doc_type = ?2)
               AND (?3 IS NULL
                    OR instr(lower(title), lower(?3)) > 0
                    OR instr(lower(requester_name), lower(?3)) > 0)
             ORDER BY created_at DESC",
        )
        .bind(filter.status.map(status_as_str))
        .bind(filter.doc_type.map(|doc_type| doc_type.as_str()))
        .bind(filter.free_text.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            documents.push(self.hydrate(row).await?);
        }
        Ok(documents)
    }

    async fn delete(&self, id: &DocumentId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM document WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
