//! End-to-end flows over the in-memory repository: draft composition,
//! sequential approval, rejection short-circuit, and attachment limits.

use anyhow::Result;
use chrono::NaiveDate;

use signoff_core::attachments::{AttachmentError, AttachmentPolicy, NewAttachment};
use signoff_core::chain::ApproverStatus;
use signoff_core::domain::document::{
    DayType, DocumentStatus, DocumentType, MemberId, TypedFields, Urgency, VacationSchedule,
};
use signoff_core::query::DocumentFilter;
use signoff_core::workflow::WorkflowError;
use signoff_db::InMemoryDocumentRepository;
use signoff_engine::{ApprovalService, NewDraft, ServiceError};

fn service_with(policy: AttachmentPolicy) -> ApprovalService<InMemoryDocumentRepository> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    ApprovalService::new(InMemoryDocumentRepository::default(), policy)
}

fn member(id: &str) -> MemberId {
    MemberId(id.to_string())
}

fn vacation_draft(title: &str) -> NewDraft {
    NewDraft {
        title: title.to_string(),
        content: "Taking a few days off.".to_string(),
        urgency: Urgency::Normal,
        typed_fields: TypedFields::Vacation {
            vacation_type: "annual".to_string(),
            schedules: vec![VacationSchedule {
                date: NaiveDate::from_ymd_opt(2026, 9, 14).expect("valid date"),
                day_type: DayType::Full,
                start_time: None,
                end_time: None,
                reason: None,
            }],
        },
        requester_id: member("m-req"),
        requester_name: "Kim Jiwon".to_string(),
    }
}

#[tokio::test]
async fn three_approver_happy_path() -> Result<()> {
    let service = service_with(AttachmentPolicy::draft());
    let draft = service.create_draft(vacation_draft("September leave")).await?;

    for approver in ["m-1", "m-2", "m-3"] {
        service.add_approver(&draft.id, member(approver)).await?;
    }
    service.add_reference(&draft.id, member("m-hr")).await?;
    service.submit(&draft.id).await?;

    for (i, approver) in ["m-1", "m-2", "m-3"].iter().enumerate() {
        let outcome = service.approve(&draft.id, &member(approver), None).await?;
        assert_eq!(outcome.entry_order, (i + 1) as u32);
    }

    let document = service.get(&draft.id).await?;
    assert_eq!(document.status, DocumentStatus::Approved);
    assert!(document.chain.approvers().iter().all(|e| e.status == ApproverStatus::Approved));
    Ok(())
}

#[tokio::test]
async fn second_approver_rejection_short_circuits() -> Result<()> {
    let service = service_with(AttachmentPolicy::draft());
    let draft = service.create_draft(vacation_draft("Conference trip")).await?;
    service.add_approver(&draft.id, member("m-1")).await?;
    service.add_approver(&draft.id, member("m-2")).await?;
    service.submit(&draft.id).await?;

    service.approve(&draft.id, &member("m-1"), None).await?;

    // a rejection needs a reason
    let err = service.reject(&draft.id, &member("m-2"), "  ").await.expect_err("blank comment");
    assert!(matches!(err, ServiceError::Workflow(WorkflowError::CommentRequired)));

    let outcome = service.reject(&draft.id, &member("m-2"), "dates clash with release").await?;
    assert_eq!(outcome.document_status, DocumentStatus::Rejected);

    // the chain is closed for everyone, including approver one retrying
    let err = service.approve(&draft.id, &member("m-1"), None).await.expect_err("terminal");
    assert!(matches!(err, ServiceError::Workflow(WorkflowError::NotFound)));

    let document = service.get(&draft.id).await?;
    assert_eq!(document.chain.approvers()[1].comment.as_deref(), Some("dates clash with release"));
    Ok(())
}

#[tokio::test]
async fn out_of_turn_decisions_change_nothing() -> Result<()> {
    let service = service_with(AttachmentPolicy::draft());
    let draft = service.create_draft(vacation_draft("October leave")).await?;
    service.add_approver(&draft.id, member("m-1")).await?;
    service.add_approver(&draft.id, member("m-2")).await?;
    service.submit(&draft.id).await?;

    let err = service.approve(&draft.id, &member("m-2"), None).await.expect_err("not their turn");
    assert!(matches!(
        err,
        ServiceError::Workflow(WorkflowError::NotYourTurn { .. })
    ));
    let err = service.reject(&draft.id, &member("m-9"), "no").await.expect_err("not in chain");
    assert!(matches!(err, ServiceError::Workflow(WorkflowError::NotYourTurn { .. })));

    let document = service.get(&draft.id).await?;
    assert_eq!(document.status, DocumentStatus::Pending);
    assert!(document.chain.approvers().iter().all(|e| e.status == ApproverStatus::Pending));
    Ok(())
}

#[tokio::test]
async fn attachment_limits_apply_per_policy() -> Result<()> {
    let policy = AttachmentPolicy { max_files: 2, ..AttachmentPolicy::draft() };
    let service = service_with(policy);
    let draft = service.create_draft(vacation_draft("With receipts")).await?;

    let pdf = |name: &str, size: u64| NewAttachment {
        name: name.to_string(),
        size,
        mime_type: "application/pdf".to_string(),
        url: None,
    };

    service.add_attachment(&draft.id, pdf("itinerary.pdf", 1_000)).await?;

    let err = service
        .add_attachment(&draft.id, pdf("itinerary.pdf", 1_000))
        .await
        .expect_err("duplicate");
    assert!(matches!(err, ServiceError::Attachment(AttachmentError::DuplicateFile { .. })));

    // same name, different size is a different file
    service.add_attachment(&draft.id, pdf("itinerary.pdf", 2_000)).await?;

    let err = service
        .add_attachment(&draft.id, pdf("hotel.pdf", 500))
        .await
        .expect_err("over cap");
    assert!(matches!(err, ServiceError::Attachment(AttachmentError::TooManyFiles { max_files: 2 })));

    let document = service.get(&draft.id).await?;
    assert_eq!(document.attachments.len(), 2);
    Ok(())
}

#[tokio::test]
async fn listing_filters_and_sorts() -> Result<()> {
    let service = service_with(AttachmentPolicy::draft());

    let a = service.create_draft(vacation_draft("March leave")).await?;
    let b = service.create_draft(vacation_draft("April leave")).await?;
    service.add_approver(&b.id, member("m-1")).await?;
    service.submit(&b.id).await?;

    let pending = service
        .list(&DocumentFilter { status: Some(DocumentStatus::Pending), ..Default::default() })
        .await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, b.id);

    let vacations = service
        .list(&DocumentFilter { doc_type: Some(DocumentType::Vacation), ..Default::default() })
        .await?;
    assert_eq!(vacations.len(), 2);
    assert!(vacations[0].created_at >= vacations[1].created_at);

    let by_text = service
        .list(&DocumentFilter { free_text: Some("march".to_string()), ..Default::default() })
        .await?;
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].id, a.id);
    Ok(())
}
