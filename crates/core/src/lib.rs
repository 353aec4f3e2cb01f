pub mod attachments;
pub mod chain;
pub mod composer;
pub mod config;
pub mod domain;
pub mod errors;
pub mod query;
pub mod validation;
pub mod workflow;

pub use attachments::{AttachmentError, AttachmentPolicy, AttachmentSet, NewAttachment};
pub use chain::{ApprovalChain, ApproverEntry, ApproverStatus, ChainError};
pub use composer::{ComposeError, DraftComposer};
pub use config::{AppConfig, AttachmentLimitsConfig, ConfigError, DatabaseConfig, TransferConfig};
pub use domain::attachment::{AttachmentId, AttachmentRef};
pub use domain::document::{
    DayType, Document, DocumentId, DocumentStatus, DocumentType, MemberId, TypedFields, Urgency,
    VacationSchedule,
};
pub use errors::DomainError;
pub use query::{sort_newest_first, DocumentFilter};
pub use validation::{DocumentValidator, ValidationError, ValidationResult};
pub use workflow::{ApprovalStateMachine, TransitionOutcome, WorkflowError};
