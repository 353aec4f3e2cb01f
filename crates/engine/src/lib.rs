pub mod service;
pub mod transfer;

pub use service::{ApprovalService, DraftPatch, NewDraft, ServiceError};
pub use transfer::{AttachmentDownloader, DownloadError, DownloadedFile};
