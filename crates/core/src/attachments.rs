use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::attachment::{AttachmentId, AttachmentRef};

const DRAFT_MAX_BYTES: u64 = 10 * 1024 * 1024;
const MANUAL_MAX_BYTES: u64 = 50 * 1024 * 1024;
const DEFAULT_MAX_FILES: usize = 5;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("file is {size} bytes which exceeds the {max_bytes} byte limit")]
    FileTooLarge { size: u64, max_bytes: u64 },
    #[error("a file named `{name}` with the same size is already attached")]
    DuplicateFile { name: String },
    #[error("mime type `{mime_type}` is not in the allow-list")]
    UnsupportedType { mime_type: String },
    #[error("attachment limit of {max_files} files reached")]
    TooManyFiles { max_files: usize },
}

/// Upload constraints for one attachment context. The limits differ by where
/// the file is going (draft attachments vs manual/knowledge uploads), so the
/// policy travels as a parameter rather than a global.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPolicy {
    pub max_bytes: u64,
    pub max_files: usize,
    /// MIME allow-list. Empty means everything. Entries match exactly or by
    /// prefix, so `image/` admits any image subtype.
    pub allowed_types: Vec<String>,
}

impl AttachmentPolicy {
    pub fn draft() -> Self {
        Self {
            max_bytes: DRAFT_MAX_BYTES,
            max_files: DEFAULT_MAX_FILES,
            allowed_types: Vec::new(),
        }
    }

    pub fn manual() -> Self {
        Self {
            max_bytes: MANUAL_MAX_BYTES,
            max_files: DEFAULT_MAX_FILES,
            allowed_types: Vec::new(),
        }
    }

    fn allows_mime_type(&self, mime_type: &str) -> bool {
        if self.allowed_types.is_empty() {
            return true;
        }
        self.allowed_types
            .iter()
            .any(|allowed| mime_type == allowed || mime_type.starts_with(allowed.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAttachment {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSet {
    files: Vec<AttachmentRef>,
}

impl AttachmentSet {
    /// Rehydrates a set from storage without re-running upload constraints;
    /// the stored entries already passed them.
    pub fn from_refs(files: Vec<AttachmentRef>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[AttachmentRef] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, id: &AttachmentId) -> Option<&AttachmentRef> {
        self.files.iter().find(|file| &file.id == id)
    }

    /// Validates against the policy and appends on success. A failed call
    /// adds nothing.
    pub fn add(
        &mut self,
        file: NewAttachment,
        policy: &AttachmentPolicy,
        now: DateTime<Utc>,
    ) -> Result<AttachmentId, AttachmentError> {
        if file.size > policy.max_bytes {
            return Err(AttachmentError::FileTooLarge {
                size: file.size,
                max_bytes: policy.max_bytes,
            });
        }
        if !policy.allows_mime_type(&file.mime_type) {
            return Err(AttachmentError::UnsupportedType { mime_type: file.mime_type });
        }
        if self
            .files
            .iter()
            .any(|existing| existing.name == file.name && existing.size == file.size)
        {
            return Err(AttachmentError::DuplicateFile { name: file.name });
        }
        if self.files.len() >= policy.max_files {
            return Err(AttachmentError::TooManyFiles { max_files: policy.max_files });
        }

        let id = AttachmentId::generate();
        self.files.push(AttachmentRef {
            id: id.clone(),
            name: file.name,
            size: file.size,
            mime_type: file.mime_type,
            url: file.url,
            uploaded_at: now,
        });
        Ok(id)
    }

    /// Removes the entry if present; absent ids are not an error.
    pub fn remove(&mut self, id: &AttachmentId) {
        self.files.retain(|file| &file.id != id);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{AttachmentError, AttachmentPolicy, AttachmentSet, NewAttachment};

    fn file(name: &str, size: u64, mime_type: &str) -> NewAttachment {
        NewAttachment {
            name: name.to_string(),
            size,
            mime_type: mime_type.to_string(),
            url: None,
        }
    }

    #[test]
    fn accepts_distinct_files_under_the_limit() {
        let mut set = AttachmentSet::default();
        let policy = AttachmentPolicy::draft();

        set.add(file("a.pdf", 1_000, "application/pdf"), &policy, Utc::now()).expect("first");
        set.add(file("b.pdf", 1_000, "application/pdf"), &policy, Utc::now()).expect("second");

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn rejects_oversized_file() {
        let mut set = AttachmentSet::default();
        let policy = AttachmentPolicy::draft();

        let error = set
            .add(file("big.bin", policy.max_bytes + 1, "application/octet-stream"), &policy, Utc::now())
            .expect_err("over the limit");

        assert!(matches!(error, AttachmentError::FileTooLarge { .. }));
        assert!(set.is_empty());
    }

    #[test]
    fn rejects_same_name_and_size_pair() {
        let mut set = AttachmentSet::default();
        let policy = AttachmentPolicy::draft();

        set.add(file("report.xlsx", 2_048, "application/vnd.ms-excel"), &policy, Utc::now())
            .expect("first copy");
        let error = set
            .add(file("report.xlsx", 2_048, "application/vnd.ms-excel"), &policy, Utc::now())
            .expect_err("duplicate");

        assert_eq!(error, AttachmentError::DuplicateFile { name: "report.xlsx".to_string() });
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn same_name_different_size_is_not_a_duplicate() {
        let mut set = AttachmentSet::default();
        let policy = AttachmentPolicy::draft();

        set.add(file("report.xlsx", 2_048, "application/vnd.ms-excel"), &policy, Utc::now())
            .expect("first");
        set.add(file("report.xlsx", 4_096, "application/vnd.ms-excel"), &policy, Utc::now())
            .expect("revised copy");

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn allow_list_matches_by_prefix() {
        let mut set = AttachmentSet::default();
        let mut policy = AttachmentPolicy::draft();
        policy.allowed_types = vec!["image/".to_string(), "application/pdf".to_string()];

        set.add(file("photo.png", 500, "image/png"), &policy, Utc::now()).expect("image prefix");
        set.add(file("doc.pdf", 500, "application/pdf"), &policy, Utc::now()).expect("exact");

        let error = set
            .add(file("notes.txt", 500, "text/plain"), &policy, Utc::now())
            .expect_err("not allowed");
        assert_eq!(error, AttachmentError::UnsupportedType { mime_type: "text/plain".to_string() });
    }

    #[test]
    fn enforces_file_count_cap() {
        let mut set = AttachmentSet::default();
        let mut policy = AttachmentPolicy::draft();
        policy.max_files = 2;

        set.add(file("one.txt", 10, "text/plain"), &policy, Utc::now()).expect("one");
        set.add(file("two.txt", 20, "text/plain"), &policy, Utc::now()).expect("two");
        let error = set
            .add(file("three.txt", 30, "text/plain"), &policy, Utc::now())
            .expect_err("cap reached");

        assert_eq!(error, AttachmentError::TooManyFiles { max_files: 2 });
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut set = AttachmentSet::default();
        let policy = AttachmentPolicy::draft();
        let id = set.add(file("a.txt", 10, "text/plain"), &policy, Utc::now()).expect("add");

        set.remove(&id);
        set.remove(&id);

        assert!(set.is_empty());
    }
}
