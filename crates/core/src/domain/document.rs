use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachments::AttachmentSet;
use crate::chain::ApprovalChain;
use crate::errors::DomainError;
use crate::validation::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Normal,
    High,
    Urgent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Vacation,
    BusinessTrip,
    Expense,
    Purchase,
    Education,
    Overtime,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vacation => "vacation",
            Self::BusinessTrip => "business_trip",
            Self::Expense => "expense",
            Self::Purchase => "purchase",
            Self::Education => "education",
            Self::Overtime => "overtime",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "vacation" => Ok(Self::Vacation),
            "business_trip" => Ok(Self::BusinessTrip),
            "expense" => Ok(Self::Expense),
            "purchase" => Ok(Self::Purchase),
            "education" => Ok(Self::Education),
            "overtime" => Ok(Self::Overtime),
            other => Err(ValidationError::UnknownDocumentType { raw: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Full,
    HalfMorning,
    HalfAfternoon,
    Hours,
}

/// One requested day (or part of a day) inside a vacation document.
/// Start/end times are only meaningful when `day_type` is `Hours`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationSchedule {
    pub date: NaiveDate,
    pub day_type: DayType,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
}

/// Per-type payload of a document. One variant per document type, each
/// carrying only its own fields; the serde tag doubles as the stored `type`
/// discriminant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedFields {
    Vacation {
        vacation_type: String,
        schedules: Vec<VacationSchedule>,
    },
    BusinessTrip {
        destination: String,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        trip_purpose: String,
    },
    Expense {
        expense_category: String,
        amount: Option<Decimal>,
    },
    Purchase {
        item_name: String,
        quantity: u32,
        unit_price: Option<Decimal>,
    },
    Education {
        education_name: String,
        education_date: Option<NaiveDate>,
    },
    Overtime {
        overtime_date: Option<NaiveDate>,
        overtime_start_time: Option<NaiveTime>,
        overtime_end_time: Option<NaiveTime>,
    },
}

impl TypedFields {
    pub fn doc_type(&self) -> DocumentType {
        match self {
            Self::Vacation { .. } => DocumentType::Vacation,
            Self::BusinessTrip { .. } => DocumentType::BusinessTrip,
            Self::Expense { .. } => DocumentType::Expense,
            Self::Purchase { .. } => DocumentType::Purchase,
            Self::Education { .. } => DocumentType::Education,
            Self::Overtime { .. } => DocumentType::Overtime,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    pub urgency: Urgency,
    pub status: DocumentStatus,
    pub typed_fields: TypedFields,
    pub chain: ApprovalChain,
    pub attachments: AttachmentSet,
    pub requester_id: MemberId,
    pub requester_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new_draft(
        title: impl Into<String>,
        content: impl Into<String>,
        urgency: Urgency,
        typed_fields: TypedFields,
        requester_id: MemberId,
        requester_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DocumentId::generate(),
            title: title.into(),
            content: content.into(),
            urgency,
            status: DocumentStatus::Draft,
            typed_fields,
            chain: ApprovalChain::default(),
            attachments: AttachmentSet::default(),
            requester_id,
            requester_name: requester_name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn doc_type(&self) -> DocumentType {
        self.typed_fields.doc_type()
    }

    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        matches!(
            (self.status, next),
            (DocumentStatus::Draft, DocumentStatus::Pending)
                | (DocumentStatus::Pending, DocumentStatus::Approved)
                | (DocumentStatus::Pending, DocumentStatus::Rejected)
        )
    }

    pub fn transition_to(&mut self, next: DocumentStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidDocumentTransition { from: self.status, to: next })
    }
}
