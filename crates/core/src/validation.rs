use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::document::{DayType, Document, TypedFields, VacationSchedule};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown document type `{raw}`")]
    UnknownDocumentType { raw: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationResult {
    Valid,
    Invalid { missing_fields: Vec<String> },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn missing_fields(&self) -> &[String] {
        match self {
            Self::Valid => &[],
            Self::Invalid { missing_fields } => missing_fields,
        }
    }
}

/// Required-field rule set keyed by the document's typed payload. Pure and
/// total: a well-formed `Document` always gets a result, never a panic.
pub struct DocumentValidator;

impl DocumentValidator {
    pub fn validate(document: &Document) -> ValidationResult {
        let mut missing = Vec::new();

        if is_blank(&document.title) {
            missing.push("title");
        }
        if is_blank(&document.content) {
            missing.push("content");
        }

        match &document.typed_fields {
            TypedFields::Vacation { vacation_type, schedules } => {
                if is_blank(vacation_type) {
                    missing.push("vacation_type");
                }
                if schedules.is_empty() {
                    missing.push("schedules");
                }
                collect_schedule_gaps(schedules, &mut missing);
            }
            TypedFields::BusinessTrip { destination, start_date, end_date, trip_purpose } => {
                if is_blank(destination) {
                    missing.push("destination");
                }
                if start_date.is_none() {
                    missing.push("start_date");
                }
                if end_date.is_none() {
                    missing.push("end_date");
                }
                if is_blank(trip_purpose) {
                    missing.push("trip_purpose");
                }
            }
            TypedFields::Expense { expense_category, amount } => {
                if is_blank(expense_category) {
                    missing.push("expense_category");
                }
                if !is_positive(amount) {
                    missing.push("amount");
                }
            }
            TypedFields::Purchase { item_name, quantity, unit_price } => {
                if is_blank(item_name) {
                    missing.push("item_name");
                }
                if *quantity == 0 {
                    missing.push("quantity");
                }
                if !is_positive(unit_price) {
                    missing.push("unit_price");
                }
            }
            TypedFields::Education { education_name, education_date } => {
                if is_blank(education_name) {
                    missing.push("education_name");
                }
                if education_date.is_none() {
                    missing.push("education_date");
                }
            }
            TypedFields::Overtime { overtime_date, overtime_start_time, overtime_end_time } => {
                if overtime_date.is_none() {
                    missing.push("overtime_date");
                }
                if overtime_start_time.is_none() {
                    missing.push("overtime_start_time");
                }
                if overtime_end_time.is_none() {
                    missing.push("overtime_end_time");
                }
            }
        }

        if missing.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid {
                missing_fields: missing.into_iter().map(str::to_string).collect(),
            }
        }
    }
}

/// Hourly schedules carry their own time window; whole/half days do not.
fn collect_schedule_gaps(schedules: &[VacationSchedule], missing: &mut Vec<&'static str>) {
    let mut start_missing = false;
    let mut end_missing = false;

    for schedule in schedules {
        if schedule.day_type != DayType::Hours {
            continue;
        }
        start_missing |= schedule.start_time.is_none();
        end_missing |= schedule.end_time.is_none();
    }

    if start_missing {
        missing.push("start_time");
    }
    if end_missing {
        missing.push("end_time");
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn is_positive(value: &Option<Decimal>) -> bool {
    value.map(|amount| amount > Decimal::ZERO).unwrap_or(false)
}
