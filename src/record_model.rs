//! Data model for scheduled interrogation entries.
//!
//! A [`Record`] is created once by the store and never changed afterwards.
//! Raw form input goes through [`RecordDraft::parse`] first, so a draft that
//! reaches the store is always valid.
//!
//! # Stored format
//!
//! The whole collection is stored as one JSON array:
//!
//! ```json
//! [
//!   {
//!     "id": "m1x2y3z4abcdefghi",
//!     "subject": "Matematica",
//!     "frequencyPerWeek": 2,
//!     "studentsPerSession": 3,
//!     "createdAt": "18/10/2026"
//!   }
//! ]
//! ```
//!
//! Older page revisions wrote Italian field names and numeric ids; both are
//! still accepted when reading:
//!
//! ```rust
//! use interrogation_store::record_model::Record;
//!
//! let legacy = r#"{"id":1718000000000,"materia":"Storia","frequenza":1,"alunni":4,"dataCreazione":"10/06/2024"}"#;
//! let record: Record = serde_json::from_str(legacy)?;
//! assert_eq!(record.id(), "1718000000000");
//! assert_eq!(record.subject(), "Storia");
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::num::NonZeroU32;

use serde::{Deserialize, Deserializer, Serialize};

use crate::app_response::AppResponse;

/// Longest subject we accept, counted in characters.
pub const MAX_SUBJECT_CHARS: usize = 200;

/// One scheduled interrogation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(deserialize_with = "id_from_text_or_number")]
    id: String,

    #[serde(alias = "materia", deserialize_with = "non_blank")]
    subject: String,

    #[serde(alias = "frequenza")]
    frequency_per_week: NonZeroU32,

    #[serde(alias = "alunni")]
    students_per_session: NonZeroU32,

    #[serde(alias = "dataCreazione", deserialize_with = "non_blank")]
    created_at: String,
}

impl Record {
    pub(crate) fn new(id: String, draft: RecordDraft, created_at: String) -> Self {
        Self {
            id,
            subject: draft.subject,
            frequency_per_week: draft.frequency_per_week,
            students_per_session: draft.students_per_session,
            created_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn frequency_per_week(&self) -> u32 {
        self.frequency_per_week.get()
    }

    pub fn students_per_session(&self) -> u32 {
        self.students_per_session.get()
    }

    /// Localized creation date, fixed when the record was created.
    pub fn created_at(&self) -> &str {
        &self.created_at
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

fn id_from_text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    };
    if id.is_empty() {
        return Err(serde::de::Error::custom("record id must not be empty"));
    }
    Ok(id)
}

fn non_blank<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    if text.trim().is_empty() {
        return Err(serde::de::Error::custom("field must not be blank"));
    }
    Ok(text)
}

/// Validated input for a new record.
///
/// ```rust
/// use interrogation_store::record_model::RecordDraft;
///
/// let draft = RecordDraft::parse("  Fisica ", "2", " 3")?;
/// assert_eq!(draft.subject(), "Fisica");
/// assert!(RecordDraft::parse("Fisica", "0", "3").is_err());
/// # Ok::<(), interrogation_store::app_response::AppResponse>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    subject: String,
    frequency_per_week: NonZeroU32,
    students_per_session: NonZeroU32,
}

impl RecordDraft {
    /// Builds a draft from already-typed values.
    pub fn new(subject: &str, frequency_per_week: u32, students_per_session: u32) -> Result<Self, AppResponse> {
        Ok(Self {
            subject: validate_subject(subject)?,
            frequency_per_week: positive("frequencyPerWeek", frequency_per_week)?,
            students_per_session: positive("studentsPerSession", students_per_session)?,
        })
    }

    /// Builds a draft from the three raw text fields of the form.
    pub fn parse(subject: &str, frequency_text: &str, students_text: &str) -> Result<Self, AppResponse> {
        Ok(Self {
            subject: validate_subject(subject)?,
            frequency_per_week: parse_positive("frequencyPerWeek", frequency_text)?,
            students_per_session: parse_positive("studentsPerSession", students_text)?,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn frequency_per_week(&self) -> u32 {
        self.frequency_per_week.get()
    }

    pub fn students_per_session(&self) -> u32 {
        self.students_per_session.get()
    }
}

fn validate_subject(raw: &str) -> Result<String, AppResponse> {
    let subject = raw.trim();
    if subject.is_empty() {
        return Err(AppResponse::ValidationError("subject must not be empty".to_string()));
    }
    let chars = subject.chars().count();
    if chars > MAX_SUBJECT_CHARS {
        return Err(AppResponse::ValidationError(format!(
            "subject is too long ({chars} characters, max {MAX_SUBJECT_CHARS})"
        )));
    }
    Ok(subject.to_string())
}

fn positive(field: &str, value: u32) -> Result<NonZeroU32, AppResponse> {
    NonZeroU32::new(value)
        .ok_or_else(|| AppResponse::ValidationError(format!("{field} must be a positive integer, got 0")))
}

fn parse_positive(field: &str, raw: &str) -> Result<NonZeroU32, AppResponse> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(AppResponse::ValidationError(format!("{field} is required")));
    }
    let value: u32 = text.parse().map_err(|_| {
        AppResponse::ValidationError(format!("{field} must be a positive integer, got '{text}'"))
    })?;
    positive(field, value)
}
