//! Interrogation calendars.
//!
//! A [`Calendar`] spreads a class roster over the lessons a [`Record`]
//! describes: `frequency_per_week` lessons each week, `students_per_session`
//! students per lesson. The roster is shuffled once and then consumed in
//! order, so nobody is called twice before everyone has been called once.
//!
//! ```rust
//! use interrogation_store::calendar::{Calendar, ExportFormat, Student};
//! use interrogation_store::config::StoreConfig;
//! use interrogation_store::record_store::RecordStore;
//! use interrogation_store::render::HtmlSurface;
//! use interrogation_store::storage::MemoryStorage;
//!
//! let mut store = RecordStore::open(MemoryStorage::new(), HtmlSurface::new(), StoreConfig::default())?;
//! let record = store.create_from_form("Storia", "2", "2")?;
//!
//! let roster = vec![
//!     Student::new(1, "Anna", "Bianchi")?,
//!     Student::new(2, "Marco", "Rossi")?,
//!     Student::new(3, "Sara", "Verdi")?,
//! ];
//! let calendar = Calendar::build(&record, &roster)?;
//! assert_eq!(calendar.lessons().len(), 2);
//!
//! let csv = calendar.export(ExportFormat::Csv)?;
//! assert!(csv.starts_with("Materia,Lezione"));
//! # Ok::<(), interrogation_store::app_response::AppResponse>(())
//! ```

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::Local;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::app_response::AppResponse;
use crate::record_model::Record;

/// One student of the class roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(alias = "registro_num")]
    register_number: NonZeroU32,

    #[serde(alias = "nome", deserialize_with = "trimmed_name")]
    first_name: String,

    #[serde(alias = "cognome", deserialize_with = "trimmed_name")]
    last_name: String,
}

impl Student {
    pub fn new(register_number: u32, first_name: &str, last_name: &str) -> Result<Self, AppResponse> {
        let register_number = NonZeroU32::new(register_number).ok_or_else(|| {
            AppResponse::ValidationError("register number must be a positive integer".to_string())
        })?;
        Ok(Self {
            register_number,
            first_name: check_name("first name", first_name)?,
            last_name: check_name("last name", last_name)?,
        })
    }

    pub fn register_number(&self) -> u32 {
        self.register_number.get()
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }
}

fn check_name(field: &str, raw: &str) -> Result<String, AppResponse> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppResponse::ValidationError(format!("{field} must not be empty")));
    }
    Ok(name.to_string())
}

fn trimmed_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    check_name("name", &raw).map_err(serde::de::Error::custom)
}

/// Parses a roster sent as a JSON array of students.
///
/// Accepts both `registerNumber`/`firstName`/`lastName` and the
/// `registro_num`/`nome`/`cognome` names used by older exports.
pub fn parse_roster(json: &str) -> Result<Vec<Student>, AppResponse> {
    let roster: Vec<Student> = serde_json::from_str(json)
        .map_err(|e| AppResponse::ValidationError(format!("Invalid roster: {e}")))?;
    check_unique(&roster)?;
    Ok(roster)
}

fn check_unique(roster: &[Student]) -> Result<(), AppResponse> {
    let mut seen = HashSet::with_capacity(roster.len());
    for student in roster {
        if !seen.insert(student.register_number) {
            return Err(AppResponse::ValidationError(format!(
                "register number {} appears more than once",
                student.register_number
            )));
        }
    }
    Ok(())
}

/// One lesson with the students called in it, in calling order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// 1-based, counted across the whole calendar.
    pub number: u32,
    /// 1-based week the lesson falls in.
    pub week: u32,
    /// 1-based position of the lesson inside its week.
    pub day: u32,
    pub students: Vec<Student>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    subject: String,
    frequency_per_week: u32,
    students_per_session: u32,
    lessons: Vec<Lesson>,
}

impl Calendar {
    /// Builds a calendar with a freshly shuffled roster.
    pub fn build(record: &Record, roster: &[Student]) -> Result<Self, AppResponse> {
        Self::build_with_rng(record, roster, &mut rand::thread_rng())
    }

    /// Builds a calendar shuffling with `rng`.
    pub fn build_with_rng<R: Rng + ?Sized>(
        record: &Record,
        roster: &[Student],
        rng: &mut R,
    ) -> Result<Self, AppResponse> {
        check_unique(roster)?;

        let mut order = roster.to_vec();
        order.shuffle(rng);

        let per_week = record.frequency_per_week();
        let per_lesson = record.students_per_session() as usize;
        let lessons = order
            .chunks(per_lesson)
            .zip(0u32..)
            .map(|(students, index)| Lesson {
                number: index + 1,
                week: index / per_week + 1,
                day: index % per_week + 1,
                students: students.to_vec(),
            })
            .collect();

        Ok(Self {
            subject: record.subject().to_string(),
            frequency_per_week: per_week,
            students_per_session: record.students_per_session(),
            lessons,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    /// Number of weeks needed to call every student.
    pub fn weeks(&self) -> u32 {
        self.lessons.last().map_or(0, |lesson| lesson.week)
    }

    pub fn export(&self, format: ExportFormat) -> Result<String, AppResponse> {
        match format {
            ExportFormat::Csv => self.to_csv(),
            ExportFormat::Json => self.to_json(),
        }
    }

    /// One row per called student, with an Italian header row.
    pub fn to_csv(&self) -> Result<String, AppResponse> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for lesson in &self.lessons {
            for (student, order) in lesson.students.iter().zip(1u32..) {
                wtr.serialize(CalendarRow {
                    subject: &self.subject,
                    lesson: lesson.number,
                    week: lesson.week,
                    day: lesson.day,
                    order,
                    register_number: student.register_number(),
                    first_name: student.first_name(),
                    last_name: student.last_name(),
                })?;
            }
        }
        if self.lessons.is_empty() {
            wtr.write_record(CSV_HEADER)?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| AppResponse::SerializationError(format!("CSV flush failed: {e}")))?;
        String::from_utf8(bytes).map_err(|e| AppResponse::SerializationError(format!("CSV is not UTF-8: {e}")))
    }

    pub fn to_json(&self) -> Result<String, AppResponse> {
        let export = CalendarExport {
            subject: &self.subject,
            frequency_per_week: self.frequency_per_week,
            students_per_session: self.students_per_session,
            exported_at: Local::now().to_rfc3339(),
            lessons: &self.lessons,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }
}

const CSV_HEADER: [&str; 8] = ["Materia", "Lezione", "Settimana", "Giorno", "Ordine", "Registro", "Nome", "Cognome"];

#[derive(Serialize)]
struct CalendarRow<'a> {
    #[serde(rename = "Materia")]
    subject: &'a str,
    #[serde(rename = "Lezione")]
    lesson: u32,
    #[serde(rename = "Settimana")]
    week: u32,
    #[serde(rename = "Giorno")]
    day: u32,
    #[serde(rename = "Ordine")]
    order: u32,
    #[serde(rename = "Registro")]
    register_number: u32,
    #[serde(rename = "Nome")]
    first_name: &'a str,
    #[serde(rename = "Cognome")]
    last_name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarExport<'a> {
    subject: &'a str,
    frequency_per_week: u32,
    students_per_session: u32,
    exported_at: String,
    lessons: &'a [Lesson],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = AppResponse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(AppResponse::ValidationError(format!(
                "unsupported export format '{other}', expected csv or json"
            ))),
        }
    }
}
