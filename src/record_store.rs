//! The record store.
//!
//! [`RecordStore`] owns the in-memory collection. Every mutation follows the
//! same sequence: change the collection, persist the full collection, render
//! the full collection. If persisting fails the change is undone before the
//! error is returned, so memory and storage never disagree.

use std::collections::HashSet;

use chrono::Local;
use log::{info, warn};

use crate::app_response::AppResponse;
use crate::calendar::{Calendar, Student};
use crate::config::StoreConfig;
use crate::record_id::IdGenerator;
use crate::record_model::{Record, RecordDraft};
use crate::render::{RecordView, RenderSurface};
use crate::storage::KeyValueStorage;

/// Yes/no confirmation asked before destructive operations.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record was removed and the reduced list persisted.
    Deleted(Record),
    /// No record has that id. Nothing was asked or changed.
    NotFound,
    /// The user answered no.
    Declined,
}

pub struct RecordStore<S: KeyValueStorage, V: RenderSurface> {
    storage: S,
    surface: V,
    config: StoreConfig,
    records: Vec<Record>,
    ids: IdGenerator,
    read_failed: bool,
}

impl<S: KeyValueStorage, V: RenderSurface> RecordStore<S, V> {
    /// Builds the store, loads the stored collection and renders it.
    pub fn open(storage: S, surface: V, config: StoreConfig) -> Result<Self, AppResponse> {
        config.validate()?;
        let mut store = Self {
            storage,
            surface,
            config,
            records: Vec::new(),
            ids: IdGenerator::new(),
            read_failed: false,
        };
        store.load();
        store.render();
        Ok(store)
    }

    /// Replaces the in-memory collection with the stored one.
    ///
    /// A missing value means an empty collection. A value that cannot be read
    /// back as a valid collection is logged and erased, and the collection
    /// starts empty; later loads then see no value at all.
    ///
    /// A failing storage backend also yields an empty collection but erases
    /// nothing, and every mutation is refused until a later `load` succeeds,
    /// so the unread list is never overwritten.
    pub fn load(&mut self) {
        let key = &self.config.storage_key;
        self.read_failed = false;
        self.records = match self.storage.get(key) {
            Ok(None) => Vec::new(),
            Ok(Some(bytes)) => match decode_records(&bytes) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Discarding stored records under '{key}': {e}");
                    if let Err(remove_err) = self.storage.remove(key) {
                        warn!("Could not erase corrupted records: {remove_err}");
                    }
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Could not read stored records under '{key}': {e}");
                self.read_failed = true;
                Vec::new()
            }
        };
        info!("Loaded {} record(s)", self.records.len());
    }

    /// True when the last `load` could not read the storage backend.
    pub fn is_read_only(&self) -> bool {
        self.read_failed
    }

    fn ensure_writable(&self) -> Result<(), AppResponse> {
        if self.read_failed {
            return Err(AppResponse::DatabaseError(
                "Stored records could not be read; reload before changing them".to_string(),
            ));
        }
        Ok(())
    }

    fn persist(&mut self) -> Result<(), AppResponse> {
        let json = serde_json::to_vec(&self.records)?;
        self.storage.set(&self.config.storage_key, &json)
    }

    /// Appends a new record built from `draft` and returns it.
    pub fn create(&mut self, draft: RecordDraft) -> Result<Record, AppResponse> {
        self.ensure_writable()?;
        let id = self.fresh_id();
        let created_at = Local::now().format(&self.config.date_format).to_string();
        let record = Record::new(id, draft, created_at);

        self.records.push(record.clone());
        if let Err(e) = self.persist() {
            self.records.pop();
            warn!("Create rejected, storage write failed: {e}");
            return Err(e);
        }

        info!("Created record {}", record.id());
        self.render();
        Ok(record)
    }

    /// Validates the three raw form fields, then creates the record.
    pub fn create_from_form(&mut self, subject: &str, frequency: &str, students: &str) -> Result<Record, AppResponse> {
        let draft = RecordDraft::parse(subject, frequency, students)?;
        self.create(draft)
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let id = self.ids.next_id();
            if !self.records.iter().any(|r| r.id() == id) {
                return id;
            }
        }
    }

    /// Removes the record with `id` after the user confirms.
    pub fn delete<C: Confirm + ?Sized>(&mut self, id: &str, confirm: &mut C) -> Result<DeleteOutcome, AppResponse> {
        self.ensure_writable()?;
        let index = match self.records.iter().position(|r| r.id() == id) {
            Some(index) => index,
            None => return Ok(DeleteOutcome::NotFound),
        };

        if !confirm.confirm(&self.config.confirm_message) {
            return Ok(DeleteOutcome::Declined);
        }

        let removed = self.records.remove(index);
        if let Err(e) = self.persist() {
            self.records.insert(index, removed);
            warn!("Delete rejected, storage write failed: {e}");
            return Err(e);
        }

        info!("Deleted record {id}");
        self.render();
        Ok(DeleteOutcome::Deleted(removed))
    }

    /// Removes every record after the user confirms. Returns how many went.
    pub fn clear_all<C: Confirm + ?Sized>(&mut self, confirm: &mut C) -> Result<Option<usize>, AppResponse> {
        self.ensure_writable()?;
        if self.records.is_empty() {
            return Ok(Some(0));
        }
        if !confirm.confirm(&self.config.confirm_message) {
            return Ok(None);
        }

        let previous = std::mem::take(&mut self.records);
        if let Err(e) = self.persist() {
            self.records = previous;
            warn!("Clear rejected, storage write failed: {e}");
            return Err(e);
        }

        info!("Cleared {} record(s)", previous.len());
        self.render();
        Ok(Some(previous.len()))
    }

    /// Redraws the whole collection on the surface.
    pub fn render(&mut self) {
        let nodes = RecordView::build(&self.records, &self.config.empty_message);
        self.surface.replace_all(nodes);
    }

    pub fn list(&self) -> &[Record] {
        &self.records
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Builds an interrogation calendar for the record with `id`.
    pub fn calendar_for(&self, id: &str, roster: &[Student]) -> Result<Calendar, AppResponse> {
        let record = self
            .get_by_id(id)
            .ok_or_else(|| AppResponse::NotFound(format!("No record found with id: {id}")))?;
        let calendar = Calendar::build(record, roster)?;
        info!(
            "Built calendar for record {id}: {} lesson(s) over {} week(s)",
            calendar.lessons().len(),
            calendar.weeks()
        );
        Ok(calendar)
    }

    /// The collection as the same JSON array that is stored.
    pub fn export_json(&self) -> Result<String, AppResponse> {
        Ok(serde_json::to_string(&self.records)?)
    }

    pub fn surface(&self) -> &V {
        &self.surface
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[cfg(test)]
    pub(crate) fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

/// Parses a stored collection. Duplicate ids make the whole value invalid.
fn decode_records(bytes: &[u8]) -> Result<Vec<Record>, AppResponse> {
    let records: Vec<Record> = serde_json::from_slice(bytes)?;

    let mut seen = HashSet::with_capacity(records.len());
    for record in &records {
        if !seen.insert(record.id()) {
            return Err(AppResponse::SerializationError(format!(
                "duplicate record id '{}'",
                record.id()
            )));
        }
    }
    Ok(records)
}
