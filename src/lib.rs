//! # Interrogation Store
//!
//! A small local record store for scheduled interrogation sessions (subject,
//! sessions per week, students per session). It keeps the canonical list in
//! memory, persists the whole list under one key after every change, and
//! renders it through a DOM model that only inserts user text as text nodes.
//!
//! ## Features
//!
//! - **Single-key persistence**: the collection is written as one JSON array
//!   through the [`storage::KeyValueStorage`] trait, backed by LMDB or memory
//! - **Corruption recovery**: unreadable stored data is logged, erased and
//!   replaced by an empty list
//! - **Collision-resistant ids**: base-36 time component plus a random suffix
//! - **Injection-safe rendering**: see [`render`]
//! - **FFI surface**: C-compatible functions returning JSON responses
//!
//! ## Quick Start
//!
//! ```rust
//! use interrogation_store::config::StoreConfig;
//! use interrogation_store::record_store::RecordStore;
//! use interrogation_store::render::HtmlSurface;
//! use interrogation_store::storage::MemoryStorage;
//!
//! let mut store = RecordStore::open(MemoryStorage::new(), HtmlSurface::new(), StoreConfig::default())?;
//! let record = store.create_from_form("Matematica", "2", "3")?;
//! assert_eq!(store.len(), 1);
//! assert!(store.surface().html().contains("Matematica"));
//!
//! store.delete(record.id(), &mut |_: &str| true)?;
//! assert!(store.is_empty());
//! # Ok::<(), interrogation_store::app_response::AppResponse>(())
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_store`] - Open the store backed by `<name>.lmdb`
//! - [`create_store_with_config`] - Open the store from a JSON configuration
//! - [`create_record`] - Validate raw form fields and append a record
//! - [`get_all`] - All records as a JSON array
//! - [`get_by_id`] - One record by id
//! - [`delete_record`] - Delete a record once the host has confirmed
//! - [`clear_all_records`] - Delete every record once the host has confirmed
//! - [`render_records`] - Current list as escaped HTML
//! - [`export_records`] - Stored JSON array
//! - [`build_calendar`] - Random interrogation calendar for a record, as CSV or JSON
//! - [`close_store`] - Release the store
//! - [`free_c_string`] - Release a string returned by this library

pub mod app_response;
pub mod calendar;
pub mod config;
pub mod lmdb_storage;
pub mod record_id;
pub mod record_model;
pub mod record_store;
pub mod render;
pub mod storage;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::str::FromStr;

use log::{info, warn};

use crate::app_response::AppResponse;
use crate::calendar::{parse_roster, ExportFormat};
use crate::config::StoreConfig;
use crate::lmdb_storage::LmdbStorage;
use crate::record_store::{DeleteOutcome, RecordStore};
use crate::render::HtmlSurface;

/// The store type handed across the C ABI.
pub type AppStore = RecordStore<LmdbStorage, HtmlSurface>;

/// Opens the store with default settings and the given database name.
///
/// Returns a null pointer if the name is null, not UTF-8, or the LMDB
/// environment cannot be opened.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::create_store;
///
/// let name = CString::new("registro").unwrap();
/// let store = create_store(name.as_ptr());
/// assert!(!store.is_null());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store(name: *const c_char) -> *mut AppStore {
    if name.is_null() {
        warn!("Null name pointer passed to create_store");
        return std::ptr::null_mut();
    }

    let name_str = match unsafe { CStr::from_ptr(name).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in name parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    let config = StoreConfig {
        db_name: name_str.to_string(),
        ..StoreConfig::default()
    };
    open_store(config)
}

/// Opens the store from a JSON [`StoreConfig`]. Missing fields use defaults.
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::create_store_with_config;
///
/// let json = CString::new(r#"{"db_name":"registro","date_format":"%Y-%m-%d"}"#).unwrap();
/// let store = create_store_with_config(json.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store_with_config(config_json: *const c_char) -> *mut AppStore {
    if config_json.is_null() {
        warn!("Null config pointer passed to create_store_with_config");
        return std::ptr::null_mut();
    }

    let json = match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in config parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    match StoreConfig::from_json(json) {
        Ok(config) => open_store(config),
        Err(e) => {
            warn!("Rejected store configuration: {e}");
            std::ptr::null_mut()
        }
    }
}

fn open_store(config: StoreConfig) -> *mut AppStore {
    let storage = match LmdbStorage::open(&config.db_name, config.map_size) {
        Ok(storage) => storage,
        Err(e) => {
            warn!("❌ Failed to open storage '{}': {e}", config.db_name);
            return std::ptr::null_mut();
        }
    };

    match RecordStore::open(storage, HtmlSurface::new(), config) {
        Ok(store) => {
            info!("✅ Record store ready with {} record(s)", store.len());
            Box::into_raw(Box::new(store))
        }
        Err(e) => {
            warn!("❌ Failed to initialize record store: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Creates a record from the three raw form fields.
///
/// # Parameters
///
/// * `store` - Pointer to the store instance
/// * `subject` - Subject name, trimmed before use
/// * `frequency` - Sessions per week, a positive integer as text
/// * `students` - Students per session, a positive integer as text
///
/// # Returns
///
/// Returns an `Ok` response whose payload is the new record as JSON.
///
/// # Safety
///
/// `store` must be null or a live store pointer; the string arguments must
/// be null or valid null-terminated strings.
///
/// # Errors
///
/// * `BadRequest` - a pointer is null or a string is not valid UTF-8
/// * `ValidationError` - a field is empty, not a positive integer or too long
/// * `DatabaseError` - the write failed, or the stored list could not be
///   read when the store was opened; the list is unchanged
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::{create_store, create_record};
///
/// let name = CString::new("registro").unwrap();
/// let store = create_store(name.as_ptr());
///
/// let subject = CString::new("Matematica").unwrap();
/// let frequency = CString::new("2").unwrap();
/// let students = CString::new("3").unwrap();
/// let result = create_record(store, subject.as_ptr(), frequency.as_ptr(), students.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_record(
    store: *mut AppStore,
    subject: *const c_char,
    frequency: *const c_char,
    students: *const c_char,
) -> *const c_char {
    let store = match store_from_ptr(store, "create_record") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let subject = match c_ptr_to_string(subject, "subject") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let frequency = match c_ptr_to_string(frequency, "frequency") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let students = match c_ptr_to_string(students, "students") {
        Ok(s) => s,
        Err(err) => return err,
    };

    match store.create_from_form(&subject, &frequency, &students) {
        Ok(record) => json_response(&record),
        Err(e) => response_to_c_string(&e),
    }
}

/// Retrieves all records.
///
/// # Parameters
///
/// * `store` - Pointer to the store instance
///
/// # Returns
///
/// Returns a JSON-formatted C string whose `Ok` payload is the JSON array of
/// records in display order (oldest first). The returned string must be
/// released with [`free_c_string`].
///
/// # Safety
///
/// `store` must be null or a pointer returned by [`create_store`] /
/// [`create_store_with_config`] that has not been closed.
///
/// # Errors
///
/// * `BadRequest` - `store` is null
/// * `SerializationError` - the list could not be serialized
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::{create_store, get_all};
///
/// let name = CString::new("registro").unwrap();
/// let store = create_store(name.as_ptr());
///
/// let all_records = get_all(store);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_all(store: *mut AppStore) -> *const c_char {
    match store_from_ptr(store, "get_all") {
        Ok(store) => json_response(store.list()),
        Err(err) => err,
    }
}

/// Retrieves a record by its id.
///
/// # Parameters
///
/// * `store` - Pointer to the store instance
/// * `id` - Null-terminated C string containing the record id
///
/// # Returns
///
/// Returns a JSON-formatted C string whose `Ok` payload is the record as JSON.
///
/// # Safety
///
/// `store` must be null or a live store pointer; `id` must be null or a
/// valid null-terminated string.
///
/// # Errors
///
/// * `BadRequest` - a pointer is null or `id` is not valid UTF-8
/// * `NotFound` - no record has that id
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::{create_store, get_by_id};
///
/// let name = CString::new("registro").unwrap();
/// let store = create_store(name.as_ptr());
///
/// let id = CString::new("m1x2y3z4abcdefghi").unwrap();
/// let result = get_by_id(store, id.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_by_id(store: *mut AppStore, id: *const c_char) -> *const c_char {
    let store = match store_from_ptr(store, "get_by_id") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(err) => return err,
    };

    match store.get_by_id(&id_str) {
        Some(record) => json_response(record),
        None => response_to_c_string(&AppResponse::NotFound(format!("No record found with id: {id_str}"))),
    }
}

/// Deletes a record by its id.
///
/// The host asks the user first and passes the answer in `confirmed`.
///
/// # Parameters
///
/// * `store` - Pointer to the store instance
/// * `id` - Null-terminated C string containing the record id
/// * `confirmed` - Whether the user agreed to the deletion
///
/// # Returns
///
/// Returns an `Ok` response when the record was deleted, when the user
/// declined, and when no record has that id (nothing is changed in the last
/// two cases).
///
/// # Safety
///
/// `store` must be null or a live store pointer; `id` must be null or a
/// valid null-terminated string.
///
/// # Errors
///
/// * `BadRequest` - a pointer is null or `id` is not valid UTF-8
/// * `DatabaseError` - the reduced list could not be written; the record is kept
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::{create_store, delete_record};
///
/// let name = CString::new("registro").unwrap();
/// let store = create_store(name.as_ptr());
///
/// let id = CString::new("m1x2y3z4abcdefghi").unwrap();
/// let result = delete_record(store, id.as_ptr(), true);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_record(store: *mut AppStore, id: *const c_char, confirmed: bool) -> *const c_char {
    let store = match store_from_ptr(store, "delete_record") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(err) => return err,
    };

    let response = match store.delete(&id_str, &mut |_: &str| confirmed) {
        Ok(DeleteOutcome::Deleted(_)) => AppResponse::success("Record deleted successfully"),
        Ok(DeleteOutcome::NotFound) => AppResponse::success(format!("No record with id {id_str}; nothing deleted")),
        Ok(DeleteOutcome::Declined) => AppResponse::success("Deletion cancelled"),
        Err(e) => e,
    };
    response_to_c_string(&response)
}

/// Clears all records.
///
/// # Parameters
///
/// * `store` - Pointer to the store instance
/// * `confirmed` - Whether the user agreed to remove everything
///
/// # Returns
///
/// Returns an `Ok` response with the number of records cleared, or
/// `"Clear cancelled"` when `confirmed` is false.
///
/// # Safety
///
/// `store` must be null or a live store pointer.
///
/// # Errors
///
/// * `BadRequest` - `store` is null
/// * `DatabaseError` - the empty list could not be written; nothing is removed
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::{create_store, clear_all_records};
///
/// let name = CString::new("registro").unwrap();
/// let store = create_store(name.as_ptr());
///
/// let result = clear_all_records(store, true);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn clear_all_records(store: *mut AppStore, confirmed: bool) -> *const c_char {
    let store = match store_from_ptr(store, "clear_all_records") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let response = match store.clear_all(&mut |_: &str| confirmed) {
        Ok(Some(count)) => AppResponse::success(format!("{count} record(s) cleared")),
        Ok(None) => AppResponse::success("Clear cancelled"),
        Err(e) => e,
    };
    response_to_c_string(&response)
}

/// Renders the current list as HTML.
///
/// # Parameters
///
/// * `store` - Pointer to the store instance
///
/// # Returns
///
/// Returns an `Ok` response whose payload is the list markup. User text is
/// escaped, so it can be inserted as HTML by the host. An empty list renders
/// as a single `<p class="empty-state">` placeholder.
///
/// # Safety
///
/// `store` must be null or a live store pointer.
///
/// # Errors
///
/// * `BadRequest` - `store` is null
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::{create_store, render_records};
///
/// let name = CString::new("registro").unwrap();
/// let store = create_store(name.as_ptr());
///
/// let html = render_records(store);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn render_records(store: *mut AppStore) -> *const c_char {
    match store_from_ptr(store, "render_records") {
        Ok(store) => {
            store.render();
            response_to_c_string(&AppResponse::Ok(store.surface().html()))
        }
        Err(err) => err,
    }
}

/// Exports the collection as the JSON array kept in storage.
///
/// # Parameters
///
/// * `store` - Pointer to the store instance
///
/// # Returns
///
/// Returns an `Ok` response whose payload is the stored JSON array.
///
/// # Safety
///
/// `store` must be null or a live store pointer.
///
/// # Errors
///
/// * `BadRequest` - `store` is null
/// * `SerializationError` - the list could not be serialized
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::{create_store, export_records};
///
/// let name = CString::new("registro").unwrap();
/// let store = create_store(name.as_ptr());
///
/// let json = export_records(store);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn export_records(store: *mut AppStore) -> *const c_char {
    let store = match store_from_ptr(store, "export_records") {
        Ok(s) => s,
        Err(err) => return err,
    };

    match store.export_json() {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => response_to_c_string(&e),
    }
}

/// Builds a random interrogation calendar for one record and exports it.
///
/// # Parameters
///
/// * `store` - Pointer to the store instance
/// * `id` - Null-terminated C string containing the record id
/// * `roster_json` - Null-terminated JSON array of students
///   (`registerNumber`, `firstName`, `lastName`)
/// * `format` - `"csv"` or `"json"`; null or empty means CSV
///
/// # Returns
///
/// Returns an `Ok` response whose payload is the calendar in the requested
/// format.
///
/// # Safety
///
/// `store` must be null or a live store pointer; the string arguments must
/// be null or valid null-terminated strings.
///
/// # Errors
///
/// * `BadRequest` - `store`, `id` or `roster_json` is null, or a string is not valid UTF-8
/// * `NotFound` - no record has that id
/// * `ValidationError` - malformed roster, duplicate register numbers or an
///   unknown format
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::{create_store, build_calendar};
///
/// let name = CString::new("registro").unwrap();
/// let store = create_store(name.as_ptr());
///
/// let id = CString::new("m1x2y3z4abcdefghi").unwrap();
/// let roster = CString::new(r#"[{"registerNumber":1,"firstName":"Anna","lastName":"Bianchi"}]"#).unwrap();
/// let format = CString::new("csv").unwrap();
/// let result = build_calendar(store, id.as_ptr(), roster.as_ptr(), format.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn build_calendar(
    store: *mut AppStore,
    id: *const c_char,
    roster_json: *const c_char,
    format: *const c_char,
) -> *const c_char {
    let store = match store_from_ptr(store, "build_calendar") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(err) => return err,
    };
    let roster_str = match c_ptr_to_string(roster_json, "roster") {
        Ok(roster) => roster,
        Err(err) => return err,
    };
    let format_str = if format.is_null() {
        String::new()
    } else {
        match c_ptr_to_string(format, "format") {
            Ok(format) => format,
            Err(err) => return err,
        }
    };

    let exported = ExportFormat::from_str(&format_str).and_then(|format| {
        let roster = parse_roster(&roster_str)?;
        store.calendar_for(&id_str, &roster)?.export(format)
    });

    match exported {
        Ok(text) => response_to_c_string(&AppResponse::Ok(text)),
        Err(e) => response_to_c_string(&e),
    }
}

/// Explicitly closes the store and releases its memory.
///
/// # Parameters
///
/// * `store` - Pointer returned by [`create_store`] or [`create_store_with_config`]
///
/// # Returns
///
/// Returns an `Ok` response once the store and its LMDB environment are released.
///
/// # Safety
///
/// `store` must be null or a live store pointer, and must not be used after
/// this call.
///
/// # Errors
///
/// * `BadRequest` - `store` is null
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use interrogation_store::{create_store, close_store};
///
/// let name = CString::new("registro").unwrap();
/// let store = create_store(name.as_ptr());
///
/// let result = close_store(store);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_store(store: *mut AppStore) -> *const c_char {
    if store.is_null() {
        let error = AppResponse::BadRequest("Null store pointer passed to close_store".to_string());
        return response_to_c_string(&error);
    }

    drop(unsafe { Box::from_raw(store) });
    response_to_c_string(&AppResponse::success("Store closed successfully"))
}

/// Releases a string returned by any function of this library.
///
/// # Parameters
///
/// * `ptr` - A string returned by this library, or null
///
/// # Safety
///
/// `ptr` must come from this library and must not be freed twice.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_c_string(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr as *mut c_char) });
}

fn store_from_ptr<'a>(store: *mut AppStore, operation: &str) -> Result<&'a mut AppStore, *const c_char> {
    match unsafe { store.as_mut() } {
        Some(s) => Ok(s),
        None => {
            let error = AppResponse::BadRequest(format!("Null store pointer passed to {operation}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn json_response<T: serde::Serialize + ?Sized>(value: &T) -> *const c_char {
    match serde_json::to_string(value) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Failed to serialize result: {e}"));
            response_to_c_string(&error)
        }
    }
}

/// Converts an [`AppResponse`] to a C string owned by the caller.
///
/// Returns a null pointer if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust String, turning null pointers and
/// invalid UTF-8 into a ready-made `BadRequest` response.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
