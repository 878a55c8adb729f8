//! Store configuration.
//!
//! [`StoreConfig`] is usually built with [`Default`] or deserialized from the
//! JSON object a host page passes to `create_store_with_config`. Every field
//! is optional in JSON; missing fields fall back to their defaults.

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

/// Smallest LMDB map we accept. Anything lower cannot hold a useful list.
pub const MIN_MAP_SIZE: usize = 64 * 1024;

/// Settings shared by the storage backend, the store and the renderer.
///
/// # Examples
///
/// ```rust
/// use interrogation_store::config::StoreConfig;
///
/// let config = StoreConfig::from_json(r#"{"db_name":"classe_3b"}"#)?;
/// assert_eq!(config.db_name, "classe_3b");
/// assert_eq!(config.storage_key, "interrogazioniProgrammate");
/// # Ok::<(), interrogation_store::app_response::AppResponse>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base name of the LMDB environment; the directory is `<db_name>.lmdb`.
    pub db_name: String,

    /// Fixed key under which the whole record list is stored.
    pub storage_key: String,

    /// LMDB map size in bytes. Writes beyond it fail with a quota error.
    pub map_size: usize,

    /// chrono strftime pattern used to stamp `createdAt`.
    pub date_format: String,

    /// Placeholder text shown when there are no records.
    pub empty_message: String,

    /// Prompt handed to the confirmation capability before a delete.
    pub confirm_message: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_name: "interrogazioni_programmate".to_string(),
            storage_key: "interrogazioniProgrammate".to_string(),
            map_size: 10 * 1024 * 1024,
            date_format: "%d/%m/%Y".to_string(),
            empty_message: "Nessuna interrogazione programmata".to_string(),
            confirm_message: "Sei sicuro di voler eliminare questa interrogazione?".to_string(),
        }
    }
}

impl StoreConfig {
    /// Parses and validates a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self, AppResponse> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field for values the store cannot work with.
    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.db_name.trim().is_empty() {
            return Err(AppResponse::ValidationError("db_name must not be empty".to_string()));
        }
        if self.storage_key.is_empty() {
            return Err(AppResponse::ValidationError("storage_key must not be empty".to_string()));
        }
        if self.map_size < MIN_MAP_SIZE {
            return Err(AppResponse::ValidationError(format!(
                "map_size must be at least {MIN_MAP_SIZE} bytes, got {}",
                self.map_size
            )));
        }
        if self.date_format.is_empty()
            || StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error))
        {
            return Err(AppResponse::ValidationError(format!(
                "date_format '{}' is not a valid strftime pattern",
                self.date_format
            )));
        }
        Ok(())
    }
}
