//! LMDB-backed [`KeyValueStorage`].
//!
//! The environment lives in a directory named `<name>.lmdb` and holds a single
//! named database. Every `set` and `remove` is its own write transaction, so a
//! crash leaves either the old or the new value under a key, never a mix.

use std::path::{Path, PathBuf};

use lmdb::{Database, DatabaseFlags, Environment, Error as LmdbError, Transaction, WriteFlags};
use log::{debug, info};

use crate::app_response::AppResponse;
use crate::storage::KeyValueStorage;

const DB_NAME: &str = "kv";

pub struct LmdbStorage {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl LmdbStorage {
    /// Opens (or creates) the environment `<name>.lmdb`.
    ///
    /// # Errors
    ///
    /// Returns [`AppResponse::DatabaseError`] if the directory cannot be
    /// created or LMDB refuses to open it.
    pub fn open(name: &str, map_size: usize) -> Result<Self, AppResponse> {
        let path = PathBuf::from(format!("{name}.lmdb"));
        Self::open_at(&path, map_size)
    }

    /// Opens (or creates) an environment at an explicit directory.
    pub fn open_at(path: &Path, map_size: usize) -> Result<Self, AppResponse> {
        std::fs::create_dir_all(path).map_err(|e| {
            AppResponse::DatabaseError(format!("Cannot create storage directory {}: {e}", path.display()))
        })?;

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(map_size)
            .open(path)?;
        let db = env.create_db(Some(DB_NAME), DatabaseFlags::empty())?;

        info!("Opened LMDB storage at {}", path.display());
        Ok(Self { env, db, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStorage for LmdbStorage {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let value = match txn.get(self.db, &key) {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(LmdbError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        txn.abort();
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &key, &value, WriteFlags::empty())?;
        txn.commit()?;
        debug!("Wrote {} bytes under '{key}'", value.len());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        match txn.del(self.db, &key, None) {
            Ok(()) | Err(LmdbError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        txn.commit()?;
        debug!("Removed '{key}'");
        Ok(())
    }
}
