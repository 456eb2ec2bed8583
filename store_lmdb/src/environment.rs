//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::event::LmdbEventStore;
use crate::meta::{LmdbMetaStore, SCHEMA_VERSION};
use crate::LmdbError;

/// Default LMDB map size: 256 MiB.
pub const DEFAULT_MAP_SIZE: usize = 256 << 20;
/// Named databases: `events` and `meta`.
const MAX_DBS: u32 = 2;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    events_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment in `path`.
    ///
    /// A fresh environment is stamped with the current schema version; an
    /// existing one must carry it.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per directory by this
        // process and never mapped twice with conflicting options.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let events_db = env.create_database(&mut wtxn, Some("events"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let this = Self {
            env: Arc::new(env),
            events_db,
            meta_db,
        };

        let meta = this.meta_store();
        match meta.schema_version()? {
            0 => meta.set_schema_version(SCHEMA_VERSION)?,
            SCHEMA_VERSION => {}
            found => {
                return Err(LmdbError::SchemaVersion {
                    found,
                    expected: SCHEMA_VERSION,
                })
            }
        }

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(this)
    }

    pub fn event_store(&self) -> LmdbEventStore {
        LmdbEventStore {
            env: Arc::clone(&self.env),
            events_db: self.events_db,
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}
