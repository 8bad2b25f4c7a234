//! Embedded persistence for run records, device-name→lease mappings, and
//! config snapshots, backed by `pickledb` (`spec.md` §6, `storage_path`
//! default `$HOME/.niac/niac.db`).
//!
//! Storage can be disabled entirely (`--storage disabled`), and a failure
//! to open the on-disk database degrades to an in-memory store rather than
//! failing the run — logged once, not on every subsequent operation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use niac_types::{Error, RunRecord};
use pickledb::{PickleDb, PickleDbDumpPolicy, SerializationMethod};

const RUNS_BUCKET: &str = "runs";
const MAPPINGS_BUCKET: &str = "mappings";
const SNAPSHOTS_BUCKET: &str = "config_snapshots";

/// One saved configuration, keyed by name, for the `config export`/
/// template workflow.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConfigSnapshot {
    pub name: String,
    pub yaml: String,
    pub saved_at: DateTime<Utc>,
}

/// Default location per `spec.md` §6: `$HOME/.niac/niac.db`.
pub fn default_storage_path() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".niac").join("niac.db")
}

enum Backend {
    Disabled,
    Db(PickleDb),
    /// The DB failed to open or a write failed; subsequent operations keep
    /// working against these in-memory buckets.
    Degraded {
        runs: Vec<RunRecord>,
        mappings: std::collections::HashMap<String, String>,
        snapshots: Vec<ConfigSnapshot>,
    },
}

pub struct Store {
    backend: Mutex<Backend>,
    degraded_warned: AtomicBool,
}

impl Store {
    pub fn disabled() -> Self {
        Store { backend: Mutex::new(Backend::Disabled), degraded_warned: AtomicBool::new(false) }
    }

    /// Opens (creating if absent) the pickledb at `path`. Never fails: a
    /// broken database degrades to in-memory storage instead.
    pub fn open(path: &Path) -> Self {
        let backend = match open_or_create(path) {
            Ok(db) => Backend::Db(db),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "storage unavailable, degrading to in-memory");
                Backend::Degraded { runs: Vec::new(), mappings: Default::default(), snapshots: Vec::new() }
            }
        };
        let degraded = backend_is_degraded(&backend);
        Store { backend: Mutex::new(backend), degraded_warned: AtomicBool::new(degraded) }
    }

    pub fn append_run(&self, record: &RunRecord) -> Result<(), Error> {
        let mut backend = self.backend.lock().unwrap();
        match &mut *backend {
            Backend::Disabled => Ok(()),
            Backend::Db(db) => {
                if !db.lexists(RUNS_BUCKET) {
                    let _ = db.lcreate(RUNS_BUCKET);
                }
                match db.ladd(RUNS_BUCKET, record) {
                    Some(_) => Ok(()),
                    None => {
                        self.warn_degraded("append_run");
                        *backend = Backend::Degraded { runs: vec![record.clone()], mappings: Default::default(), snapshots: Vec::new() };
                        Ok(())
                    }
                }
            }
            Backend::Degraded { runs, .. } => {
                runs.push(record.clone());
                Ok(())
            }
        }
    }

    pub fn list_runs(&self) -> Vec<RunRecord> {
        let backend = self.backend.lock().unwrap();
        match &*backend {
            Backend::Disabled => Vec::new(),
            Backend::Db(db) => db
                .liter(RUNS_BUCKET)
                .filter_map(|item| item.get_item::<RunRecord>())
                .collect(),
            Backend::Degraded { runs, .. } => runs.clone(),
        }
    }

    pub fn set_mapping(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut backend = self.backend.lock().unwrap();
        match &mut *backend {
            Backend::Disabled => Ok(()),
            Backend::Db(db) => {
                let map_key = format!("{MAPPINGS_BUCKET}:{key}");
                db.set(&map_key, &value.to_string()).map_err(|e| {
                    self.warn_degraded("set_mapping");
                    Error::StorageUnavailable(e.to_string())
                })
            }
            Backend::Degraded { mappings, .. } => {
                mappings.insert(key.to_string(), value.to_string());
                Ok(())
            }
        }
    }

    pub fn get_mapping(&self, key: &str) -> Option<String> {
        let backend = self.backend.lock().unwrap();
        match &*backend {
            Backend::Disabled => None,
            Backend::Db(db) => db.get::<String>(&format!("{MAPPINGS_BUCKET}:{key}")),
            Backend::Degraded { mappings, .. } => mappings.get(key).cloned(),
        }
    }

    pub fn save_snapshot(&self, snapshot: ConfigSnapshot) -> Result<(), Error> {
        let mut backend = self.backend.lock().unwrap();
        match &mut *backend {
            Backend::Disabled => Ok(()),
            Backend::Db(db) => {
                if !db.lexists(SNAPSHOTS_BUCKET) {
                    let _ = db.lcreate(SNAPSHOTS_BUCKET);
                }
                db.ladd(SNAPSHOTS_BUCKET, &snapshot);
                Ok(())
            }
            Backend::Degraded { snapshots, .. } => {
                snapshots.push(snapshot);
                Ok(())
            }
        }
    }

    pub fn list_snapshots(&self) -> Vec<ConfigSnapshot> {
        let backend = self.backend.lock().unwrap();
        match &*backend {
            Backend::Disabled => Vec::new(),
            Backend::Db(db) => db
                .liter(SNAPSHOTS_BUCKET)
                .filter_map(|item| item.get_item::<ConfigSnapshot>())
                .collect(),
            Backend::Degraded { snapshots, .. } => snapshots.clone(),
        }
    }

    fn warn_degraded(&self, operation: &str) {
        if !self.degraded_warned.swap(true, Ordering::SeqCst) {
            tracing::warn!(operation, "storage write failed, degrading to in-memory for remainder of run");
        }
    }
}

fn backend_is_degraded(backend: &Backend) -> bool {
    matches!(backend, Backend::Degraded { .. })
}

fn open_or_create(path: &Path) -> Result<PickleDb, pickledb::error::Error> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if path.exists() {
        PickleDb::load(path, PickleDbDumpPolicy::AutoDump, SerializationMethod::Json)
    } else {
        Ok(PickleDb::new(path, PickleDbDumpPolicy::AutoDump, SerializationMethod::Json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_store_is_a_no_op() {
        let store = Store::disabled();
        assert!(store.list_runs().is_empty());
        assert_eq!(store.get_mapping("x"), None);
    }
}
