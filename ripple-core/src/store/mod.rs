//! Flat-file record storage.
//!
//! Each collection lives in one pretty-printed JSON array under the data
//! directory. Reads are forgiving: a missing, empty or unparsable file is an
//! empty collection, and a single record of unexpected shape is carried
//! along untouched rather than failing its neighbours. Writes replace the
//! whole file, then hand the written records to the replication sink.

mod records;
mod unit_of_work;

pub use records::Records;
pub use unit_of_work::UnitOfWork;

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::constants::DEFAULT_CATEGORIES;
use crate::error::{RippleError, RippleResult};
use crate::mirror::{NoMirror, ReplicationSink};

/// How records of a collection leave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Records are flagged inactive and stay on disk.
    Soft,
    /// Records are removed from the file.
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Events,
    Registrations,
    Categories,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Users,
        Collection::Events,
        Collection::Registrations,
        Collection::Categories,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Events => "events",
            Collection::Registrations => "registrations",
            Collection::Categories => "categories",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.name())
    }

    /// Users are only ever removed by an explicit erasure; events are
    /// cancelled in place; registrations are dropped outright.
    pub fn delete_policy(self) -> DeletePolicy {
        match self {
            Collection::Events => DeletePolicy::Soft,
            Collection::Users | Collection::Registrations | Collection::Categories => {
                DeletePolicy::Hard
            }
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone)]
pub struct RecordStore {
    dir: PathBuf,
    sink: Arc<dyn ReplicationSink>,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        RecordStore {
            dir: dir.into(),
            sink: Arc::new(NoMirror),
        }
    }

    /// Mirror every successful write to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ReplicationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    pub fn ensure_storage_ready(&self) -> RippleResult<()> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|e| {
                RippleError::Storage(format!(
                    "Could not create data directory {}: {e}",
                    self.dir.display()
                ))
            })?;
            info!(dir = %self.dir.display(), "created data directory");
        }
        Ok(())
    }

    /// Create any missing collection file. Categories start with the
    /// default list, everything else empty.
    pub fn initialize(&self) -> RippleResult<()> {
        self.ensure_storage_ready()?;

        for collection in Collection::ALL {
            if self.path(collection).exists() {
                continue;
            }
            match collection {
                Collection::Categories => self.save(collection, DEFAULT_CATEGORIES)?,
                _ => self.save(collection, &Vec::<Value>::new())?,
            }
            info!(%collection, "initialized collection file");
        }
        Ok(())
    }

    /// Load the records of a collection that fit `T`. Never fails:
    /// unreadable files read as empty and unfit records are skipped, both
    /// with a warning.
    pub fn load<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        self.load_records(collection).into_typed()
    }

    /// Load a collection for rewriting. Records that do not fit `T` are
    /// kept and saved back as they were.
    pub fn load_records<T: DeserializeOwned>(&self, collection: Collection) -> Records<T> {
        Records::from_values(collection, self.read_values(collection))
    }

    fn read_values(&self, collection: Collection) -> Vec<Value> {
        if let Err(e) = self.ensure_storage_ready() {
            warn!(%collection, error = %e, "data directory unavailable, reading as empty");
            return Vec::new();
        }

        let path = self.path(collection);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(%collection, "no collection file yet");
                return Vec::new();
            }
            Err(e) => {
                warn!(%collection, path = %path.display(), error = %e, "could not read collection");
                return Vec::new();
            }
        };

        if content.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str(&content) {
            Ok(values) => values,
            Err(e) => {
                warn!(%collection, path = %path.display(), error = %e, "corrupt collection, reading as empty");
                Vec::new()
            }
        }
    }

    /// Overwrite a whole collection with `records`, a sequence.
    pub fn save<R: Serialize + ?Sized>(&self, collection: Collection, records: &R) -> RippleResult<()> {
        let value =
            serde_json::to_value(records).map_err(|e| RippleError::Serialization(e.to_string()))?;
        self.write_value(collection, &value)?;
        self.replicate(collection, &value);
        Ok(())
    }

    /// Start staging writes that must land together.
    pub fn unit_of_work(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self)
    }

    pub(crate) fn write_value(&self, collection: Collection, value: &Value) -> RippleResult<()> {
        self.ensure_storage_ready()?;

        let path = self.path(collection);
        let content = serde_json::to_string_pretty(value)
            .map_err(|e| RippleError::Serialization(e.to_string()))?;

        std::fs::write(&path, content).map_err(|e| {
            error!(%collection, path = %path.display(), error = %e, "could not save collection");
            RippleError::Storage(format!("Could not write {}: {e}", path.display()))
        })?;

        debug!(%collection, "saved collection");
        Ok(())
    }

    /// Best effort: a failing sink never affects the local result.
    pub(crate) fn replicate(&self, collection: Collection, value: &Value) {
        if let Err(e) = self.sink.replicate(collection, value) {
            warn!(%collection, error = %e, "mirror replication failed");
        }
    }
}
