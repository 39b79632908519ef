//! Multi-collection writes that land together or not at all.

use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use super::{Collection, RecordStore};
use crate::error::{RippleError, RippleResult};

/// Staged whole-collection writes.
///
/// `commit` writes the staged collections in order. If one write fails,
/// files already written in this commit get their previous contents back
/// (or are removed if they did not exist) before the error is returned.
/// Mirrors only hear about a commit that fully succeeded.
pub struct UnitOfWork<'a> {
    store: &'a RecordStore,
    staged: Vec<(Collection, Value)>,
}

impl<'a> UnitOfWork<'a> {
    pub(super) fn new(store: &'a RecordStore) -> Self {
        UnitOfWork {
            store,
            staged: Vec::new(),
        }
    }

    pub fn stage<R: Serialize + ?Sized>(
        &mut self,
        collection: Collection,
        records: &R,
    ) -> RippleResult<()> {
        let value =
            serde_json::to_value(records).map_err(|e| RippleError::Serialization(e.to_string()))?;
        self.staged.push((collection, value));
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn commit(self) -> RippleResult<()> {
        let mut applied: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::new();

        for (collection, value) in &self.staged {
            let path = self.store.path(*collection);

            let previous = match std::fs::read(&path) {
                Ok(bytes) => Some(bytes),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => {
                    error!(%collection, error = %e, "could not snapshot collection before write");
                    rollback(&applied);
                    return Err(RippleError::Storage(format!(
                        "Could not read {}: {e}",
                        path.display()
                    )));
                }
            };

            if let Err(e) = self.store.write_value(*collection, value) {
                rollback(&applied);
                return Err(e);
            }
            applied.push((path, previous));
        }

        for (collection, value) in &self.staged {
            self.store.replicate(*collection, value);
        }
        Ok(())
    }
}

fn rollback(applied: &[(PathBuf, Option<Vec<u8>>)]) {
    for (path, previous) in applied.iter().rev() {
        let restored = match previous {
            Some(bytes) => std::fs::write(path, bytes),
            None => std::fs::remove_file(path),
        };
        match restored {
            Ok(()) => warn!(path = %path.display(), "rolled back partial write"),
            Err(e) => error!(path = %path.display(), error = %e, "rollback failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::ReplicationSink;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<Collection>>,
    }

    impl ReplicationSink for RecordingSink {
        fn replicate(&self, collection: Collection, _: &Value) -> RippleResult<()> {
            self.calls.lock().unwrap().push(collection);
            Ok(())
        }
    }

    #[test]
    fn commit_writes_every_staged_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());

        let mut uow = store.unit_of_work();
        uow.stage(Collection::Registrations, &[json!({"id": "r1"})])
            .unwrap();
        uow.stage(Collection::Events, &[json!({"id": "e1"})]).unwrap();
        assert!(!uow.is_empty());
        uow.commit().unwrap();

        let registrations: Vec<Value> = store.load(Collection::Registrations);
        let events: Vec<Value> = store.load(Collection::Events);
        assert_eq!(registrations, vec![json!({"id": "r1"})]);
        assert_eq!(events, vec![json!({"id": "e1"})]);
    }

    #[test]
    fn failed_write_restores_earlier_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        store
            .save(Collection::Registrations, &[json!({"id": "old"})])
            .unwrap();
        // A directory where the events file should be makes that write fail.
        std::fs::create_dir_all(store.path(Collection::Events)).unwrap();

        let mut uow = store.unit_of_work();
        uow.stage(
            Collection::Registrations,
            &[json!({"id": "old"}), json!({"id": "new"})],
        )
        .unwrap();
        uow.stage(Collection::Events, &[json!({"id": "e1"})]).unwrap();

        assert!(uow.commit().is_err());
        let registrations: Vec<Value> = store.load(Collection::Registrations);
        assert_eq!(registrations, vec![json!({"id": "old"})]);
    }

    #[test]
    fn rollback_removes_files_that_did_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        std::fs::create_dir_all(store.path(Collection::Events)).unwrap();

        let mut uow = store.unit_of_work();
        uow.stage(Collection::Users, &[json!({"id": "u1"})]).unwrap();
        uow.stage(Collection::Events, &[json!({"id": "e1"})]).unwrap();

        assert!(uow.commit().is_err());
        assert!(!store.path(Collection::Users).exists());
    }

    #[test]
    fn successful_commit_replicates_each_collection_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let store = RecordStore::new(dir.path()).with_sink(sink.clone());

        let mut uow = store.unit_of_work();
        uow.stage(Collection::Registrations, &[json!({"id": "r1"})])
            .unwrap();
        uow.stage(Collection::Events, &[json!({"id": "e1"})]).unwrap();
        uow.commit().unwrap();

        assert_eq!(
            *sink.calls.lock().unwrap(),
            vec![Collection::Registrations, Collection::Events]
        );
    }

    #[test]
    fn failed_commit_replicates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let store = RecordStore::new(dir.path()).with_sink(sink.clone());
        std::fs::create_dir_all(store.path(Collection::Events)).unwrap();

        let mut uow = store.unit_of_work();
        uow.stage(Collection::Registrations, &[json!({"id": "r1"})])
            .unwrap();
        uow.stage(Collection::Events, &[json!({"id": "e1"})]).unwrap();

        assert!(uow.commit().is_err());
        assert!(sink.calls.lock().unwrap().is_empty());
        assert!(!store.path(Collection::Registrations).exists());
    }
}
