//! Housekeeping over the data directory: statistics, backups, cleanup of
//! cancelled events, and per-user export and erasure.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::constants::DELETED_USER_NAME;
use crate::error::RippleResult;
use crate::event::Event;
use crate::registration::Registration;
use crate::store::{Collection, DeletePolicy, RecordStore, Records};
use crate::user::{User, UserRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataStats {
    pub users: usize,
    pub events: usize,
    pub registrations: usize,
    pub categories: usize,
    /// On-disk size of each existing collection file, by collection name.
    pub file_bytes: BTreeMap<&'static str, u64>,
    pub total_files: usize,
    pub total_bytes: u64,
}

/// Everything stored about one user.
#[derive(Debug, Clone, Serialize)]
pub struct UserExport {
    pub user: Option<User>,
    pub events_created: Vec<Event>,
    pub registrations: Vec<Registration>,
    pub export_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeletionSummary {
    pub users: usize,
    pub registrations: usize,
    pub events_deactivated: usize,
}

#[derive(Clone)]
pub struct Maintenance {
    store: RecordStore,
}

impl Maintenance {
    pub fn new(store: RecordStore) -> Self {
        Maintenance { store }
    }

    pub fn stats(&self) -> DataStats {
        let mut stats = DataStats {
            users: self.store.load::<Value>(Collection::Users).len(),
            events: self.store.load::<Value>(Collection::Events).len(),
            registrations: self.store.load::<Value>(Collection::Registrations).len(),
            categories: self.store.load::<Value>(Collection::Categories).len(),
            ..DataStats::default()
        };

        for collection in Collection::ALL {
            if let Ok(metadata) = std::fs::metadata(self.store.path(collection)) {
                stats.file_bytes.insert(collection.name(), metadata.len());
                stats.total_files += 1;
                stats.total_bytes += metadata.len();
            }
        }
        stats
    }

    /// Copy every existing collection file into `backup_<timestamp>/`.
    pub fn backup(&self, now: NaiveDateTime) -> RippleResult<PathBuf> {
        let backup_dir = self
            .store
            .dir()
            .join(format!("backup_{}", now.format("%Y%m%d_%H%M%S")));
        std::fs::create_dir_all(&backup_dir)?;

        let mut copied = 0;
        for collection in Collection::ALL {
            let source = self.store.path(collection);
            if source.exists() {
                std::fs::copy(&source, backup_dir.join(collection.file_name()))?;
                copied += 1;
            }
        }

        info!(files = copied, dir = %backup_dir.display(), "backed up data");
        Ok(backup_dir)
    }

    /// Drop cancelled, empty events created more than `days_old` days
    /// before `now`. Events with an unreadable creation time are kept.
    pub fn cleanup_old_events(&self, now: NaiveDateTime, days_old: i64) -> RippleResult<usize> {
        let cutoff = now - Duration::days(days_old);
        let mut events: Records<Event> = self.store.load_records(Collection::Events);
        let before = events.len();

        events.retain(|e| {
            e.is_active
                || e.current_participants > 0
                || e.created_at_time().is_none_or(|created| created > cutoff)
        });

        let removed = before - events.len();
        if removed > 0 {
            self.store.save(Collection::Events, &events)?;
            info!(removed, "cleaned up old events");
        }
        Ok(removed)
    }

    pub fn export_user_data(&self, user_id: &str, now: NaiveDateTime) -> UserExport {
        let user = self
            .store
            .load::<UserRecord>(Collection::Users)
            .into_iter()
            .find(|u| u.id == user_id)
            .map(User::from);

        let events_created = self
            .store
            .load::<Event>(Collection::Events)
            .into_iter()
            .filter(|e| e.creator_id == user_id)
            .collect();

        let registrations = self
            .store
            .load::<Registration>(Collection::Registrations)
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();

        UserExport {
            user,
            events_created,
            registrations,
            export_date: now.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        }
    }

    /// Erase a user. Each collection is treated per its delete policy: the
    /// account and its registrations are removed (freeing their places),
    /// events the user created are cancelled and attributed to
    /// "Deleted User" so other attendees keep their history.
    pub fn delete_user_data(&self, user_id: &str) -> RippleResult<DeletionSummary> {
        let mut users: Records<UserRecord> = self.store.load_records(Collection::Users);
        let mut registrations: Records<Registration> =
            self.store.load_records(Collection::Registrations);
        let mut events: Records<Event> = self.store.load_records(Collection::Events);

        let freed: Vec<String> = registrations
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.event_id.clone())
            .collect();

        let summary = DeletionSummary {
            users: retire(Collection::Users, &mut users, |u| u.id == user_id, |_| {}),
            registrations: retire(
                Collection::Registrations,
                &mut registrations,
                |r| r.user_id == user_id,
                |_| {},
            ),
            events_deactivated: retire(
                Collection::Events,
                &mut events,
                |e| e.creator_id == user_id,
                |e| {
                    e.is_active = false;
                    e.creator_name = DELETED_USER_NAME.to_string();
                },
            ),
        };

        for event_id in &freed {
            if let Some(event) = events.iter_mut().find(|e| &e.id == event_id) {
                event.adjust_participants(-1);
            }
        }

        let mut uow = self.store.unit_of_work();
        if summary.users > 0 {
            uow.stage(Collection::Users, &users)?;
        }
        if summary.registrations > 0 {
            uow.stage(Collection::Registrations, &registrations)?;
        }
        if summary.events_deactivated > 0 || !freed.is_empty() {
            uow.stage(Collection::Events, &events)?;
        }
        if !uow.is_empty() {
            uow.commit()?;
        }

        info!(%user_id, ?summary, "deleted user data");
        Ok(summary)
    }
}

/// Apply the collection's delete policy to the records `owned` selects.
/// Returns how many records were removed or deactivated.
fn retire<T>(
    collection: Collection,
    records: &mut Records<T>,
    owned: impl Fn(&T) -> bool,
    deactivate: impl Fn(&mut T),
) -> usize {
    match collection.delete_policy() {
        DeletePolicy::Hard => {
            let before = records.len();
            records.retain(|r| !owned(r));
            before - records.len()
        }
        DeletePolicy::Soft => {
            let mut count = 0;
            for record in records.iter_mut().filter(|r| owned(r)) {
                deactivate(record);
                count += 1;
            }
            count
        }
    }
}
