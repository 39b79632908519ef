//! One handle over a data directory and every manager built on it.

use std::path::PathBuf;
use std::sync::Arc;

use crate::category::CategoryManager;
use crate::config::RippleConfig;
use crate::error::RippleResult;
use crate::event::EventManager;
use crate::maintenance::Maintenance;
use crate::mirror::{NoMirror, ReplicationSink};
use crate::notify::{EventNotifier, NoNotifier};
use crate::registration::RegistrationManager;
use crate::store::RecordStore;
use crate::user::UserManager;

#[derive(Clone)]
pub struct Ripple {
    config: RippleConfig,
    store: RecordStore,
    users: UserManager,
    events: EventManager,
    registrations: RegistrationManager,
    categories: CategoryManager,
    maintenance: Maintenance,
}

impl Ripple {
    /// Load the config file (creating it on first run) and open its data
    /// directory without a mirror or notifier.
    pub fn load() -> RippleResult<Self> {
        Self::open(RippleConfig::load()?)
    }

    pub fn open(config: RippleConfig) -> RippleResult<Self> {
        Self::open_with(config, Arc::new(NoMirror), Arc::new(NoNotifier))
    }

    /// Open the data directory, creating any missing collection file.
    pub fn open_with(
        config: RippleConfig,
        sink: Arc<dyn ReplicationSink>,
        notifier: Arc<dyn EventNotifier>,
    ) -> RippleResult<Self> {
        let store = RecordStore::new(config.data_path()).with_sink(sink);
        store.initialize()?;

        Ok(Ripple {
            users: UserManager::new(store.clone(), config.limits.clone()),
            events: EventManager::new(store.clone(), config.limits.clone())
                .with_notifier(notifier),
            registrations: RegistrationManager::new(store.clone()),
            categories: CategoryManager::new(store.clone()),
            maintenance: Maintenance::new(store.clone()),
            store,
            config,
        })
    }

    pub fn config(&self) -> &RippleConfig {
        &self.config
    }

    pub fn data_path(&self) -> PathBuf {
        self.store.dir().to_path_buf()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn users(&self) -> &UserManager {
        &self.users
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn registrations(&self) -> &RegistrationManager {
        &self.registrations
    }

    pub fn categories(&self) -> &CategoryManager {
        &self.categories
    }

    pub fn maintenance(&self) -> &Maintenance {
        &self.maintenance
    }
}
