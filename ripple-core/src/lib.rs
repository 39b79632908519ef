//! Core storage for Ripple, a community events app.
//!
//! Users, events, registrations and categories each live in one JSON file
//! under the data directory. This crate provides:
//! - `RecordStore` and `UnitOfWork` for reading and writing those files
//! - one manager per collection plus `Maintenance` for housekeeping
//! - `Ripple`, a handle wiring all of them to a `RippleConfig`
//! - the `ReplicationSink` and `EventNotifier` hooks

pub mod category;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod geo;
pub mod maintenance;
pub mod mirror;
pub mod notify;
pub mod registration;
pub mod ripple;
pub mod store;
pub mod user;
mod validation;

pub use category::CategoryManager;
pub use config::{Limits, MirrorConfig, RippleConfig};
pub use error::{RippleError, RippleResult};
pub use event::{Event, EventManager, NewEvent, Nearby};
pub use geo::{Location, distance_km};
pub use maintenance::{DataStats, DeletionSummary, Maintenance, UserExport};
pub use mirror::{HttpMirror, NoMirror, ReplicationSink};
pub use notify::{EventNotifier, NoNotifier};
pub use registration::{Contact, Registration, RegistrationManager};
pub use ripple::Ripple;
pub use store::{Collection, DeletePolicy, RecordStore, UnitOfWork};
pub use user::{NewUser, User, UserManager};

/// Local time in the ISO-8601 form stored in `created_at` and
/// `registered_at` fields.
pub(crate) fn timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.f")
        .to_string()
}
