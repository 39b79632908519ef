//! Event registrations.
//!
//! A registration and the participant count of its event are separate
//! files; both change through one unit of work so a failed write leaves
//! neither half applied.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{RippleError, RippleResult};
use crate::event::Event;
use crate::store::{Collection, RecordStore, Records};
use crate::user::UserRecord;

/// A registration as stored in registrations.json.
///
/// The `event_*` fields are a snapshot taken at registration time and do
/// not follow later edits of the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    #[serde(default)]
    pub event_title: String,
    #[serde(default)]
    pub event_date: String,
    #[serde(default)]
    pub event_time: String,
    #[serde(default)]
    pub event_location: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub registered_at: String,
}

/// Registrant contact details.
#[derive(Debug, Clone, Default)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone)]
pub struct RegistrationManager {
    store: RecordStore,
}

impl RegistrationManager {
    pub fn new(store: RecordStore) -> Self {
        RegistrationManager { store }
    }

    pub fn all(&self) -> Vec<Registration> {
        self.store.load(Collection::Registrations)
    }

    /// Register a user for an active event with room left.
    ///
    /// Checks run in order: existing registration, event lookup, capacity.
    pub fn register(
        &self,
        user_id: &str,
        event_id: &str,
        contact: Contact,
    ) -> RippleResult<Registration> {
        let mut registrations: Records<Registration> =
            self.store.load_records(Collection::Registrations);
        let held_raw = registrations.raw().any(|r| {
            r.get("user_id").and_then(Value::as_str) == Some(user_id)
                && r.get("event_id").and_then(Value::as_str) == Some(event_id)
        });
        if held_raw
            || registrations
                .iter()
                .any(|r| r.user_id == user_id && r.event_id == event_id)
        {
            return Err(RippleError::AlreadyRegistered {
                user_id: user_id.to_string(),
                event_id: event_id.to_string(),
            });
        }

        let mut events: Records<Event> = self.store.load_records(Collection::Events);
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id && e.is_active)
            .ok_or_else(|| RippleError::EventNotFound(event_id.to_string()))?;

        if event.is_full() {
            return Err(RippleError::EventFull(event_id.to_string()));
        }

        let registration = Registration {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
            event_title: event.title.clone(),
            event_date: event.date.clone(),
            event_time: event.time.clone(),
            event_location: event.location.clone(),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            registered_at: crate::timestamp(),
        };
        event.adjust_participants(1);
        registrations.push(registration.clone());

        let mut uow = self.store.unit_of_work();
        uow.stage(Collection::Registrations, &registrations)?;
        uow.stage(Collection::Events, &events)?;
        uow.commit()?;

        info!(%user_id, %event_id, "registered for event");
        Ok(registration)
    }

    /// Register using the contact details stored on the user's account.
    pub fn register_user(&self, user_id: &str, event_id: &str) -> RippleResult<Registration> {
        let users: Vec<UserRecord> = self.store.load(Collection::Users);
        let user = users
            .into_iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| RippleError::UserNotFound(user_id.to_string()))?;

        let contact = Contact {
            name: user.name,
            email: user.email,
            phone: user.phone,
        };
        self.register(user_id, event_id, contact)
    }

    /// Remove the registration and free its place on the event.
    pub fn cancel(&self, user_id: &str, event_id: &str) -> RippleResult<()> {
        let mut registrations: Records<Registration> =
            self.store.load_records(Collection::Registrations);
        let before = registrations.len();
        registrations.retain(|r| !(r.user_id == user_id && r.event_id == event_id));
        if registrations.len() == before {
            return Err(RippleError::RegistrationNotFound {
                user_id: user_id.to_string(),
                event_id: event_id.to_string(),
            });
        }

        let mut uow = self.store.unit_of_work();
        uow.stage(Collection::Registrations, &registrations)?;

        let mut events: Records<Event> = self.store.load_records(Collection::Events);
        let found = match events.iter_mut().find(|e| e.id == event_id) {
            Some(event) => {
                event.adjust_participants(-1);
                true
            }
            None => false,
        };
        if found {
            uow.stage(Collection::Events, &events)?;
        }
        uow.commit()?;

        info!(%user_id, %event_id, "cancelled registration");
        Ok(())
    }

    pub fn for_user(&self, user_id: &str) -> Vec<Registration> {
        self.all()
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect()
    }

    pub fn for_event(&self, event_id: &str) -> Vec<Registration> {
        self.all()
            .into_iter()
            .filter(|r| r.event_id == event_id)
            .collect()
    }

    pub fn is_registered(&self, user_id: &str, event_id: &str) -> bool {
        self.all()
            .iter()
            .any(|r| r.user_id == user_id && r.event_id == event_id)
    }

    pub fn count_for_event(&self, event_id: &str) -> usize {
        self.all().iter().filter(|r| r.event_id == event_id).count()
    }

    /// Active events the user holds a registration for, in registration
    /// order.
    pub fn registered_events(&self, user_id: &str) -> Vec<Event> {
        let events: Vec<Event> = self.store.load(Collection::Events);

        self.for_user(user_id)
            .iter()
            .filter_map(|r| {
                events
                    .iter()
                    .find(|e| e.id == r.event_id && e.is_active)
                    .cloned()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::event::{EventManager, NewEvent};
    use crate::user::{NewUser, UserManager};
    use rstest::{fixture, rstest};

    struct Fixture {
        _dir: tempfile::TempDir,
        store: RecordStore,
        events: EventManager,
        registrations: RegistrationManager,
    }

    #[fixture]
    fn fx() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        Fixture {
            events: EventManager::new(store.clone(), Limits::default()),
            registrations: RegistrationManager::new(store.clone()),
            store,
            _dir: dir,
        }
    }

    fn contact(name: &str) -> Contact {
        Contact {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: String::new(),
        }
    }

    fn workshop(fx: &Fixture) -> Event {
        fx.events
            .create(NewEvent::new("Python Workshop", "intro", "2025-06-01", "Hub", "u1"))
            .unwrap()
    }

    #[rstest]
    fn register_then_cancel_round_trip(fx: Fixture) {
        let event = workshop(&fx);
        assert_eq!(event.max_participants, 50);
        assert_eq!(event.current_participants, 0);
        assert!(event.is_active);
        assert_eq!(event.category, "General");

        fx.registrations
            .register("u2", &event.id, contact("Grace"))
            .unwrap();
        assert_eq!(fx.events.get(&event.id).unwrap().current_participants, 1);

        fx.registrations.cancel("u2", &event.id).unwrap();
        assert_eq!(fx.events.get(&event.id).unwrap().current_participants, 0);
        assert!(!fx.registrations.is_registered("u2", &event.id));
        assert!(fx.registrations.for_event(&event.id).is_empty());
    }

    #[rstest]
    fn second_registration_is_rejected(fx: Fixture) {
        let event = workshop(&fx);

        fx.registrations
            .register("u2", &event.id, contact("Grace"))
            .unwrap();
        let err = fx
            .registrations
            .register("u2", &event.id, contact("Grace"))
            .unwrap_err();

        assert!(matches!(err, RippleError::AlreadyRegistered { .. }));
        assert_eq!(fx.events.get(&event.id).unwrap().current_participants, 1);
        assert_eq!(fx.registrations.count_for_event(&event.id), 1);
    }

    #[rstest]
    fn full_event_rejects_without_counting(fx: Fixture) {
        let event = fx
            .events
            .create(NewEvent {
                max_participants: Some(1),
                ..NewEvent::new("Tiny", "d", "2025-06-01", "Hub", "u1")
            })
            .unwrap();

        fx.registrations
            .register("u2", &event.id, contact("Grace"))
            .unwrap();
        let err = fx
            .registrations
            .register("u3", &event.id, contact("Alan"))
            .unwrap_err();

        assert!(matches!(err, RippleError::EventFull(_)));
        assert_eq!(fx.events.get(&event.id).unwrap().current_participants, 1);
        assert!(!fx.registrations.is_registered("u3", &event.id));
    }

    #[rstest]
    fn missing_or_cancelled_event_is_not_found(fx: Fixture) {
        assert!(matches!(
            fx.registrations.register("u2", "nope", contact("Grace")),
            Err(RippleError::EventNotFound(_))
        ));

        let event = workshop(&fx);
        fx.events.cancel(&event.id).unwrap();
        assert!(matches!(
            fx.registrations.register("u2", &event.id, contact("Grace")),
            Err(RippleError::EventNotFound(_))
        ));
    }

    #[rstest]
    fn snapshot_does_not_follow_event_edits(fx: Fixture) {
        let event = workshop(&fx);
        fx.registrations
            .register("u2", &event.id, contact("Grace"))
            .unwrap();

        let patch = serde_json::json!({"title": "Renamed"});
        fx.events
            .update(&event.id, patch.as_object().cloned().unwrap())
            .unwrap();

        let registration = &fx.registrations.for_user("u2")[0];
        assert_eq!(registration.event_title, "Python Workshop");
        assert_eq!(registration.event_date, "2025-06-01");
        assert_eq!(registration.event_location, "Hub");
    }

    #[rstest]
    fn cancel_without_registration_fails(fx: Fixture) {
        let event = workshop(&fx);
        assert!(matches!(
            fx.registrations.cancel("u2", &event.id),
            Err(RippleError::RegistrationNotFound { .. })
        ));
        assert_eq!(fx.events.get(&event.id).unwrap().current_participants, 0);
    }

    #[rstest]
    fn register_user_uses_account_contact(fx: Fixture) {
        let users = UserManager::new(fx.store.clone(), Limits::default());
        let user = users
            .create(NewUser::new("Grace", "grace@example.com", "secret1"))
            .unwrap();
        let event = workshop(&fx);

        let registration = fx.registrations.register_user(&user.id, &event.id).unwrap();
        assert_eq!(registration.name, "Grace");
        assert_eq!(registration.email, "grace@example.com");

        assert!(matches!(
            fx.registrations.register_user("ghost", &event.id),
            Err(RippleError::UserNotFound(_))
        ));
    }

    #[rstest]
    fn registered_events_skip_cancelled(fx: Fixture) {
        let first = workshop(&fx);
        let second = workshop(&fx);
        fx.registrations
            .register("u2", &first.id, contact("Grace"))
            .unwrap();
        fx.registrations
            .register("u2", &second.id, contact("Grace"))
            .unwrap();
        fx.events.cancel(&first.id).unwrap();

        let ids: Vec<_> = fx
            .registrations
            .registered_events("u2")
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![second.id]);
        assert_eq!(fx.registrations.for_user("u2").len(), 2);
    }

    #[rstest]
    fn legacy_registration_blocks_a_repeat_and_is_kept(fx: Fixture) {
        let event = workshop(&fx);
        let legacy = serde_json::json!({"user_id": "u2", "event_id": event.id});
        fx.store
            .save(Collection::Registrations, &[legacy.clone()])
            .unwrap();

        assert!(matches!(
            fx.registrations.register("u2", &event.id, contact("Grace")),
            Err(RippleError::AlreadyRegistered { .. })
        ));

        fx.registrations
            .register("u3", &event.id, contact("Alan"))
            .unwrap();
        fx.registrations.cancel("u3", &event.id).unwrap();

        let raw: Vec<Value> = fx.store.load(Collection::Registrations);
        assert_eq!(raw, vec![legacy]);
    }
}
