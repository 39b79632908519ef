//! Community events.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::Limits;
use crate::constants::{DEFAULT_CATEGORY, DEFAULT_MAX_PARTICIPANTS};
use crate::error::{RippleError, RippleResult};
use crate::geo::Location;
use crate::notify::{EventNotifier, NoNotifier};
use crate::store::{Collection, RecordStore, Records};
use crate::validation;

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_max_participants() -> u32 {
    DEFAULT_MAX_PARTICIPANTS
}

fn default_active() -> bool {
    true
}

/// An event as stored in events.json.
///
/// Keys this type does not know about are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Expected `YYYY-MM-DD`; not strictly validated.
    pub date: String,
    #[serde(default)]
    pub time: String,
    pub location: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_max_participants")]
    pub max_participants: u32,
    #[serde(default)]
    pub current_participants: u32,
    #[serde(default)]
    pub creator_id: String,
    #[serde(default)]
    pub creator_name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    /// ISO-8601 local time; older files may hold anything here.
    #[serde(default)]
    pub created_at: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }

    pub fn created_at_time(&self) -> Option<NaiveDateTime> {
        self.created_at.parse().ok()
    }

    /// Add `delta` participants, never going below zero.
    pub(crate) fn adjust_participants(&mut self, delta: i64) {
        let next = (i64::from(self.current_participants) + delta).max(0);
        self.current_participants = u32::try_from(next).unwrap_or(u32::MAX);
    }

    fn matches_text(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.location.to_lowercase().contains(needle)
    }
}

/// Creation form. Title, description, date and location are required.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub category: Option<String>,
    pub max_participants: Option<u32>,
    pub creator_id: String,
    pub creator_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: String,
    pub country: String,
}

impl NewEvent {
    pub fn new(title: &str, description: &str, date: &str, location: &str, creator_id: &str) -> Self {
        NewEvent {
            title: title.to_string(),
            description: description.to_string(),
            date: date.to_string(),
            location: location.to_string(),
            creator_id: creator_id.to_string(),
            ..NewEvent::default()
        }
    }

    fn validate(&self, limits: &Limits) -> RippleResult<()> {
        validation::require("title", &self.title)?;
        validation::require("description", &self.description)?;
        validation::require("date", &self.date)?;
        validation::require("location", &self.location)?;

        if self.date.trim().chars().count() < 8 {
            return Err(RippleError::Validation("Invalid date format".into()));
        }
        validation::max_chars("Title", &self.title, limits.max_title_len)?;
        validation::max_chars("Description", &self.description, limits.max_description_len)?;

        if let Some(max) = self.max_participants
            && (max == 0 || max > limits.max_participants)
        {
            return Err(RippleError::Validation(format!(
                "max_participants must be between 1 and {}",
                limits.max_participants
            )));
        }
        Ok(())
    }
}

/// An event together with its distance from a reference point.
#[derive(Debug, Clone)]
pub struct Nearby {
    pub event: Event,
    pub distance_km: f64,
}

#[derive(Clone)]
pub struct EventManager {
    store: RecordStore,
    limits: Limits,
    notifier: Arc<dyn EventNotifier>,
}

impl EventManager {
    pub fn new(store: RecordStore, limits: Limits) -> Self {
        EventManager {
            store,
            limits,
            notifier: Arc::new(NoNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn EventNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Every stored event, cancelled ones included.
    pub fn all(&self) -> Vec<Event> {
        self.store.load(Collection::Events)
    }

    pub fn create(&self, new_event: NewEvent) -> RippleResult<Event> {
        new_event.validate(&self.limits)?;

        let event = Event {
            id: uuid::Uuid::new_v4().to_string(),
            title: new_event.title,
            description: new_event.description,
            date: new_event.date,
            time: new_event.time,
            location: new_event.location,
            category: new_event.category.unwrap_or_else(default_category),
            max_participants: new_event
                .max_participants
                .unwrap_or(DEFAULT_MAX_PARTICIPANTS),
            current_participants: 0,
            creator_id: new_event.creator_id,
            creator_name: new_event.creator_name,
            latitude: new_event.latitude,
            longitude: new_event.longitude,
            city: new_event.city,
            country: new_event.country,
            created_at: crate::timestamp(),
            is_active: true,
            extra: Map::new(),
        };

        let mut events: Records<Event> = self.store.load_records(Collection::Events);
        events.push(event.clone());
        self.store.save(Collection::Events, &events)?;
        info!(event_id = %event.id, title = %event.title, "created event");

        if let Err(e) = self.notifier.event_created(&event) {
            warn!(event_id = %event.id, error = %e, "event notification failed");
        }

        Ok(event)
    }

    /// Active events in storage order.
    pub fn list_active(&self) -> Vec<Event> {
        self.all().into_iter().filter(|e| e.is_active).collect()
    }

    pub fn get(&self, event_id: &str) -> Option<Event> {
        self.list_active().into_iter().find(|e| e.id == event_id)
    }

    /// Overwrite fields that already exist on the stored record.
    ///
    /// Keys absent from the stored record are ignored. A patch that leaves
    /// the record unreadable (e.g. a string for `max_participants`) is
    /// rejected and nothing is written.
    pub fn update(&self, event_id: &str, patch: Map<String, Value>) -> RippleResult<Event> {
        let mut records: Vec<Value> = self.store.load(Collection::Events);
        let fields = records
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(event_id))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| RippleError::EventNotFound(event_id.to_string()))?;

        let mut merged = fields.clone();
        let mut ignored = Vec::new();
        for (key, value) in patch {
            if merged.contains_key(&key) {
                merged.insert(key, value);
            } else {
                ignored.push(key);
            }
        }
        if !ignored.is_empty() {
            debug!(%event_id, ?ignored, "ignored fields not present on event");
        }

        let updated = Event::deserialize(&Value::Object(merged.clone()))
            .map_err(|e| RippleError::Validation(format!("Invalid event update: {e}")))?;

        *fields = merged;
        self.store.save(Collection::Events, &records)?;
        info!(%event_id, "updated event");
        Ok(updated)
    }

    /// Soft delete. Registrations for the event stay where they are.
    pub fn cancel(&self, event_id: &str) -> RippleResult<()> {
        let mut events: Records<Event> = self.store.load_records(Collection::Events);
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| RippleError::EventNotFound(event_id.to_string()))?;

        event.is_active = false;
        self.store.save(Collection::Events, &events)?;
        info!(%event_id, "cancelled event");
        Ok(())
    }

    /// Add `delta` to the participant count, flooring at zero. Capacity is
    /// checked by registration, not here.
    pub fn adjust_participants(&self, event_id: &str, delta: i64) -> RippleResult<u32> {
        let mut events: Records<Event> = self.store.load_records(Collection::Events);
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| RippleError::EventNotFound(event_id.to_string()))?;

        event.adjust_participants(delta);
        let count = event.current_participants;
        self.store.save(Collection::Events, &events)?;
        Ok(count)
    }

    /// Case-insensitive substring match on title, description or location,
    /// optionally restricted to one category. An empty query matches all.
    pub fn search(&self, query: &str, category: Option<&str>) -> Vec<Event> {
        let needle = query.to_lowercase();

        self.list_active()
            .into_iter()
            .filter(|e| category.is_none_or(|c| e.category == c))
            .filter(|e| e.matches_text(&needle))
            .collect()
    }

    pub fn by_category(&self, category: &str) -> Vec<Event> {
        self.list_active()
            .into_iter()
            .filter(|e| e.category == category)
            .collect()
    }

    pub fn by_creator(&self, creator_id: &str) -> Vec<Event> {
        self.list_active()
            .into_iter()
            .filter(|e| e.creator_id == creator_id)
            .collect()
    }

    /// Inclusive range compared as strings, which is only meaningful for
    /// `YYYY-MM-DD` dates.
    pub fn by_date_range(&self, start: &str, end: &str) -> Vec<Event> {
        self.list_active()
            .into_iter()
            .filter(|e| start <= e.date.as_str() && e.date.as_str() <= end)
            .collect()
    }

    /// Most participants first.
    pub fn popular(&self, limit: usize) -> Vec<Event> {
        let mut events = self.list_active();
        events.sort_by(|a, b| b.current_participants.cmp(&a.current_participants));
        events.truncate(limit);
        events
    }

    /// Events dated between `today` and `today + days_ahead`, soonest first.
    /// Events whose date is not `YYYY-MM-DD` are skipped.
    pub fn upcoming(&self, today: NaiveDate, days_ahead: i64) -> Vec<Event> {
        let until = today + Duration::days(days_ahead);

        let mut events: Vec<(NaiveDate, Event)> = self
            .list_active()
            .into_iter()
            .filter_map(|e| {
                NaiveDate::parse_from_str(&e.date, "%Y-%m-%d")
                    .ok()
                    .map(|d| (d, e))
            })
            .filter(|(d, _)| today <= *d && *d <= until)
            .collect();

        events.sort_by_key(|(d, _)| *d);
        events.into_iter().map(|(_, e)| e).collect()
    }

    /// All active events, closest first; events without coordinates last.
    pub fn sorted_by_distance(&self, location: &Location) -> Vec<Nearby> {
        let mut events: Vec<Nearby> = self
            .list_active()
            .into_iter()
            .map(|event| Nearby {
                distance_km: location.distance_to(event.latitude, event.longitude),
                event,
            })
            .collect();

        events.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        events
    }

    /// Active events within `radius_km`, closest first.
    pub fn nearby(&self, location: &Location, radius_km: f64) -> Vec<Nearby> {
        self.sorted_by_distance(location)
            .into_iter()
            .filter(|n| n.distance_km <= radius_km)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use std::sync::Mutex;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: RecordStore,
        events: EventManager,
    }

    #[fixture]
    fn fx() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        let events = EventManager::new(store.clone(), Limits::default());
        Fixture {
            _dir: dir,
            store,
            events,
        }
    }

    fn workshop() -> NewEvent {
        NewEvent::new("Python Workshop", "intro", "2025-06-01", "Hub", "u1")
    }

    fn patch(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[rstest]
    fn create_applies_defaults(fx: Fixture) {
        let event = fx.events.create(workshop()).unwrap();

        assert_eq!(event.current_participants, 0);
        assert_eq!(event.max_participants, 50);
        assert_eq!(event.category, "General");
        assert!(event.is_active);
        assert!(event.created_at_time().is_some());
        assert_eq!(fx.events.get(&event.id), Some(event));
    }

    #[rstest]
    #[case(NewEvent { title: String::new(), ..workshop() })]
    #[case(NewEvent { location: "  ".into(), ..workshop() })]
    #[case(NewEvent { date: "June".into(), ..workshop() })]
    #[case(NewEvent { title: "x".repeat(101), ..workshop() })]
    #[case(NewEvent { max_participants: Some(0), ..workshop() })]
    #[case(NewEvent { max_participants: Some(501), ..workshop() })]
    fn create_rejects_invalid_input(fx: Fixture, #[case] new_event: NewEvent) {
        let err = fx.events.create(new_event).unwrap_err();
        assert!(matches!(err, RippleError::Validation(_)));
        assert!(fx.events.all().is_empty());
    }

    #[rstest]
    fn notifier_hears_about_new_events(fx: Fixture) {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<String>>);
        impl EventNotifier for Recorder {
            fn event_created(&self, event: &Event) -> RippleResult<()> {
                self.0.lock().unwrap().push(event.title.clone());
                Err(RippleError::Mirror("smtp down".into()))
            }
        }

        let recorder = Arc::new(Recorder::default());
        let events = fx.events.clone().with_notifier(recorder.clone());

        let event = events.create(workshop()).unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec![event.title]);
    }

    #[rstest]
    fn cancelled_events_are_hidden_but_kept(fx: Fixture) {
        let event = fx.events.create(workshop()).unwrap();
        fx.events.cancel(&event.id).unwrap();

        assert!(fx.events.get(&event.id).is_none());
        assert!(fx.events.list_active().is_empty());
        assert_eq!(fx.events.all().len(), 1);
        assert!(!fx.events.all()[0].is_active);
        assert!(matches!(
            fx.events.cancel("missing"),
            Err(RippleError::EventNotFound(_))
        ));
    }

    #[rstest]
    #[case(-1)]
    #[case(-5)]
    #[case(i64::MIN / 2)]
    fn participants_never_go_negative(fx: Fixture, #[case] delta: i64) {
        let event = fx.events.create(workshop()).unwrap();
        fx.events.adjust_participants(&event.id, 2).unwrap();

        let count = fx.events.adjust_participants(&event.id, delta).unwrap();
        assert_eq!(count, (2 + delta).max(0) as u32);
        assert_eq!(fx.events.get(&event.id).unwrap().current_participants, count);
    }

    #[rstest]
    fn adjust_has_no_ceiling(fx: Fixture) {
        let event = fx
            .events
            .create(NewEvent { max_participants: Some(1), ..workshop() })
            .unwrap();
        assert_eq!(fx.events.adjust_participants(&event.id, 3).unwrap(), 3);
    }

    #[rstest]
    fn update_only_touches_existing_fields(fx: Fixture) {
        let event = fx.events.create(workshop()).unwrap();

        let updated = fx
            .events
            .update(
                &event.id,
                patch(json!({"title": "Rust Workshop", "latitude": 1.5, "sponsor": "ACME"})),
            )
            .unwrap();

        assert_eq!(updated.title, "Rust Workshop");
        assert_eq!(updated.latitude, Some(1.5));
        assert!(updated.extra.get("sponsor").is_none());

        let raw: Vec<Value> = fx.store.load(Collection::Events);
        assert!(raw[0].get("sponsor").is_none());
    }

    #[rstest]
    fn update_can_change_extra_keys_already_on_disk(fx: Fixture) {
        fx.store
            .save(
                Collection::Events,
                &[json!({
                    "id": "legacy",
                    "title": "Old",
                    "description": "d",
                    "date": "2025-01-01",
                    "location": "Hall",
                    "room": "A"
                })],
            )
            .unwrap();

        let updated = fx
            .events
            .update("legacy", patch(json!({"room": "B"})))
            .unwrap();
        assert_eq!(updated.extra["room"], json!("B"));
        assert_eq!(updated.category, "General");
        assert!(updated.is_active);
    }

    #[rstest]
    fn update_ignores_keys_only_filled_in_by_defaults(fx: Fixture) {
        fx.store
            .save(
                Collection::Events,
                &[json!({
                    "id": "legacy",
                    "title": "Old",
                    "description": "d",
                    "date": "2025-01-01",
                    "location": "Hall"
                })],
            )
            .unwrap();

        let updated = fx
            .events
            .update(
                "legacy",
                patch(json!({"category": "Music", "is_active": false, "title": "New"})),
            )
            .unwrap();
        assert_eq!(updated.category, "General");
        assert!(updated.is_active);
        assert_eq!(updated.title, "New");

        let raw: Vec<Value> = fx.store.load(Collection::Events);
        assert!(raw[0].get("category").is_none());
        assert!(raw[0].get("is_active").is_none());
        assert_eq!(raw[0]["title"], json!("New"));
    }

    #[rstest]
    fn unreadable_events_survive_create_and_cancel(fx: Fixture) {
        let broken = json!({"id": "broken", "date": "2025-01-01", "max_participants": "many"});
        fx.store.save(Collection::Events, &[broken.clone()]).unwrap();

        let event = fx.events.create(workshop()).unwrap();
        fx.events.cancel(&event.id).unwrap();

        let raw: Vec<Value> = fx.store.load(Collection::Events);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0], broken);
        assert_eq!(raw[1]["is_active"], json!(false));
        assert!(matches!(
            fx.events.cancel("broken"),
            Err(RippleError::EventNotFound(_))
        ));
    }

    #[rstest]
    fn ill_typed_update_is_rejected(fx: Fixture) {
        let event = fx.events.create(workshop()).unwrap();

        let err = fx
            .events
            .update(&event.id, patch(json!({"max_participants": "lots"})))
            .unwrap_err();
        assert!(matches!(err, RippleError::Validation(_)));
        assert_eq!(fx.events.get(&event.id).unwrap().max_participants, 50);

        assert!(matches!(
            fx.events.update("missing", Map::new()),
            Err(RippleError::EventNotFound(_))
        ));
    }

    #[rstest]
    fn search_matches_any_text_field(fx: Fixture) {
        let python = fx.events.create(workshop()).unwrap();
        fx.events
            .create(NewEvent::new("Knitting", "yarn", "2025-06-02", "Library", "u1"))
            .unwrap();
        let venue = fx
            .events
            .create(NewEvent::new("Meetup", "chat", "2025-06-03", "Python House", "u2"))
            .unwrap();

        let ids: Vec<_> = fx.events.search("PYTHON", None).into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![python.id.clone(), venue.id]);

        assert_eq!(fx.events.search("", None).len(), 3);
        assert!(fx.events.search("python", Some("Music")).is_empty());
        assert_eq!(fx.events.search("python", Some("General")).len(), 2);
    }

    #[rstest]
    fn simple_filters(fx: Fixture) {
        fx.events
            .create(NewEvent { category: Some("Music".into()), ..workshop() })
            .unwrap();
        fx.events
            .create(NewEvent::new("Late", "d", "2025-07-15", "Hub", "u2"))
            .unwrap();
        fx.events
            .create(NewEvent::new("Early", "d", "2025-05-31", "Hub", "u2"))
            .unwrap();

        assert_eq!(fx.events.by_category("Music").len(), 1);
        assert_eq!(fx.events.by_creator("u2").len(), 2);
        let june: Vec<_> = fx
            .events
            .by_date_range("2025-06-01", "2025-06-30")
            .into_iter()
            .map(|e| e.date)
            .collect();
        assert_eq!(june, vec!["2025-06-01"]);
    }

    #[rstest]
    fn popular_orders_by_participants(fx: Fixture) {
        let a = fx.events.create(workshop()).unwrap();
        let b = fx.events.create(workshop()).unwrap();
        fx.events.create(workshop()).unwrap();
        fx.events.adjust_participants(&b.id, 5).unwrap();
        fx.events.adjust_participants(&a.id, 2).unwrap();

        let top: Vec<_> = fx.events.popular(2).into_iter().map(|e| e.id).collect();
        assert_eq!(top, vec![b.id, a.id]);
    }

    #[rstest]
    fn upcoming_window_sorted_by_date(fx: Fixture) {
        for date in ["2025-06-20", "2025-06-02", "2025-05-01", "2025-09-01", "someday!"] {
            fx.events
                .create(NewEvent { date: date.into(), ..workshop() })
                .unwrap();
        }

        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let dates: Vec<_> = fx
            .events
            .upcoming(today, 30)
            .into_iter()
            .map(|e| e.date)
            .collect();
        assert_eq!(dates, vec!["2025-06-02", "2025-06-20"]);
    }

    #[rstest]
    fn proximity_sorting_and_radius(fx: Fixture) {
        let london = fx
            .events
            .create(NewEvent {
                latitude: Some(51.5074),
                longitude: Some(-0.1278),
                ..workshop()
            })
            .unwrap();
        let unknown = fx.events.create(workshop()).unwrap();
        let brooklyn = fx
            .events
            .create(NewEvent {
                latitude: Some(40.6782),
                longitude: Some(-73.9442),
                ..workshop()
            })
            .unwrap();

        let here = Location::new(40.7128, -74.0060);
        let order: Vec<_> = fx
            .events
            .sorted_by_distance(&here)
            .into_iter()
            .map(|n| n.event.id)
            .collect();
        assert_eq!(order, vec![brooklyn.id.clone(), london.id, unknown.id]);

        let close: Vec<_> = fx
            .events
            .nearby(&here, 50.0)
            .into_iter()
            .map(|n| n.event.id)
            .collect();
        assert_eq!(close, vec![brooklyn.id]);
    }
}
