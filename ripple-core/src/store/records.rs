//! A loaded collection, parsed one record at a time.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use super::Collection;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum Entry<T> {
    Typed(T),
    Raw(Value),
}

/// Records of one collection in file order.
///
/// A record that does not fit `T` is kept verbatim and written back
/// untouched on save; it is invisible to `iter`, `iter_mut` and `retain`.
#[derive(Debug, Clone, PartialEq)]
pub struct Records<T> {
    entries: Vec<Entry<T>>,
}

impl<T: DeserializeOwned> Records<T> {
    pub(crate) fn from_values(collection: Collection, values: Vec<Value>) -> Self {
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| match T::deserialize(&value) {
                Ok(record) => Entry::Typed(record),
                Err(e) => {
                    warn!(%collection, index, error = %e, "record does not match expected shape, keeping it as-is");
                    Entry::Raw(value)
                }
            })
            .collect();
        Records { entries }
    }
}

impl<T> Records<T> {
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Typed(record) => Some(record),
            Entry::Raw(_) => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().filter_map(|entry| match entry {
            Entry::Typed(record) => Some(record),
            Entry::Raw(_) => None,
        })
    }

    /// Records kept verbatim because they did not fit `T`.
    pub fn raw(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Raw(value) => Some(value),
            Entry::Typed(_) => None,
        })
    }

    pub fn push(&mut self, record: T) {
        self.entries.push(Entry::Typed(record));
    }

    /// Keep the typed records `keep` accepts. Raw records always stay.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.entries.retain(|entry| match entry {
            Entry::Typed(record) => keep(record),
            Entry::Raw(_) => true,
        });
    }

    /// Every record, raw ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_typed(self) -> Vec<T> {
        self.entries
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Typed(record) => Some(record),
                Entry::Raw(_) => None,
            })
            .collect()
    }

    /// True when a raw record has `field` equal to `value`, ignoring case.
    pub(crate) fn raw_field_matches(&self, field: &str, value: &str) -> bool {
        self.raw().any(|record| {
            record
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|v| v.eq_ignore_ascii_case(value))
        })
    }
}

impl<T: Ord> Records<T> {
    /// Sort the typed records among themselves. Raw records keep their slots.
    pub fn sort(&mut self) {
        let mut typed: Vec<T> = Vec::new();
        let mut slots = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match entry {
                Entry::Typed(record) => {
                    typed.push(record);
                    slots.push(None);
                }
                raw @ Entry::Raw(_) => slots.push(Some(raw)),
            }
        }
        typed.sort();

        let mut typed = typed.into_iter();
        self.entries = slots
            .into_iter()
            .filter_map(|slot| slot.or_else(|| typed.next().map(Entry::Typed)))
            .collect();
    }
}

impl<T> Default for Records<T> {
    fn default() -> Self {
        Records {
            entries: Vec::new(),
        }
    }
}

impl<T: Serialize> Serialize for Records<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Named {
        id: String,
        name: String,
    }

    fn mixed() -> Records<Named> {
        Records::from_values(
            Collection::Users,
            vec![
                json!({"id": "1", "name": "Ada"}),
                json!({"id": "2", "email": "old@example.com"}),
                json!({"id": "3", "name": "Grace"}),
            ],
        )
    }

    #[test]
    fn unfit_records_are_kept_raw_in_place() {
        let mut records = mixed();
        assert_eq!(records.len(), 3);
        assert_eq!(records.iter().count(), 2);
        assert!(records.raw_field_matches("email", "OLD@example.com"));

        records.retain(|r| r.id != "1");
        records.push(Named {
            id: "4".into(),
            name: "Alan".into(),
        });

        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            json!([
                {"id": "2", "email": "old@example.com"},
                {"id": "3", "name": "Grace"},
                {"id": "4", "name": "Alan"}
            ])
        );
    }

    #[test]
    fn sort_leaves_raw_records_in_their_slots() {
        let mut records: Records<String> = Records::from_values(
            Collection::Categories,
            vec![json!("Sports"), json!(7), json!("Arts")],
        );
        records.sort();
        assert_eq!(
            serde_json::to_value(&records).unwrap(),
            json!(["Arts", 7, "Sports"])
        );
    }

    #[test]
    fn into_typed_drops_raw_records() {
        let names: Vec<_> = mixed().into_typed().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Ada", "Grace"]);
    }
}
