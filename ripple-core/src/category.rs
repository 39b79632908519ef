//! The mutable set of event categories.

use tracing::info;

use crate::error::RippleResult;
use crate::store::{Collection, RecordStore, Records};
use crate::validation;

#[derive(Clone)]
pub struct CategoryManager {
    store: RecordStore,
}

impl CategoryManager {
    pub fn new(store: RecordStore) -> Self {
        CategoryManager { store }
    }

    pub fn list(&self) -> Vec<String> {
        self.store.load(Collection::Categories)
    }

    /// Add a category and keep the list sorted. Returns false when it is
    /// already present.
    pub fn add(&self, name: &str) -> RippleResult<bool> {
        validation::require("category", name)?;
        let name = name.trim();

        let mut categories: Records<String> = self.store.load_records(Collection::Categories);
        if categories.iter().any(|c| c == name) {
            return Ok(false);
        }

        categories.push(name.to_string());
        categories.sort();
        self.store.save(Collection::Categories, &categories)?;
        info!(category = %name, "added category");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_CATEGORIES;
    use crate::error::RippleError;

    #[test]
    fn add_keeps_list_sorted_and_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        store.initialize().unwrap();
        let categories = CategoryManager::new(store);

        assert!(categories.add("Astronomy").unwrap());
        assert!(!categories.add("Astronomy").unwrap());

        let list = categories.list();
        assert_eq!(list.len(), DEFAULT_CATEGORIES.len() + 1);
        assert_eq!(list[0], "Arts & Culture");
        assert_eq!(list[1], "Astronomy");
        let mut sorted = list.clone();
        sorted.sort();
        assert_eq!(list, sorted);
    }

    #[test]
    fn non_string_entries_are_kept_on_add() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path());
        store
            .save(Collection::Categories, &serde_json::json!(["Sports", {"name": "Old"}]))
            .unwrap();
        let categories = CategoryManager::new(store.clone());

        assert!(categories.add("Arts").unwrap());

        let raw = serde_json::Value::Array(store.load(Collection::Categories));
        assert_eq!(raw, serde_json::json!(["Arts", {"name": "Old"}, "Sports"]));
        assert_eq!(categories.list(), vec!["Arts", "Sports"]);
    }

    #[test]
    fn blank_category_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let categories = CategoryManager::new(RecordStore::new(dir.path()));

        assert!(matches!(categories.add("  "), Err(RippleError::Validation(_))));
        assert!(categories.list().is_empty());
    }
}
