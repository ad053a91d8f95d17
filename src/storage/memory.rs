use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::{sort_newest_first, Dataset, DatasetStore, DatasetSummary, StorageError};

/// Process-local dataset store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    datasets: DashMap<String, Arc<Dataset>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl DatasetStore for InMemoryStore {
    fn insert(&self, dataset: Dataset) -> Result<Arc<Dataset>, StorageError> {
        match self.datasets.entry(dataset.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::DatasetExists(dataset.id)),
            Entry::Vacant(slot) => {
                let dataset = Arc::new(dataset);
                slot.insert(Arc::clone(&dataset));
                Ok(dataset)
            }
        }
    }

    fn get(&self, id: &str) -> Result<Option<Arc<Dataset>>, StorageError> {
        Ok(self.datasets.get(id).map(|d| Arc::clone(&d)))
    }

    fn list(&self) -> Result<Vec<DatasetSummary>, StorageError> {
        let mut summaries: Vec<DatasetSummary> =
            self.datasets.iter().map(|e| e.value().summary()).collect();
        sort_newest_first(&mut summaries);
        Ok(summaries)
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.datasets.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::dataset;
    use chrono::Duration;

    #[test]
    fn test_insert_and_get() {
        let store = InMemoryStore::new();
        let stored = store.insert(dataset("a.csv")).unwrap();

        let fetched = store.get(&stored.id).unwrap().unwrap();
        assert_eq!(fetched.filename, "a.csv");
        assert!(Arc::ptr_eq(&stored, &fetched));
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = InMemoryStore::new();
        let first = dataset("a.csv");
        let mut second = dataset("b.csv");
        second.id = first.id.clone();

        store.insert(first).unwrap();
        assert!(matches!(
            store.insert(second),
            Err(StorageError::DatasetExists(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_list_newest_first() {
        let store = InMemoryStore::new();
        let mut older = dataset("older.csv");
        older.uploaded_at = older.uploaded_at - Duration::hours(1);
        store.insert(older).unwrap();
        store.insert(dataset("newer.csv")).unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|s| s.filename).collect();
        assert_eq!(names, vec!["newer.csv", "older.csv"]);
    }

    #[test]
    fn test_delete() {
        let store = InMemoryStore::new();
        let stored = store.insert(dataset("a.csv")).unwrap();

        assert!(store.delete(&stored.id).unwrap());
        assert!(!store.delete(&stored.id).unwrap());
        assert!(store.is_empty());
    }
}
