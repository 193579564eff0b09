//! Record storage behind the engine.
//!
//! The engine never touches a global map: every service instance is handed
//! a `Storage` whose repositories it owns. `InMemoryRepository` is the only
//! backend shipped here; durability is layered on with snapshots.

use crate::assets::LocalizedAsset;
use crate::error::{LocalizationError, Result};
use crate::jobs::{TranslationBatch, TranslationJob};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A stored record addressed by a string id.
pub trait Record: Clone + Send + Sync + 'static {
    /// Noun used in `NotFound` errors ("job", "batch", "asset")
    const KIND: &'static str;

    fn id(&self) -> &str;
}

/// Keyed record storage with atomic read-modify-write.
pub trait Repository<T: Record>: Send + Sync {
    /// Insert or replace a record, returning the previous one.
    fn insert(&self, record: T) -> Option<T>;

    fn get(&self, id: &str) -> Option<T>;

    /// Apply `change` to a copy of the record and store it only if the
    /// closure succeeds. Concurrent updates to the same id are serialized.
    fn update(&self, id: &str, change: &mut dyn FnMut(&mut T) -> Result<()>) -> Result<T>;

    fn remove(&self, id: &str) -> Option<T>;

    fn list(&self) -> Vec<T>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct InMemoryRepository<T> {
    records: RwLock<HashMap<String, T>>,
}

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Repository<T> for InMemoryRepository<T> {
    fn insert(&self, record: T) -> Option<T> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.id().to_string(), record)
    }

    fn get(&self, id: &str) -> Option<T> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.get(id).cloned()
    }

    fn update(&self, id: &str, change: &mut dyn FnMut(&mut T) -> Result<()>) -> Result<T> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let current = records
            .get(id)
            .ok_or_else(|| LocalizationError::not_found(T::KIND, id))?;

        let mut updated = current.clone();
        change(&mut updated)?;
        records.insert(id.to_string(), updated.clone());
        Ok(updated)
    }

    fn remove(&self, id: &str) -> Option<T> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.remove(id)
    }

    fn list(&self) -> Vec<T> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.values().cloned().collect()
    }

    fn clear(&self) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.clear();
    }

    fn len(&self) -> usize {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        records.len()
    }
}

/// The three repositories a service instance needs.
#[derive(Clone)]
pub struct Storage {
    pub jobs: Arc<dyn Repository<TranslationJob>>,
    pub batches: Arc<dyn Repository<TranslationBatch>>,
    pub assets: Arc<dyn Repository<LocalizedAsset>>,
}

impl Storage {
    /// Fresh, empty in-memory storage.
    pub fn in_memory() -> Self {
        Self {
            jobs: Arc::new(InMemoryRepository::new()),
            batches: Arc::new(InMemoryRepository::new()),
            assets: Arc::new(InMemoryRepository::new()),
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: String,
        body: String,
    }

    impl Record for Note {
        const KIND: &'static str = "note";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let repo = InMemoryRepository::new();
        assert!(repo.insert(note("a", "first")).is_none());
        assert_eq!(repo.get("a"), Some(note("a", "first")));
        assert_eq!(repo.get("missing"), None);
    }

    #[test]
    fn test_insert_replaces() {
        let repo = InMemoryRepository::new();
        repo.insert(note("a", "first"));
        let previous = repo.insert(note("a", "second"));
        assert_eq!(previous, Some(note("a", "first")));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_update_applies_change() {
        let repo = InMemoryRepository::new();
        repo.insert(note("a", "first"));

        let updated = repo
            .update("a", &mut |n: &mut Note| {
                n.body.push_str("!");
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.body, "first!");
        assert_eq!(repo.get("a").unwrap().body, "first!");
    }

    #[test]
    fn test_failed_update_leaves_record_untouched() {
        let repo = InMemoryRepository::new();
        repo.insert(note("a", "first"));

        let result = repo.update("a", &mut |n: &mut Note| {
            n.body = "mutated".to_string();
            Err(LocalizationError::InvalidInput("rejected".into()))
        });

        assert!(result.is_err());
        assert_eq!(repo.get("a").unwrap().body, "first");
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let repo: InMemoryRepository<Note> = InMemoryRepository::new();
        let err = repo.update("nope", &mut |_| Ok(())).unwrap_err();
        assert!(matches!(err, LocalizationError::NotFound { kind: "note", .. }));
    }

    #[test]
    fn test_remove_list_clear() {
        let repo = InMemoryRepository::new();
        repo.insert(note("a", "1"));
        repo.insert(note("b", "2"));
        assert_eq!(repo.list().len(), 2);

        assert_eq!(repo.remove("a"), Some(note("a", "1")));
        assert_eq!(repo.remove("a"), None);
        assert_eq!(repo.len(), 1);

        repo.clear();
        assert!(repo.is_empty());
    }
}
