//! Record store abstraction.
//!
//! The query layer only borrows a store: it reads every record once while the
//! indexes are built and then looks records up by identifier to hydrate query
//! results. Any backing storage can sit behind [`RecordStore`].

use crate::error::{CityQueryError, Result};
use cityquery_types::record::{Record, RecordId};
use std::collections::BTreeMap;

/// Read access to the records being indexed.
pub trait RecordStore: Send + Sync {
    /// Look up a record by identifier.
    fn get(&self, id: RecordId) -> Result<Option<Record>>;

    /// Every record, in a stable order.
    fn all(&self) -> Result<Vec<Record>>;

    /// Number of records held.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// In-memory store keyed by identifier. `all` returns records in ascending
/// identifier order.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: BTreeMap<RecordId, Record>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect records into a store, rejecting repeated identifiers.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Add a record. Fails with `DuplicateRecord` if the identifier is taken.
    pub fn insert(&mut self, record: Record) -> Result<()> {
        if self.records.contains_key(&record.id) {
            return Err(CityQueryError::DuplicateRecord(record.id));
        }
        self.records.insert(record.id, record);
        Ok(())
    }

    /// Remove a record, returning it if present.
    ///
    /// Indexes built before the removal still reference the identifier; the
    /// query layer treats it as dangling.
    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        self.records.remove(&id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, id: RecordId) -> Result<Option<Record>> {
        Ok(self.records.get(&id).cloned())
    }

    fn all(&self) -> Result<Vec<Record>> {
        Ok(self.records.values().cloned().collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.records.len())
    }
}

impl FromIterator<Record> for MemoryRecordStore {
    /// Later records replace earlier ones with the same identifier.
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|r| (r.id, r)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut store = MemoryRecordStore::new();
        store.insert(Record::new(7, "Lyon", 45.75, 4.85)).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get(7).unwrap().unwrap().name, "Lyon");
        assert!(store.get(8).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = MemoryRecordStore::from_records([
            Record::new(1, "A", 0.0, 0.0),
            Record::new(1, "B", 1.0, 1.0),
        ])
        .unwrap_err();
        assert!(matches!(err, CityQueryError::DuplicateRecord(1)));
    }

    #[test]
    fn test_all_in_id_order() {
        let store = MemoryRecordStore::from_records([
            Record::new(30, "C", 0.0, 0.0),
            Record::new(10, "A", 0.0, 0.0),
            Record::new(20, "B", 0.0, 0.0),
        ])
        .unwrap();
        let ids: Vec<RecordId> = store.all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_remove() {
        let mut store: MemoryRecordStore = [Record::new(1, "A", 0.0, 0.0)].into_iter().collect();
        assert!(store.remove(1).is_some());
        assert!(store.is_empty().unwrap());
        assert!(store.remove(1).is_none());
    }
}
