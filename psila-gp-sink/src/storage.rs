//! # Persistent storage
//!
//! The sink table and the translation table are persisted as one fixed
//! size record per slot. The storage behind the trait is up to the
//! application, a flash token area or a file.

use std::collections::HashMap;

use crate::Error;

/// Table a record belongs to
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TableId {
    /// Sink table
    SinkTable,
    /// Translation table
    TranslationTable,
}

/// Slot indexed record storage
pub trait PersistentStorage {
    /// Store `record` in `slot`
    fn write(&mut self, table: TableId, slot: usize, record: &[u8]) -> Result<(), Error>;

    /// Read the record in `slot` into `record`, false if nothing is stored
    fn read(&mut self, table: TableId, slot: usize, record: &mut [u8]) -> Result<bool, Error>;

    /// Remove the record in `slot`
    fn erase(&mut self, table: TableId, slot: usize) -> Result<(), Error>;
}

/// Storage kept in memory
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    records: HashMap<(TableId, usize), Vec<u8>>,
}

impl MemoryStorage {
    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PersistentStorage for MemoryStorage {
    fn write(&mut self, table: TableId, slot: usize, record: &[u8]) -> Result<(), Error> {
        self.records.insert((table, slot), record.to_vec());
        Ok(())
    }

    fn read(&mut self, table: TableId, slot: usize, record: &mut [u8]) -> Result<bool, Error> {
        match self.records.get(&(table, slot)) {
            Some(stored) => {
                if stored.len() != record.len() {
                    return Err(Error::NotEnoughSpace);
                }
                record.copy_from_slice(stored);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn erase(&mut self, table: TableId, slot: usize) -> Result<(), Error> {
        self.records.remove(&(table, slot));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage() {
        let mut storage = MemoryStorage::default();
        let mut record = [0u8; 4];
        assert_eq!(storage.read(TableId::SinkTable, 0, &mut record), Ok(false));
        storage
            .write(TableId::SinkTable, 0, &[1, 2, 3, 4])
            .unwrap();
        assert_eq!(storage.read(TableId::SinkTable, 0, &mut record), Ok(true));
        assert_eq!(record, [1, 2, 3, 4]);
        assert_eq!(
            storage.read(TableId::TranslationTable, 0, &mut record),
            Ok(false)
        );
        let mut short = [0u8; 2];
        assert_eq!(
            storage.read(TableId::SinkTable, 0, &mut short),
            Err(Error::NotEnoughSpace)
        );
        storage.erase(TableId::SinkTable, 0).unwrap();
        assert!(storage.is_empty());
    }
}
