//! # Sink table
//!
//! Fixed capacity table of paired GPDs, at most one entry per GPD address.

use psila_gp_data::green_power::{SinkTableEntry, SINK_TABLE_RECORD_SIZE};
use psila_gp_data::GpdAddress;

use crate::config::MAX_SINK_TABLE_ENTRIES;
use crate::storage::{PersistentStorage, TableId};
use crate::Error;

/// Sink table
#[derive(Clone, Debug)]
pub struct SinkTable {
    entries: heapless::Vec<Option<SinkTableEntry>, MAX_SINK_TABLE_ENTRIES>,
}

impl SinkTable {
    /// Create a table with `capacity` slots, at most
    /// `MAX_SINK_TABLE_ENTRIES`
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: (0..capacity.min(MAX_SINK_TABLE_ENTRIES)).map(|_| None).collect(),
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of used slots
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// True if no slot is used
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of unused slots
    pub fn free_slots(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Index of the entry for `address`
    pub fn lookup(&self, address: &GpdAddress) -> Option<usize> {
        self.entries.iter().position(|entry| match entry {
            Some(entry) => entry.address.matches(address),
            None => false,
        })
    }

    /// Index of the entry for `address`, or of the first free slot
    pub fn find_or_allocate(&self, address: &GpdAddress) -> Result<usize, Error> {
        if let Some(index) = self.lookup(address) {
            return Ok(index);
        }
        self.entries
            .iter()
            .position(|entry| entry.is_none())
            .ok_or(Error::SinkTableFull)
    }

    /// Entry in slot `index`
    pub fn get(&self, index: usize) -> Option<&SinkTableEntry> {
        self.entries.get(index).and_then(|entry| entry.as_ref())
    }

    /// Entry for `address`
    pub fn get_by_address(&self, address: &GpdAddress) -> Option<&SinkTableEntry> {
        self.lookup(address).and_then(|index| self.get(index))
    }

    /// Store `entry` in slot `index`, a entry for the same GPD in another
    /// slot is removed
    pub fn set(&mut self, index: usize, entry: SinkTableEntry) -> Result<(), Error> {
        if index >= self.entries.len() {
            return Err(Error::NotFound);
        }
        for (n, slot) in self.entries.iter_mut().enumerate() {
            if n == index {
                continue;
            }
            if let Some(other) = slot {
                if other.address.matches(&entry.address) {
                    *slot = None;
                }
            }
        }
        self.entries[index] = Some(entry);
        Ok(())
    }

    /// Remove the entry in slot `index`
    pub fn remove(&mut self, index: usize) -> Option<SinkTableEntry> {
        self.entries.get_mut(index).and_then(|entry| entry.take())
    }

    /// Update the security frame counter of the entry in slot `index`
    pub fn set_security_frame_counter(&mut self, index: usize, frame_counter: u32) -> Result<(), Error> {
        match self.entries.get_mut(index) {
            Some(Some(entry)) => {
                entry.frame_counter = frame_counter;
                Ok(())
            }
            _ => Err(Error::NotFound),
        }
    }

    /// Remove all entries
    pub fn clear_all(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = None;
        }
    }

    /// Iterate over the used slots
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SinkTableEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|e| (index, e)))
    }

    /// Write every slot to `storage`
    pub fn save<S: PersistentStorage>(&self, storage: &mut S) -> Result<(), Error> {
        let mut record = [0u8; SINK_TABLE_RECORD_SIZE];
        for (index, entry) in self.entries.iter().enumerate() {
            match entry {
                Some(entry) => {
                    entry.write_record(&mut record)?;
                    storage.write(TableId::SinkTable, index, &record)?;
                }
                None => storage.erase(TableId::SinkTable, index)?,
            }
        }
        Ok(())
    }

    /// Load every slot from `storage`, returns the number of entries read
    pub fn restore<S: PersistentStorage>(&mut self, storage: &mut S) -> Result<usize, Error> {
        let mut record = [0u8; SINK_TABLE_RECORD_SIZE];
        let mut count = 0;
        for index in 0..self.entries.len() {
            self.entries[index] = if storage.read(TableId::SinkTable, index, &mut record)? {
                SinkTableEntry::read_record(&record)?
            } else {
                None
            };
            if self.entries[index].is_some() {
                count += 1;
            }
        }
        log::info!("Restored {} sink table entries", count);
        Ok(count)
    }
}
