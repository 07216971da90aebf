use super::types::ShardError;
use crate::kmer::KmerPair;

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// One rank's slice of the table.
///
/// Occupancy flags go `false -> true` exactly once through [`claim`](Self::claim), and
/// each record is written at most once after its slot was claimed. Nothing is ever
/// reset or removed.
pub struct LocalShard {
    records: Vec<OnceLock<KmerPair>>,
    used: Vec<AtomicBool>,
}

impl LocalShard {
    pub fn new(local_size: usize) -> Self {
        Self {
            records: (0..local_size).map(|_| OnceLock::new()).collect(),
            used: (0..local_size).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    fn check(&self, offset: usize) -> Result<(), ShardError> {
        if offset >= self.len() {
            return Err(ShardError::OutOfBounds {
                offset,
                len: self.len(),
            });
        }
        Ok(())
    }

    /// Claim-if-free. Exactly one caller ever observes `true` for a given offset.
    pub fn claim(&self, offset: usize) -> Result<bool, ShardError> {
        self.check(offset)?;
        Ok(self.used[offset]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok())
    }

    pub fn write(&self, offset: usize, record: KmerPair) -> Result<(), ShardError> {
        self.check(offset)?;
        if !self.used[offset].load(Ordering::Acquire) {
            return Err(ShardError::Unclaimed(offset));
        }
        self.records[offset]
            .set(record)
            .map_err(|_| ShardError::AlreadyWritten(offset))
    }

    pub fn is_used(&self, offset: usize) -> Result<bool, ShardError> {
        self.check(offset)?;
        Ok(self.used[offset].load(Ordering::Acquire))
    }

    /// The stored record, or `None` if the slot holds nothing yet.
    pub fn read(&self, offset: usize) -> Result<Option<KmerPair>, ShardError> {
        self.check(offset)?;
        Ok(self.records[offset].get().cloned())
    }

    pub fn occupied_count(&self) -> usize {
        self.used
            .iter()
            .filter(|flag| flag.load(Ordering::Acquire))
            .count()
    }

    pub fn records(&self) -> impl Iterator<Item = &KmerPair> {
        self.records.iter().filter_map(|slot| slot.get())
    }
}
