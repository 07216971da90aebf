use super::types::{SlotAddress, TableError};
use crate::cluster::types::Rank;

/// Block placement of global slots onto ranks.
///
/// `local_size = ceil(global_size / rank_count)`; slot `s` lives on rank
/// `s / local_size` at offset `s % local_size`. The last ranks may own a partial
/// shard, or none at all, when `global_size` is not a multiple of `rank_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDirectory {
    global_size: u64,
    rank_count: u32,
    local_size: u64,
}

impl SlotDirectory {
    pub fn new(global_size: u64, rank_count: usize) -> Result<Self, TableError> {
        if global_size == 0 {
            return Err(TableError::Geometry("global size must be positive".into()));
        }
        if rank_count == 0 || rank_count > u32::MAX as usize {
            return Err(TableError::Geometry(format!(
                "rank count {} out of range",
                rank_count
            )));
        }

        Ok(Self {
            global_size,
            rank_count: rank_count as u32,
            local_size: global_size.div_ceil(rank_count as u64),
        })
    }

    pub fn global_size(&self) -> u64 {
        self.global_size
    }

    pub fn rank_count(&self) -> usize {
        self.rank_count as usize
    }

    pub fn local_size(&self) -> u64 {
        self.local_size
    }

    pub fn owner(&self, slot: u64) -> Rank {
        Rank((slot / self.local_size) as u32)
    }

    pub fn offset(&self, slot: u64) -> usize {
        (slot % self.local_size) as usize
    }

    pub fn locate(&self, slot: u64) -> SlotAddress {
        SlotAddress {
            rank: self.owner(slot),
            offset: self.offset(slot),
        }
    }

    /// Inverse of [`locate`](Self::locate). `None` for addresses that map to no slot.
    pub fn slot_at(&self, rank: Rank, offset: usize) -> Option<u64> {
        if rank.0 >= self.rank_count || offset as u64 >= self.local_size {
            return None;
        }
        let slot = rank.0 as u64 * self.local_size + offset as u64;
        (slot < self.global_size).then_some(slot)
    }

    /// Number of slots actually owned by `rank`.
    pub fn shard_len(&self, rank: Rank) -> usize {
        let start = rank.0 as u64 * self.local_size;
        let end = (start + self.local_size).min(self.global_size);
        end.saturating_sub(start) as usize
    }

    /// Linear probe order for `hash`: `(hash + probe) mod global_size` for every probe
    /// in `[0, global_size)`.
    pub fn probe_sequence(&self, hash: u64) -> impl Iterator<Item = u64> + use<> {
        let size = self.global_size as u128;
        let start = hash as u128 % size;
        (0..self.global_size).map(move |probe| ((start + probe as u128) % size) as u64)
    }
}
