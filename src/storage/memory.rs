use super::handlers::ShardService;
use super::partitioner::SlotDirectory;
use super::protocol::{ShardEnvelope, ShardReply, ShardRequest};
use super::shard::LocalShard;
use super::types::TableError;
use crate::cluster::transport::Transport;
use crate::cluster::types::{Rank, ShardDirectory, ShardHandle, TransportError};
use crate::kmer::{Kmer, KmerPair};

use std::sync::Arc;

/// Distributed open-addressing hash table of k-mer records.
///
/// Every rank holds one instance. The slot space `[0, global_size)` is split into
/// per-rank shards by `SlotDirectory`; probes against a slot owned by another rank go
/// through the `Transport` as a blocking round trip.
pub struct DistributedHashMap<T> {
    transport: Arc<T>,
    slots: SlotDirectory,
    shards: ShardDirectory,
    local: Arc<ShardService>,
}

impl<T: Transport> DistributedHashMap<T> {
    /// Collective constructor: every rank of the cluster must call it with the same
    /// `global_size`.
    ///
    /// Allocates the local shard, attaches it to the transport, then exchanges shard
    /// handles with every rank. Barriers on both sides of the exchange guarantee no
    /// rank starts inserting before every shard is reachable.
    pub async fn new(transport: Arc<T>, global_size: u64) -> Result<Self, TableError> {
        let slots = SlotDirectory::new(global_size, transport.rank_n())?;
        let rank_me = transport.rank_me();

        let handle = ShardHandle::new(rank_me);
        let shard = LocalShard::new(slots.local_size() as usize);
        let local = Arc::new(ShardService::new(handle.clone(), shard));
        transport.attach(local.clone())?;

        transport.barrier().await?;
        let gathered = transport.all_gather(handle).await?;
        let shards = ShardDirectory::from_gathered(gathered, transport.rank_n())?;
        transport.barrier().await?;

        tracing::info!(
            "Rank {} joined table: {} slots over {} ranks ({} local, {} owned)",
            rank_me,
            slots.global_size(),
            slots.rank_count(),
            slots.local_size(),
            slots.shard_len(rank_me)
        );

        Ok(Self {
            transport,
            slots,
            shards,
            local,
        })
    }

    pub fn size(&self) -> u64 {
        self.slots.global_size()
    }

    pub fn slots(&self) -> &SlotDirectory {
        &self.slots
    }

    pub fn rank_me(&self) -> Rank {
        self.transport.rank_me()
    }

    pub fn local_shard(&self) -> &LocalShard {
        self.local.shard()
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Inserts a record into the first free slot of its probe sequence.
    ///
    /// Keys are not deduplicated: inserting the same key twice uses two slots.
    /// Fails with `CapacityExhausted` once all `global_size` slots were probed.
    pub async fn insert(&self, pair: &KmerPair) -> Result<(), TableError> {
        for (probe, slot) in self.slots.probe_sequence(pair.hash64()).enumerate() {
            if self.request_slot(slot).await? {
                self.write_slot(slot, pair).await?;
                tracing::trace!("Inserted {} at slot {} after {} probes", pair.kmer, slot, probe);
                return Ok(());
            }
        }

        Err(TableError::CapacityExhausted {
            global_size: self.slots.global_size(),
        })
    }

    /// Looks up the first record, in probe order, whose k-mer equals `key`.
    ///
    /// The first unoccupied slot ends the search: a record for `key` could not have
    /// been placed past it.
    pub async fn find(&self, key: &Kmer) -> Result<Option<KmerPair>, TableError> {
        for slot in self.slots.probe_sequence(key.hash64()) {
            if !self.slot_used(slot).await? {
                return Ok(None);
            }
            // A claimed slot whose record is not written yet cannot match.
            if let Some(pair) = self.read_slot(slot).await?
                && pair.kmer == *key
            {
                return Ok(Some(pair));
            }
        }

        Ok(None)
    }

    async fn request_slot(&self, slot: u64) -> Result<bool, TableError> {
        let offset = self.slots.offset(slot);
        match self.send(slot, ShardRequest::ClaimSlot { offset }).await? {
            ShardReply::Claimed(won) => Ok(won),
            _ => Err(self.unexpected(slot, "ClaimSlot")),
        }
    }

    async fn write_slot(&self, slot: u64, pair: &KmerPair) -> Result<(), TableError> {
        let request = ShardRequest::WriteRecord {
            offset: self.slots.offset(slot),
            record: pair.clone(),
        };
        match self.send(slot, request).await? {
            ShardReply::Written => Ok(()),
            _ => Err(self.unexpected(slot, "WriteRecord")),
        }
    }

    async fn slot_used(&self, slot: u64) -> Result<bool, TableError> {
        let offset = self.slots.offset(slot);
        match self.send(slot, ShardRequest::ReadFlag { offset }).await? {
            ShardReply::Flag(used) => Ok(used),
            _ => Err(self.unexpected(slot, "ReadFlag")),
        }
    }

    async fn read_slot(&self, slot: u64) -> Result<Option<KmerPair>, TableError> {
        let offset = self.slots.offset(slot);
        match self.send(slot, ShardRequest::ReadRecord { offset }).await? {
            ShardReply::Record(pair) => Ok(pair),
            _ => Err(self.unexpected(slot, "ReadRecord")),
        }
    }

    /// Routes a request to the owner of `slot`, short-cutting when that is this rank.
    async fn send(&self, slot: u64, request: ShardRequest) -> Result<ShardReply, TableError> {
        let owner = self.slots.owner(slot);
        let handle = self
            .shards
            .handle(owner)
            .ok_or(TransportError::UnknownRank {
                rank: owner,
                rank_n: self.shards.len(),
            })?
            .clone();
        let envelope = ShardEnvelope { handle, request };

        if owner == self.transport.rank_me() {
            return self
                .local
                .dispatch(envelope)
                .map_err(|source| TransportError::Remote { rank: owner, source }.into());
        }

        Ok(self.transport.call(owner, envelope).await?)
    }

    fn unexpected(&self, slot: u64, op: &'static str) -> TableError {
        TableError::UnexpectedReply {
            rank: self.slots.owner(slot),
            op,
        }
    }
}
