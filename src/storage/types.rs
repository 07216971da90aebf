use crate::cluster::types::{Rank, TransportError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Physical location of a global slot: the owning rank and the offset in its shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotAddress {
    pub rank: Rank,
    pub offset: usize,
}

/// Errors raised by the owning rank while executing a shard request.
///
/// These travel back over the wire, so they are serializable.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ShardError {
    #[error("offset {offset} is outside the shard of {len} slots")]
    OutOfBounds { offset: usize, len: usize },

    #[error("request carries a stale or foreign handle for rank {0}")]
    StaleHandle(Rank),

    #[error("slot at offset {0} was already written")]
    AlreadyWritten(usize),

    #[error("slot at offset {0} was written without being claimed")]
    Unclaimed(usize),
}

/// Errors surfaced by `DistributedHashMap` operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// Every slot was probed without finding a free one: the table is undersized.
    #[error("hash table is full: probed all {global_size} slots without a free one")]
    CapacityExhausted { global_size: u64 },

    #[error("invalid table geometry: {0}")]
    Geometry(String),

    #[error("rank {rank} answered {op} with an unexpected reply")]
    UnexpectedReply { rank: Rank, op: &'static str },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
