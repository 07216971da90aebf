use crate::storage::types::ShardError;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identity of one worker in the cluster, `0..rank_n`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(pub u32);

impl Rank {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability minted by a rank for the shard it currently serves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ShardToken(pub String);

impl ShardToken {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ShardToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque reference to another rank's shard.
///
/// It is never dereferenced locally: the only thing one can do with it is send a
/// request to `rank`, which checks the token before touching its memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ShardHandle {
    pub rank: Rank,
    pub token: ShardToken,
}

impl ShardHandle {
    pub fn new(rank: Rank) -> Self {
        Self {
            rank,
            token: ShardToken::new(),
        }
    }
}

/// Handles of every rank's shard, indexed by rank.
///
/// Built once from the all-gather performed during table construction and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct ShardDirectory {
    handles: Vec<ShardHandle>,
}

impl ShardDirectory {
    pub fn from_gathered(
        mut gathered: Vec<ShardHandle>,
        rank_n: usize,
    ) -> Result<Self, TransportError> {
        gathered.sort_by_key(|handle| handle.rank);

        if gathered.len() != rank_n {
            return Err(TransportError::Directory(format!(
                "expected {} shard handles, gathered {}",
                rank_n,
                gathered.len()
            )));
        }
        for (idx, handle) in gathered.iter().enumerate() {
            if handle.rank.index() != idx {
                return Err(TransportError::Directory(format!(
                    "missing or duplicate handle for rank {}",
                    idx
                )));
            }
        }

        Ok(Self { handles: gathered })
    }

    pub fn handle(&self, rank: Rank) -> Option<&ShardHandle> {
        self.handles.get(rank.index())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShardHandle> {
        self.handles.iter()
    }
}

/// Failures moving a request between ranks, or reported by the rank that ran it.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("rank {rank} is outside the cluster of {rank_n} ranks")]
    UnknownRank { rank: Rank, rank_n: usize },

    #[error("rank {0} has no shard attached")]
    NotAttached(Rank),

    #[error("rank {0} is unreachable: its mailbox is closed")]
    Disconnected(Rank),

    #[error("shard directory is inconsistent: {0}")]
    Directory(String),

    #[error("rank {rank} rejected the request: {source}")]
    Remote { rank: Rank, source: ShardError },

    #[error("rank {rank} answered HTTP {status}")]
    Status { rank: Rank, status: u16 },

    #[error("collective operation failed: {0}")]
    Collective(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}
