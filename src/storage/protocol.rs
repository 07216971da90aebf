//! Shard Wire Protocol
//!
//! The fixed set of operations one rank can ask another rank to run against the shard
//! it owns. Envelopes and replies are bincode-encoded in HTTP bodies, or passed as
//! values between in-process ranks.

use super::types::ShardError;
use crate::cluster::types::ShardHandle;
use crate::kmer::KmerPair;

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Endpoint on the owning rank that executes a `ShardEnvelope`.
pub const ENDPOINT_SHARD_OP: &str = "/internal/shard";

// --- Operations ---

/// A single remote operation against the owner's shard, addressed by local offset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ShardRequest {
    /// Atomically set the occupancy flag if it is clear. Replies `Claimed(won)`.
    ClaimSlot { offset: usize },
    /// Store the record of a slot the caller has claimed. Replies `Written`.
    WriteRecord { offset: usize, record: KmerPair },
    /// Replies `Flag(occupied)`.
    ReadFlag { offset: usize },
    /// Replies `Record(stored)`.
    ReadRecord { offset: usize },
}

impl ShardRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ShardRequest::ClaimSlot { .. } => "ClaimSlot",
            ShardRequest::WriteRecord { .. } => "WriteRecord",
            ShardRequest::ReadFlag { .. } => "ReadFlag",
            ShardRequest::ReadRecord { .. } => "ReadRecord",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ShardReply {
    Claimed(bool),
    Written,
    Flag(bool),
    Record(Option<KmerPair>),
}

/// A request plus the handle of the shard it targets.
///
/// The receiver executes it only if the handle is the one it minted for its current
/// shard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardEnvelope {
    pub handle: ShardHandle,
    pub request: ShardRequest,
}

/// What the owning rank sends back for an envelope.
pub type ShardResponse = Result<ShardReply, ShardError>;
