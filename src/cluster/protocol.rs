//! Cluster Coordination Protocol
//!
//! Endpoints and DTOs for the collective operations of the HTTP transport. Rank 0
//! acts as coordinator: every rank reports its arrival there and polls until all ranks
//! have arrived. These bodies are JSON; shard operations use the bincode endpoint in
//! `storage::protocol`.

use super::types::{Rank, ShardHandle};
use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Coordinator endpoint recording a rank's arrival at a barrier (POST), or reporting
/// how many ranks have arrived (GET `/{epoch}`).
pub const ENDPOINT_BARRIER: &str = "/internal/barrier";
/// Coordinator endpoint collecting shard handles (POST), or returning the handles
/// collected so far (GET `/{epoch}`).
pub const ENDPOINT_GATHER: &str = "/internal/gather";

// --- Data Transfer Objects ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarrierArrival {
    pub epoch: u64,
    pub rank: Rank,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarrierStatus {
    pub epoch: u64,
    pub arrived: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatherContribution {
    pub epoch: u64,
    pub handle: ShardHandle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatherStatus {
    pub epoch: u64,
    pub handles: Vec<ShardHandle>,
}
