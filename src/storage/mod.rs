//! Distributed Storage Module
//!
//! Implements the distributed open-addressing hash table that holds every k-mer record.
//!
//! ## Core Concepts
//! - **Slot Directory**: `SlotDirectory` maps a global slot to its owning rank and local
//!   offset. It is a pure function of the table size and the rank count, so every rank
//!   computes the same placement without asking anybody.
//! - **Shards**: Each rank owns one contiguous `LocalShard` of records and occupancy
//!   flags. Only the owning rank touches its memory; other ranks send it requests.
//! - **Remote Operations**: A small fixed set of requests (`ClaimSlot`, `WriteRecord`,
//!   `ReadFlag`, `ReadRecord`) dispatched by the owner's `ShardService`.
//! - **Access**: `DistributedHashMap` linear-probes the global slot space and routes each
//!   probe to the owner (local or remote) transparently.

pub mod handlers;
pub mod memory;
pub mod partitioner;
pub mod protocol;
pub mod shard;
pub mod types;

pub use handlers::ShardService;
pub use memory::DistributedHashMap;
pub use partitioner::SlotDirectory;
pub use shard::LocalShard;
pub use types::{ShardError, SlotAddress, TableError};
