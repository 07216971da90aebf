//! Cluster Module
//!
//! Rank identity and the communication layer between ranks.
//!
//! ## Core Concepts
//! - **Ranks**: Every worker runs the same program and is identified by `Rank(0..rank_n)`.
//! - **Shard Handles**: A `ShardHandle` pairs a rank with a capability token minted for
//!   its shard. The `ShardDirectory` of all handles is exchanged once per table and
//!   never changes afterwards.
//! - **Transport**: The `Transport` trait carries shard requests as blocking round trips
//!   and provides the two collectives the table needs: `barrier` and `all_gather`.
//!   `LocalCluster` runs ranks as tasks of one process; `HttpTransport` runs one
//!   process per rank over HTTP.

pub mod handlers;
pub mod http;
pub mod local;
pub mod protocol;
pub mod transport;
pub mod types;

pub use http::HttpTransport;
pub use local::{LocalCluster, LocalTransport};
pub use transport::Transport;
pub use types::{Rank, ShardDirectory, ShardHandle, ShardToken, TransportError};

#[cfg(test)]
mod tests;
