use super::types::{Rank, ShardHandle, TransportError};
use crate::storage::handlers::ShardService;
use crate::storage::protocol::{ShardEnvelope, ShardReply};

use std::future::Future;
use std::sync::Arc;

/// How a rank reaches the other ranks of its cluster.
///
/// Every remote call is a blocking round trip from the caller's point of view: the
/// returned future resolves only once the target rank has executed the request and
/// answered. Requests issued by one rank are delivered in the order issued.
pub trait Transport: Send + Sync + 'static {
    fn rank_me(&self) -> Rank;

    fn rank_n(&self) -> usize;

    /// Installs the shard service that answers requests addressed to this rank.
    ///
    /// Attaching a new service replaces the previous one, which invalidates every
    /// handle minted for it.
    fn attach(&self, service: Arc<ShardService>) -> Result<(), TransportError>;

    /// Sends `envelope` to `target` and waits for its reply.
    fn call(
        &self,
        target: Rank,
        envelope: ShardEnvelope,
    ) -> impl Future<Output = Result<ShardReply, TransportError>> + Send;

    /// Returns once every rank of the cluster has entered this barrier.
    fn barrier(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Contributes `handle` and returns the handles contributed by all ranks.
    fn all_gather(
        &self,
        handle: ShardHandle,
    ) -> impl Future<Output = Result<Vec<ShardHandle>, TransportError>> + Send;
}
