//! In-Process Cluster
//!
//! Runs `rank_n` ranks inside one process. Requests from other ranks are served by a
//! dedicated task per rank that drains the rank's mailbox in arrival order and answers
//! every request on a oneshot channel. A rank's own probes skip the mailbox.

use super::transport::Transport;
use super::types::{Rank, ShardHandle, TransportError};
use crate::storage::handlers::ShardService;
use crate::storage::protocol::{ShardEnvelope, ShardReply};

use std::sync::{Arc, Mutex};
use tokio::sync::{Barrier, mpsc, oneshot};

enum RankMessage {
    Attach(Arc<ShardService>),
    Request {
        envelope: ShardEnvelope,
        respond_to: oneshot::Sender<Result<ShardReply, TransportError>>,
    },
}

/// State shared by all ranks of one in-process cluster.
struct Fabric {
    mailboxes: Vec<mpsc::UnboundedSender<RankMessage>>,
    barrier: Barrier,
    exchange: Mutex<Vec<Option<ShardHandle>>>,
}

pub struct LocalCluster;

impl LocalCluster {
    /// Starts the rank tasks and returns one transport per rank, in rank order.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(rank_n: usize) -> Vec<Arc<LocalTransport>> {
        let rank_n = rank_n.max(1);
        let mut mailboxes = Vec::with_capacity(rank_n);

        for idx in 0..rank_n {
            let (tx, rx) = mpsc::unbounded_channel();
            mailboxes.push(tx);
            tokio::spawn(serve_rank(Rank(idx as u32), rx));
        }

        let fabric = Arc::new(Fabric {
            mailboxes,
            barrier: Barrier::new(rank_n),
            exchange: Mutex::new(vec![None; rank_n]),
        });

        tracing::debug!("Spawned in-process cluster of {} ranks", rank_n);

        (0..rank_n)
            .map(|idx| {
                Arc::new(LocalTransport {
                    rank: Rank(idx as u32),
                    fabric: fabric.clone(),
                })
            })
            .collect()
    }
}

/// Serves the requests other ranks address to `rank`.
async fn serve_rank(rank: Rank, mut mailbox: mpsc::UnboundedReceiver<RankMessage>) {
    let mut service: Option<Arc<ShardService>> = None;

    while let Some(message) = mailbox.recv().await {
        match message {
            RankMessage::Attach(attached) => {
                tracing::debug!("Rank {} attached shard of {} slots", rank, attached.shard().len());
                service = Some(attached);
            }
            RankMessage::Request {
                envelope,
                respond_to,
            } => {
                let response = match &service {
                    Some(service) => service
                        .dispatch(envelope)
                        .map_err(|source| TransportError::Remote { rank, source }),
                    None => Err(TransportError::NotAttached(rank)),
                };
                // The caller may have given up; nothing to do then.
                let _ = respond_to.send(response);
            }
        }
    }

    tracing::trace!("Rank {} mailbox closed", rank);
}

/// One rank's view of a [`LocalCluster`].
pub struct LocalTransport {
    rank: Rank,
    fabric: Arc<Fabric>,
}

impl LocalTransport {
    fn mailbox(&self, target: Rank) -> Result<&mpsc::UnboundedSender<RankMessage>, TransportError> {
        self.fabric
            .mailboxes
            .get(target.index())
            .ok_or(TransportError::UnknownRank {
                rank: target,
                rank_n: self.fabric.mailboxes.len(),
            })
    }

    fn lock_exchange(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Vec<Option<ShardHandle>>>, TransportError> {
        self.fabric
            .exchange
            .lock()
            .map_err(|_| TransportError::Collective("handle exchange lock poisoned".into()))
    }
}

impl Transport for LocalTransport {
    fn rank_me(&self) -> Rank {
        self.rank
    }

    fn rank_n(&self) -> usize {
        self.fabric.mailboxes.len()
    }

    fn attach(&self, service: Arc<ShardService>) -> Result<(), TransportError> {
        self.mailbox(self.rank)?
            .send(RankMessage::Attach(service))
            .map_err(|_| TransportError::Disconnected(self.rank))
    }

    async fn call(
        &self,
        target: Rank,
        envelope: ShardEnvelope,
    ) -> Result<ShardReply, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.mailbox(target)?
            .send(RankMessage::Request {
                envelope,
                respond_to: tx,
            })
            .map_err(|_| TransportError::Disconnected(target))?;

        rx.await.map_err(|_| TransportError::Disconnected(target))?
    }

    async fn barrier(&self) -> Result<(), TransportError> {
        self.fabric.barrier.wait().await;
        Ok(())
    }

    async fn all_gather(&self, handle: ShardHandle) -> Result<Vec<ShardHandle>, TransportError> {
        {
            let mut exchange = self.lock_exchange()?;
            exchange[self.rank.index()] = Some(handle);
        }
        self.fabric.barrier.wait().await;

        let gathered = {
            let exchange = self.lock_exchange()?;
            exchange.iter().cloned().collect::<Option<Vec<_>>>()
        };
        // Nobody may overwrite the exchange before every rank has read it.
        self.fabric.barrier.wait().await;

        gathered.ok_or_else(|| TransportError::Collective("a rank contributed no handle".into()))
    }
}
