//! HTTP Cluster Transport
//!
//! One process per rank, with a static peer list shared by every rank (`peers[r]` is
//! the address rank `r` listens on). Shard requests are bincode bodies POSTed to the
//! owner; collectives are coordinated by rank 0.
//!
//! Shard requests are never retried: a `ClaimSlot` whose reply was lost may already
//! have been applied. Only the idempotent coordination messages retry, which covers
//! peers that are still starting up.

use super::handlers::{
    CoordinatorState, handle_barrier_arrive, handle_barrier_status, handle_gather_contribute,
    handle_gather_status,
};
use super::protocol::*;
use super::transport::Transport;
use super::types::{Rank, ShardHandle, TransportError};
use crate::storage::handlers::{AttachedService, ShardService, handle_shard_op};
use crate::storage::protocol::{ENDPOINT_SHARD_OP, ShardEnvelope, ShardReply, ShardResponse};

use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const COORDINATOR: Rank = Rank(0);
const POLL_INTERVAL: Duration = Duration::from_millis(20);
const COORDINATION_TIMEOUT: Duration = Duration::from_millis(2000);
const COORDINATION_ATTEMPTS: usize = 8;

pub struct HttpTransport {
    rank: Rank,
    peers: Vec<SocketAddr>,
    client: reqwest::Client,
    attached: Arc<AttachedService>,
    coordinator: Arc<CoordinatorState>,
    barrier_epoch: AtomicU64,
    gather_epoch: AtomicU64,
}

impl HttpTransport {
    pub fn new(rank: Rank, peers: Vec<SocketAddr>) -> Result<Self, TransportError> {
        if rank.index() >= peers.len() {
            return Err(TransportError::UnknownRank {
                rank,
                rank_n: peers.len(),
            });
        }

        Ok(Self {
            rank,
            peers,
            client: reqwest::Client::new(),
            attached: Arc::new(RwLock::new(None)),
            coordinator: Arc::new(CoordinatorState::new()),
            barrier_epoch: AtomicU64::new(0),
            gather_epoch: AtomicU64::new(0),
        })
    }

    /// Address this rank must listen on.
    pub fn bind_addr(&self) -> SocketAddr {
        self.peers[self.rank.index()]
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(ENDPOINT_SHARD_OP, post(handle_shard_op))
            .route(ENDPOINT_BARRIER, post(handle_barrier_arrive))
            .route(
                &format!("{}/:epoch", ENDPOINT_BARRIER),
                get(handle_barrier_status),
            )
            .route(ENDPOINT_GATHER, post(handle_gather_contribute))
            .route(
                &format!("{}/:epoch", ENDPOINT_GATHER),
                get(handle_gather_status),
            )
            .layer(Extension(self.attached.clone()))
            .layer(Extension(self.coordinator.clone()))
    }

    /// Serves this rank's router on `listener` in a background task.
    pub fn serve(&self, listener: TcpListener) -> JoinHandle<()> {
        let app = self.router();
        let rank = self.rank;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Rank {} HTTP server stopped: {}", rank, e);
            }
        })
    }

    /// Leaves the cluster and stops `server`.
    ///
    /// Non-coordinators announce their departure and stop at once. The coordinator
    /// keeps serving until every rank has announced, since the others still poll it
    /// to pass their last barrier.
    pub async fn shutdown(&self, server: JoinHandle<()>) -> Result<(), TransportError> {
        let epoch = self.barrier_epoch.fetch_add(1, Ordering::SeqCst);

        if self.is_coordinator() {
            self.coordinator.arrive(epoch, self.rank);
            while self.coordinator.arrived(epoch) < self.rank_n() {
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        } else {
            let _: BarrierStatus = self
                .post_with_retry(
                    self.url(COORDINATOR, ENDPOINT_BARRIER)?,
                    &BarrierArrival {
                        epoch,
                        rank: self.rank,
                    },
                )
                .await?;
        }

        server.abort();
        tracing::info!("Rank {} left the cluster", self.rank);
        Ok(())
    }

    fn url(&self, target: Rank, path: &str) -> Result<String, TransportError> {
        let addr = self
            .peers
            .get(target.index())
            .ok_or(TransportError::UnknownRank {
                rank: target,
                rank_n: self.peers.len(),
            })?;
        Ok(format!("http://{}{}", addr, path))
    }

    fn attached_service(&self) -> Result<Arc<ShardService>, TransportError> {
        let guard = self
            .attached
            .read()
            .map_err(|_| TransportError::Collective("shard service lock poisoned".into()))?;
        guard.clone().ok_or(TransportError::NotAttached(self.rank))
    }

    fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR
    }

    async fn post_with_retry<T: Serialize, R: DeserializeOwned>(
        &self,
        url: String,
        payload: &T,
    ) -> Result<R, TransportError> {
        let mut delay_ms = 50u64;

        for attempt in 0..COORDINATION_ATTEMPTS {
            let response = self
                .client
                .post(url.clone())
                .json(payload)
                .timeout(COORDINATION_TIMEOUT)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => return Ok(resp.json().await?),
                Ok(resp) => {
                    return Err(TransportError::Status {
                        rank: COORDINATOR,
                        status: resp.status().as_u16(),
                    });
                }
                Err(e) => {
                    if attempt + 1 == COORDINATION_ATTEMPTS {
                        return Err(e.into());
                    }
                    tracing::debug!("Coordinator not reachable yet ({}), retrying", e);
                    let jitter = rand::random::<u64>() % 25;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1000);
                }
            }
        }

        Err(TransportError::Collective("retry attempts exhausted".into()))
    }

    async fn get_json<R: DeserializeOwned>(&self, url: String) -> Result<R, TransportError> {
        let resp = self
            .client
            .get(url)
            .timeout(COORDINATION_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status {
                rank: COORDINATOR,
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json().await?)
    }
}

impl Transport for HttpTransport {
    fn rank_me(&self) -> Rank {
        self.rank
    }

    fn rank_n(&self) -> usize {
        self.peers.len()
    }

    fn attach(&self, service: Arc<ShardService>) -> Result<(), TransportError> {
        let mut guard = self
            .attached
            .write()
            .map_err(|_| TransportError::Collective("shard service lock poisoned".into()))?;
        *guard = Some(service);
        Ok(())
    }

    async fn call(
        &self,
        target: Rank,
        envelope: ShardEnvelope,
    ) -> Result<ShardReply, TransportError> {
        if target == self.rank {
            return self
                .attached_service()?
                .dispatch(envelope)
                .map_err(|source| TransportError::Remote {
                    rank: target,
                    source,
                });
        }

        let url = self.url(target, ENDPOINT_SHARD_OP)?;
        let body = bincode::serialize(&envelope)?;
        let resp = self.client.post(url).body(body).send().await?;

        if resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(TransportError::NotAttached(target));
        }
        if !resp.status().is_success() {
            return Err(TransportError::Status {
                rank: target,
                status: resp.status().as_u16(),
            });
        }

        let bytes = resp.bytes().await?;
        let response: ShardResponse = bincode::deserialize(&bytes)?;
        response.map_err(|source| TransportError::Remote {
            rank: target,
            source,
        })
    }

    async fn barrier(&self) -> Result<(), TransportError> {
        let epoch = self.barrier_epoch.fetch_add(1, Ordering::SeqCst);
        let rank_n = self.rank_n();

        if self.is_coordinator() {
            self.coordinator.arrive(epoch, self.rank);
        } else {
            let _: BarrierStatus = self
                .post_with_retry(
                    self.url(COORDINATOR, ENDPOINT_BARRIER)?,
                    &BarrierArrival {
                        epoch,
                        rank: self.rank,
                    },
                )
                .await?;
        }

        loop {
            let arrived = if self.is_coordinator() {
                self.coordinator.arrived(epoch)
            } else {
                let status: BarrierStatus = self
                    .get_json(self.url(COORDINATOR, &format!("{}/{}", ENDPOINT_BARRIER, epoch))?)
                    .await?;
                status.arrived
            };

            if arrived >= rank_n {
                tracing::trace!("Rank {} passed barrier {}", self.rank, epoch);
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn all_gather(&self, handle: ShardHandle) -> Result<Vec<ShardHandle>, TransportError> {
        let epoch = self.gather_epoch.fetch_add(1, Ordering::SeqCst);
        let rank_n = self.rank_n();

        if self.is_coordinator() {
            self.coordinator.contribute(epoch, handle);
        } else {
            let _: GatherStatus = self
                .post_with_retry(
                    self.url(COORDINATOR, ENDPOINT_GATHER)?,
                    &GatherContribution { epoch, handle },
                )
                .await?;
        }

        loop {
            let handles = if self.is_coordinator() {
                self.coordinator.gathered(epoch)
            } else {
                let status: GatherStatus = self
                    .get_json(self.url(COORDINATOR, &format!("{}/{}", ENDPOINT_GATHER, epoch))?)
                    .await?;
                status.handles
            };

            if handles.len() >= rank_n {
                return Ok(handles);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
