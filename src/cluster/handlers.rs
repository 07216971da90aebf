use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
};
use dashmap::DashMap;
use std::sync::Arc;

use super::protocol::{BarrierArrival, BarrierStatus, GatherContribution, GatherStatus};
use super::types::{Rank, ShardHandle};

/// Arrival ledgers kept by the coordinating rank, keyed by epoch.
#[derive(Default)]
pub struct CoordinatorState {
    barriers: DashMap<u64, Vec<Rank>>,
    gathers: DashMap<u64, Vec<ShardHandle>>,
}

impl CoordinatorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `rank` at barrier `epoch`; repeated arrivals count once.
    pub fn arrive(&self, epoch: u64, rank: Rank) -> usize {
        let mut arrived = self.barriers.entry(epoch).or_default();
        if !arrived.contains(&rank) {
            arrived.push(rank);
        }
        arrived.len()
    }

    pub fn arrived(&self, epoch: u64) -> usize {
        self.barriers
            .get(&epoch)
            .map(|arrived| arrived.len())
            .unwrap_or(0)
    }

    /// Records `handle` for gather `epoch`; a later contribution from the same rank
    /// replaces the earlier one.
    pub fn contribute(&self, epoch: u64, handle: ShardHandle) -> usize {
        let mut handles = self.gathers.entry(epoch).or_default();
        handles.retain(|existing| existing.rank != handle.rank);
        handles.push(handle);
        handles.len()
    }

    pub fn gathered(&self, epoch: u64) -> Vec<ShardHandle> {
        self.gathers
            .get(&epoch)
            .map(|handles| handles.clone())
            .unwrap_or_default()
    }
}

pub async fn handle_barrier_arrive(
    Extension(state): Extension<Arc<CoordinatorState>>,
    Json(req): Json<BarrierArrival>,
) -> (StatusCode, Json<BarrierStatus>) {
    let arrived = state.arrive(req.epoch, req.rank);
    tracing::debug!(
        "Barrier {}: rank {} arrived ({} so far)",
        req.epoch,
        req.rank,
        arrived
    );
    (
        StatusCode::OK,
        Json(BarrierStatus {
            epoch: req.epoch,
            arrived,
        }),
    )
}

pub async fn handle_barrier_status(
    Extension(state): Extension<Arc<CoordinatorState>>,
    Path(epoch): Path<u64>,
) -> (StatusCode, Json<BarrierStatus>) {
    (
        StatusCode::OK,
        Json(BarrierStatus {
            epoch,
            arrived: state.arrived(epoch),
        }),
    )
}

pub async fn handle_gather_contribute(
    Extension(state): Extension<Arc<CoordinatorState>>,
    Json(req): Json<GatherContribution>,
) -> (StatusCode, Json<GatherStatus>) {
    let rank = req.handle.rank;
    let count = state.contribute(req.epoch, req.handle);
    tracing::debug!(
        "Gather {}: rank {} contributed ({} so far)",
        req.epoch,
        rank,
        count
    );
    (
        StatusCode::OK,
        Json(GatherStatus {
            epoch: req.epoch,
            handles: state.gathered(req.epoch),
        }),
    )
}

pub async fn handle_gather_status(
    Extension(state): Extension<Arc<CoordinatorState>>,
    Path(epoch): Path<u64>,
) -> (StatusCode, Json<GatherStatus>) {
    (
        StatusCode::OK,
        Json(GatherStatus {
            epoch,
            handles: state.gathered(epoch),
        }),
    )
}
