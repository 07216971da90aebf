use axum::{body::Bytes, extract::Extension, http::StatusCode};
use std::sync::{Arc, RwLock};

use super::protocol::{ShardEnvelope, ShardReply, ShardRequest, ShardResponse};
use super::shard::LocalShard;
use super::types::ShardError;
use crate::cluster::types::ShardHandle;

/// The receiving side of the shard protocol: a shard plus the handle minted for it.
pub struct ShardService {
    handle: ShardHandle,
    shard: LocalShard,
}

impl ShardService {
    pub fn new(handle: ShardHandle, shard: LocalShard) -> Self {
        Self { handle, shard }
    }

    pub fn handle(&self) -> &ShardHandle {
        &self.handle
    }

    pub fn shard(&self) -> &LocalShard {
        &self.shard
    }

    /// Runs one request against the local shard on behalf of any rank.
    pub fn dispatch(&self, envelope: ShardEnvelope) -> ShardResponse {
        if envelope.handle != self.handle {
            return Err(ShardError::StaleHandle(envelope.handle.rank));
        }

        let op = envelope.request.name();
        let reply = match envelope.request {
            ShardRequest::ClaimSlot { offset } => ShardReply::Claimed(self.shard.claim(offset)?),
            ShardRequest::WriteRecord { offset, record } => {
                self.shard.write(offset, record)?;
                ShardReply::Written
            }
            ShardRequest::ReadFlag { offset } => ShardReply::Flag(self.shard.is_used(offset)?),
            ShardRequest::ReadRecord { offset } => ShardReply::Record(self.shard.read(offset)?),
        };

        tracing::trace!("Dispatched {} -> {:?}", op, reply);
        Ok(reply)
    }
}

/// The service currently attached to an HTTP rank, if its table has been built.
pub type AttachedService = RwLock<Option<Arc<ShardService>>>;

pub async fn handle_shard_op(
    Extension(attached): Extension<Arc<AttachedService>>,
    body: Bytes,
) -> (StatusCode, Vec<u8>) {
    let service = match attached.read() {
        Ok(guard) => guard.clone(),
        Err(_) => {
            tracing::error!("Shard service lock poisoned");
            return (StatusCode::INTERNAL_SERVER_ERROR, Vec::new());
        }
    };
    let Some(service) = service else {
        tracing::warn!("Shard request arrived before the shard was attached");
        return (StatusCode::SERVICE_UNAVAILABLE, Vec::new());
    };

    let envelope: ShardEnvelope = match bincode::deserialize(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!("Failed to decode shard envelope: {}", e);
            return (StatusCode::BAD_REQUEST, Vec::new());
        }
    };

    let response = service.dispatch(envelope);
    match bincode::serialize(&response) {
        Ok(bytes) => (StatusCode::OK, bytes),
        Err(e) => {
            tracing::error!("Failed to encode shard response: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
        }
    }
}
