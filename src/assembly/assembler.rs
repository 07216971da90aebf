use super::types::{AssemblyError, ChainState, Contig};
use crate::cluster::transport::Transport;
use crate::kmer::{Kmer, KmerPair};
use crate::storage::memory::DistributedHashMap;

use std::collections::HashSet;

pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 1000;

/// Builds contigs by following successor links through a populated table.
///
/// The table must be fully populated and visible on every rank, i.e. all ranks have
/// crossed the barrier that ends the insert phase.
pub struct Assembler<'a, T> {
    table: &'a DistributedHashMap<T>,
    max_chain_length: usize,
}

impl<'a, T: Transport> Assembler<'a, T> {
    pub fn new(table: &'a DistributedHashMap<T>, max_chain_length: usize) -> Self {
        Self {
            table,
            max_chain_length: max_chain_length.max(1),
        }
    }

    pub fn max_chain_length(&self) -> usize {
        self.max_chain_length
    }

    /// Assembles one contig per start record, in order.
    pub async fn assemble(&self, starts: &[KmerPair]) -> Result<Vec<Contig>, AssemblyError> {
        let mut contigs = Vec::with_capacity(starts.len());
        for start in starts {
            contigs.push(self.extend(start.clone()).await?);
        }
        Ok(contigs)
    }

    /// Grows a single contig from `start` until it completes or a guard fires.
    pub async fn extend(&self, start: KmerPair) -> Result<Contig, AssemblyError> {
        let mut visited: HashSet<Kmer> = HashSet::from([start.kmer.clone()]);
        let mut contig = Contig::new(start);

        while !contig.state().is_terminal() {
            let Some(next) = contig.last().next_kmer() else {
                contig.finish(ChainState::Complete);
                break;
            };

            if contig.len() >= self.max_chain_length {
                tracing::warn!(
                    "Maximum chain length ({}) reached for contig starting with {}",
                    self.max_chain_length,
                    contig.first().kmer
                );
                contig.finish(ChainState::TruncatedLength);
                break;
            }

            if visited.contains(&next) {
                tracing::warn!(
                    "Cycle detected at {} for contig starting with {}",
                    next,
                    contig.first().kmer
                );
                contig.finish(ChainState::TruncatedCycle);
                break;
            }

            let Some(record) = self.table.find(&next).await? else {
                return Err(AssemblyError::KeyNotFound {
                    start: contig.first().kmer.clone(),
                    missing: next,
                });
            };

            tracing::trace!("Extended contig {} with {}", contig.first().kmer, record.kmer);
            visited.insert(record.kmer.clone());
            contig.push(record);
        }

        Ok(contig)
    }
}
