use crate::kmer::{Kmer, KmerPair};
use crate::storage::types::TableError;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle of one contig. `Growing` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainState {
    Growing,
    /// Reached a record with a forward fence.
    Complete,
    /// Hit the maximum chain length.
    TruncatedLength,
    /// The next k-mer is already part of the contig.
    TruncatedCycle,
}

impl ChainState {
    pub fn is_terminal(self) -> bool {
        self != ChainState::Growing
    }

    pub fn is_truncated(self) -> bool {
        matches!(
            self,
            ChainState::TruncatedLength | ChainState::TruncatedCycle
        )
    }
}

/// An ordered chain of records, each the graph successor of the one before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Contig {
    records: Vec<KmerPair>,
    state: ChainState,
}

impl Contig {
    pub fn new(start: KmerPair) -> Self {
        Self {
            records: vec![start],
            state: ChainState::Growing,
        }
    }

    pub(crate) fn push(&mut self, record: KmerPair) {
        debug_assert_eq!(self.state, ChainState::Growing);
        self.records.push(record);
    }

    pub(crate) fn finish(&mut self, state: ChainState) {
        self.state = state;
    }

    pub fn records(&self) -> &[KmerPair] {
        &self.records
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> &KmerPair {
        &self.records[0]
    }

    pub fn last(&self) -> &KmerPair {
        &self.records[self.records.len() - 1]
    }

    /// The assembled sequence: the first k-mer followed by the last base of every
    /// following k-mer.
    pub fn sequence(&self) -> String {
        let mut sequence = self.first().kmer.to_string();
        for record in &self.records[1..] {
            if let Some(base) = record.kmer.get(record.kmer.len().saturating_sub(1)) {
                sequence.push(base.as_char());
            }
        }
        sequence
    }
}

impl fmt::Display for Contig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sequence())
    }
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A successor the graph promises is absent from the table.
    #[error("k-mer {missing} not found in the table while extending the contig starting at {start}")]
    KeyNotFound { start: Kmer, missing: Kmer },

    #[error(transparent)]
    Table(#[from] TableError),
}
