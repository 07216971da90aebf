use crate::assembly::{ChainState, Contig};
use crate::cluster::types::Rank;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of one rank's run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankReport {
    pub rank: Rank,
    pub rank_n: usize,
    pub kmer_len: usize,
    pub global_size: u64,
    /// Records in this rank's block of the input file.
    pub records_read: usize,
    /// Slots in this rank's shard that ended up occupied.
    pub local_occupancy: usize,
    pub start_count: usize,
    pub contig_count: usize,
    /// Records across all contigs of this rank.
    pub contig_records: usize,
    pub truncated_length: usize,
    pub truncated_cycle: usize,
    pub insert_time: Duration,
    pub assembly_time: Duration,
    pub total_time: Duration,
    /// Set when the run wrote its contigs to a test output file.
    pub output_file: Option<PathBuf>,
}

impl RankReport {
    pub fn truncated(&self) -> usize {
        self.truncated_length + self.truncated_cycle
    }

    pub(crate) fn tally(&mut self, contigs: &[Contig]) {
        self.contig_count = contigs.len();
        self.contig_records = contigs.iter().map(Contig::len).sum();
        self.truncated_length = contigs
            .iter()
            .filter(|c| c.state() == ChainState::TruncatedLength)
            .count();
        self.truncated_cycle = contigs
            .iter()
            .filter(|c| c.state() == ChainState::TruncatedCycle)
            .count();
    }
}
