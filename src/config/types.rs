use crate::assembly::DEFAULT_MAX_CHAIN_LENGTH;
use crate::cluster::types::Rank;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LOAD_FACTOR: f64 = 0.5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("k-mer file {0} does not exist")]
    MissingKmerFile(PathBuf),

    #[error("load factor must be in (0, 1], got {0}")]
    InvalidLoadFactor(f64),

    #[error("maximum chain length must be at least 1")]
    InvalidMaxChainLength,

    #[error("k-mer length must be at least 1")]
    InvalidKmerLength,

    #[error("k-mer file holds {actual}-mers but {expected}-mers were requested")]
    KmerLengthMismatch { expected: usize, actual: usize },

    #[error("test output prefix must not be empty")]
    EmptyTestPrefix,

    #[error("a run needs at least one rank")]
    NoRanks,

    #[error("rank {rank} is outside the peer list of {peers} addresses")]
    RankOutOfRange { rank: Rank, peers: usize },

    #[error("peer address {0} is listed twice")]
    DuplicatePeer(SocketAddr),
}

/// What a rank does with its contigs once assembly is done.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Log timings and a summary.
    #[default]
    Report,
    /// Write `<prefix>_<rank>.dat`, one contig per line, and skip the report.
    Test { prefix: PathBuf },
}

impl OutputMode {
    /// Output file of `rank` in test mode.
    pub fn output_path(&self, rank: Rank) -> Option<PathBuf> {
        match self {
            OutputMode::Report => None,
            OutputMode::Test { prefix } => {
                let mut name = prefix.as_os_str().to_owned();
                name.push(format!("_{}.dat", rank));
                Some(PathBuf::from(name))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Every rank runs as a task in this process.
    Local { ranks: usize },
    /// This process is rank `rank`; `peers[r]` is the address of rank `r`.
    Http { rank: Rank, peers: Vec<SocketAddr> },
}

impl RunMode {
    pub fn rank_n(&self) -> usize {
        match self {
            RunMode::Local { ranks } => *ranks,
            RunMode::Http { peers, .. } => peers.len(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            RunMode::Local { ranks } => {
                if *ranks == 0 {
                    return Err(ConfigError::NoRanks);
                }
            }
            RunMode::Http { rank, peers } => {
                if peers.is_empty() {
                    return Err(ConfigError::NoRanks);
                }
                if rank.index() >= peers.len() {
                    return Err(ConfigError::RankOutOfRange {
                        rank: *rank,
                        peers: peers.len(),
                    });
                }
                for (idx, peer) in peers.iter().enumerate() {
                    if peers[..idx].contains(peer) {
                        return Err(ConfigError::DuplicatePeer(*peer));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Settings shared by every rank of one assembly run.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyConfig {
    pub kmer_file: PathBuf,
    /// Expected k-mer length. Inferred from the file when absent.
    pub kmer_len: Option<usize>,
    pub load_factor: f64,
    pub max_chain_length: usize,
    pub output: OutputMode,
}

impl AssemblyConfig {
    pub fn new(kmer_file: impl Into<PathBuf>) -> Self {
        Self {
            kmer_file: kmer_file.into(),
            kmer_len: None,
            load_factor: DEFAULT_LOAD_FACTOR,
            max_chain_length: DEFAULT_MAX_CHAIN_LENGTH,
            output: OutputMode::Report,
        }
    }

    pub fn with_kmer_len(mut self, kmer_len: usize) -> Self {
        self.kmer_len = Some(kmer_len);
        self
    }

    pub fn with_load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn with_max_chain_length(mut self, max_chain_length: usize) -> Self {
        self.max_chain_length = max_chain_length;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn kmer_file(&self) -> &Path {
        &self.kmer_file
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.kmer_file.is_file() {
            return Err(ConfigError::MissingKmerFile(self.kmer_file.clone()));
        }
        // Also rejects NaN.
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(ConfigError::InvalidLoadFactor(self.load_factor));
        }
        if self.max_chain_length == 0 {
            return Err(ConfigError::InvalidMaxChainLength);
        }
        if self.kmer_len == Some(0) {
            return Err(ConfigError::InvalidKmerLength);
        }
        if let OutputMode::Test { prefix } = &self.output
            && prefix.as_os_str().is_empty()
        {
            return Err(ConfigError::EmptyTestPrefix);
        }
        Ok(())
    }

    /// Checks the length found in the file against the requested one.
    pub fn resolve_kmer_len(&self, found: usize) -> Result<usize, ConfigError> {
        match self.kmer_len {
            Some(expected) if expected != found => Err(ConfigError::KmerLengthMismatch {
                expected,
                actual: found,
            }),
            _ => Ok(found),
        }
    }

    /// Table size for `n_records` records: `max(1, ceil(n_records / load_factor))`.
    pub fn global_size(&self, n_records: usize) -> u64 {
        let size = (n_records as f64 / self.load_factor).ceil() as u64;
        size.max(1)
    }
}
