//! K-mer Codec Module
//!
//! Defines the keys and values stored in the distributed table and the reader that
//! turns a k-mer file into records.
//!
//! ## Core Concepts
//! - **Kmer**: A fixed-width nucleotide string packed 2 bits per base. Its hash is a
//!   deterministic function of the bases, so every rank places a key in the same slot.
//! - **KmerPair**: The stored record. Holds the k-mer plus the single base preceding it
//!   and the single base following it in the source sequence, or a `Fence` marking a
//!   contig boundary.
//! - **Reader**: Splits the input file into contiguous per-rank blocks of records.

pub mod reader;
pub mod types;

pub use reader::{kmer_size, line_count, read_kmers};
pub use types::{Extension, Kmer, KmerPair, Nucleotide, ParseError};

#[cfg(test)]
mod tests;
