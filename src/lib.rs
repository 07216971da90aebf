//! Distributed K-mer Assembly Library
//!
//! This library crate defines the core modules of the distributed de Bruijn graph
//! assembler. It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`kmer`**: The key/value codec. Packed k-mers, the records stored per k-mer, and
//!   the reader that splits an input file into per-rank blocks.
//! - **`cluster`**: Rank identity and the transports that carry requests between ranks,
//!   either as tasks inside one process or as processes talking HTTP.
//! - **`storage`**: The distributed open-addressing hash table. Each rank owns one shard
//!   of the global slot space and serves requests against it.
//! - **`assembly`**: Walks successor links through the table to build contigs.
//! - **`config`**: Validated run settings.
//! - **`pipeline`**: The per-rank driver running a whole assembly.

pub mod assembly;
pub mod cluster;
pub mod config;
pub mod kmer;
pub mod pipeline;
pub mod storage;
