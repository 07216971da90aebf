//! Contig Assembly Module
//!
//! Walks the de Bruijn graph implied by the table: starting from every record with a
//! backward fence, repeatedly look up the successor k-mer until a forward fence is
//! reached. Two guards keep the walk bounded on malformed graphs:
//! - **Length**: a contig stops growing at `max_chain_length` records.
//! - **Cycle**: a contig stops before revisiting a k-mer it already contains.
//!
//! Both guards mark the contig as truncated; neither is an error. A successor missing
//! from the table is an error, as the graph no longer matches the data.

pub mod assembler;
pub mod types;

pub use assembler::{Assembler, DEFAULT_MAX_CHAIN_LENGTH};
pub use types::{AssemblyError, ChainState, Contig};
