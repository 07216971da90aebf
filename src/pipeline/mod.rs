//! Assembly Pipeline Module
//!
//! The per-rank driver that ties the codec, the distributed table and the assembler
//! together. Every rank of a run executes `run_rank` with the same configuration.
//!
//! ## Core Concepts
//! - **Phases**: Sizing, table construction, reading the rank's block, bulk insert,
//!   start collection, assembly and output. Collective barriers separate the phases
//!   so that no rank reads the table before every insert has landed.
//! - **RankReport**: Counters and timings of one rank, returned to the caller and
//!   logged unless the run writes test output.

pub mod driver;
pub mod types;

pub use driver::run_rank;
pub use types::RankReport;

#[cfg(test)]
mod tests;
