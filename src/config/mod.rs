//! Run Configuration Module
//!
//! Collects everything a rank needs to know before it joins the cluster, and rejects
//! inconsistent settings before any rank starts.
//!
//! ## Core Concepts
//! - **AssemblyConfig**: Input file, expected k-mer length, table load factor, chain
//!   length guard and output mode. Identical on every rank of a run.
//! - **RunMode**: Either all ranks in this process (`Local`) or one rank of a
//!   multi-process cluster reached over HTTP (`Http`).

pub mod types;

pub use types::{AssemblyConfig, ConfigError, DEFAULT_LOAD_FACTOR, OutputMode, RunMode};
