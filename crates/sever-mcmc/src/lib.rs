#![deny(missing_docs)]
//! Metropolis-Hastings / adaptive-Metropolis MCMC sampler for Sever.

/// Per-parameter bound enforcement.
pub mod bounds;
/// Sampler configuration schema.
pub mod config;
/// Deterministic per-chain seed derivation.
pub mod determinism;
/// The sampling kernel itself.
pub mod kernel;
/// Per-parameter trace and derived statistics.
pub mod trace;

pub use bounds::ParameterBounds;
pub use config::{MhConfig, MhMethod};
pub use determinism::chain_seed;
pub use kernel::{run_chains, MhSampler};
pub use trace::{ParameterStats, ParameterTrace, TraceEntry};
