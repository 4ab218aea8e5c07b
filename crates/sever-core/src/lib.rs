#![deny(missing_docs)]
#![doc = "Shared error types and deterministic RNG handling used across every Sever inference crate."]

/// Structured error type shared across Sever crates.
pub mod errors;
/// Deterministic RNG wrapper and substream seed derivation.
pub mod rng;

pub use errors::{ErrorInfo, SeverError};
pub use rng::{derive_substream_seed, RngHandle};
