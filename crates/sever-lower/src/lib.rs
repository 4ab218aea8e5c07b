#![deny(missing_docs)]
//! Graphical/mixture model builder for Sever (§4.I).
//!
//! [`ModelBuilder`] accumulates named random-variable declarations and
//! normalizes them, via [`ModelBuilder::build`], into a [`LoweredModel`]
//! that exposes a plain log-density callable (for `sever-mcmc`/`sever-vi`)
//! and, where every declared distribution has a known autodiff composite,
//! a gradient callable (for `sever-hmc`).

/// The accumulate-then-normalize model builder.
pub mod builder;

pub use builder::{LoweredModel, ModelBuilder};
