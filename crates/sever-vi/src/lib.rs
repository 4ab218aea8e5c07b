#![deny(missing_docs)]
//! Mean-field coordinate-ascent variational inference solver for Sever.

/// Exact/score-function gradient path via `sever-autodiff` (§4.G, §9).
pub mod autodiff_gradient;
/// Solver configuration schema.
pub mod config;
/// Monte Carlo ELBO estimation.
pub mod elbo;
/// Variational families and per-variable distributions.
pub mod family;
/// The coordinate-ascent solver itself.
pub mod kernel;

pub use config::ViConfig;
pub use elbo::compute_elbo;
pub use family::{VarFamily, VariationalDist};
pub use kernel::{ConvergenceStats, GradientMode, ViSolver};
