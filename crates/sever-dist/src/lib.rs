#![deny(missing_docs)]
//! Distribution descriptors, built-in log-densities, and the registry that
//! looks them up by name for the Sever inference engine.

/// Distribution descriptor types: parameters, constraints, support kind.
pub mod descriptor;
/// Mixture-of-distributions validation.
pub mod mixture;
/// The two-layer (custom over built-in) distribution registry.
pub mod registry;

pub use descriptor::{Distribution, NumericType, ParamConstraint, ParamSpec, SupportKind};
pub use mixture::{Mixture, MixtureComponent};
pub use registry::Registry;
