#![deny(missing_docs)]
//! Expression tree types for Sever model declarations.
//!
//! An [`Expr`] is the surface the rest of the engine operates on: autodiff
//! lowers it into a computation graph, the forward-mode dual evaluator walks
//! it directly, and graphical-model builders assemble it from `observe`/
//! `latent` declarations. This crate owns only the tree itself — no
//! evaluator lives here.

mod expr;

pub use expr::{CastKind, Expr, Lit, OperatorKind};
