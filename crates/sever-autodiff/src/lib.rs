#![deny(missing_docs)]
//! Reverse-mode autodiff graph and forward-mode dual evaluator for Sever.
//!
//! [`graph::Graph`] is the reverse-mode computation graph driving the HMC
//! sampler's gradients and backing the autodiff-based variational-gradient
//! path. [`dual::Dual`] is a standalone forward-mode evaluator used for
//! small-scale derivative checks, not in any sampler's hot loop.
//! [`lower::eval_expr`] connects the two to the shared `sever_expr::Expr`
//! model.

/// Forward-mode dual-number evaluator (component C).
pub mod dual;
/// Reverse-mode autodiff computation graph (component B).
pub mod graph;
/// Log-gamma helper used by the gamma log-density primitive.
pub mod loggamma;
/// Lowers expression trees into graph primitives.
pub mod lower;

pub use dual::{eval_dual, Dual};
pub use graph::{gamma_lp_value, normal_lp_value, Graph, Node, NodeId, Op};
pub use loggamma::log_gamma;
pub use lower::eval_expr;
