//! Forward-mode dual-number evaluator (component C).
//!
//! A [`Dual`] pairs a value with its derivative with respect to a single
//! seeded direction. [`eval_dual`] walks a [`sever_expr::Expr`] directly —
//! no graph is built — which makes it cheap for the small gradient-
//! correctness checks it is meant for (§4.C); it is not used in any
//! sampler's hot loop.

use std::collections::HashMap;

use sever_core::errors::ErrorInfo;
use sever_core::SeverError;
use sever_expr::{Expr, Lit, OperatorKind};

/// A value paired with its derivative along one seeded direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual {
    /// The underlying value.
    pub value: f64,
    /// The derivative of `value` with respect to the seeded variable.
    pub deriv: f64,
}

impl Dual {
    /// Constructs a constant dual number (zero derivative).
    pub fn constant(value: f64) -> Self {
        Self { value, deriv: 0.0 }
    }

    /// Constructs a seeded dual number with the given derivative.
    pub fn seeded(value: f64, deriv: f64) -> Self {
        Self { value, deriv }
    }

    /// Dual-number addition.
    pub fn add(self, other: Self) -> Self {
        Self {
            value: self.value + other.value,
            deriv: self.deriv + other.deriv,
        }
    }

    /// Dual-number subtraction.
    pub fn sub(self, other: Self) -> Self {
        Self {
            value: self.value - other.value,
            deriv: self.deriv - other.deriv,
        }
    }

    /// Dual-number multiplication (product rule).
    pub fn mul(self, other: Self) -> Self {
        Self {
            value: self.value * other.value,
            deriv: self.deriv * other.value + self.value * other.deriv,
        }
    }

    /// Dual-number division (quotient rule).
    pub fn div(self, other: Self) -> Self {
        Self {
            value: self.value / other.value,
            deriv: (self.deriv * other.value - self.value * other.deriv)
                / (other.value * other.value),
        }
    }

    /// Dual-number negation.
    pub fn neg(self) -> Self {
        Self {
            value: -self.value,
            deriv: -self.deriv,
        }
    }
}

/// Evaluates an expression tree in forward (dual-number) mode.
///
/// `env` maps each in-scope variable name to `(value, seed)`, where `seed`
/// is `1.0` for the variable being differentiated and `0.0` for every
/// other variable held fixed. Supports literals, variables, and
/// `add`/`sub`/`mul`/`div`; unary negation is expressed as a one-argument
/// [`OperatorKind::Sub`] node. Any other node kind fails cleanly with
/// [`SeverError::InvalidOperation`].
pub fn eval_dual(expr: &Expr, env: &HashMap<String, (f64, f64)>) -> Result<Dual, SeverError> {
    match expr {
        Expr::Literal(Lit::Int(v)) => Ok(Dual::constant(*v as f64)),
        Expr::Literal(Lit::Float(v)) => Ok(Dual::constant(*v)),
        Expr::Literal(Lit::Bool(v)) => Ok(Dual::constant(if *v { 1.0 } else { 0.0 })),
        Expr::Literal(Lit::Null) | Expr::Literal(Lit::Str(_)) => Err(unsupported("literal")),
        Expr::Variable(name) => {
            let (value, seed) = env.get(name).copied().ok_or_else(|| {
                SeverError::InvalidVariable(
                    ErrorInfo::new("AD010", format!("unknown variable '{name}'"))
                        .with_context("name", name),
                )
            })?;
            Ok(Dual::seeded(value, seed))
        }
        Expr::Operator { kind, args } => eval_operator(*kind, args, env),
        _ => Err(unsupported("expression variant")),
    }
}

fn eval_operator(
    kind: OperatorKind,
    args: &[Expr],
    env: &HashMap<String, (f64, f64)>,
) -> Result<Dual, SeverError> {
    match (kind, args) {
        (OperatorKind::Add, [a, b]) => Ok(eval_dual(a, env)?.add(eval_dual(b, env)?)),
        (OperatorKind::Sub, [a, b]) => Ok(eval_dual(a, env)?.sub(eval_dual(b, env)?)),
        (OperatorKind::Mul, [a, b]) => Ok(eval_dual(a, env)?.mul(eval_dual(b, env)?)),
        (OperatorKind::Div, [a, b]) => Ok(eval_dual(a, env)?.div(eval_dual(b, env)?)),
        (OperatorKind::Sub, [a]) => Ok(eval_dual(a, env)?.neg()),
        _ => Err(unsupported("operator")),
    }
}

fn unsupported(what: &str) -> SeverError {
    SeverError::InvalidOperation(
        ErrorInfo::new("AD011", format!("dual evaluator cannot handle this {what}"))
            .with_hint("the forward-mode evaluator supports literals, variables, and add/sub/mul/div only"),
    )
}
