//! Lowers [`sever_expr::Expr`] trees into [`Graph`] nodes.
//!
//! This is the glue the spec's component A describes as consumed by B: a
//! model's log-density expression, written as an `Expr`, is walked once
//! and turned into graph primitives so `backward` can differentiate it.
//! `Sample`/`Observe` nodes are explicitly not scored here (§9) — scoring
//! them is the caller-supplied log-density function's job.

use std::collections::HashMap;

use sever_core::errors::ErrorInfo;
use sever_core::SeverError;
use sever_expr::{Expr, Lit, OperatorKind};

use crate::graph::{Graph, NodeId};

/// Lowers `expr` into `graph`, returning the id of the resulting node.
///
/// `env` maps variable names already registered in `graph` (via
/// [`Graph::variable`]) so repeated lowering calls against the same
/// parameter set reuse node identity rather than re-declaring variables.
pub fn eval_expr(
    graph: &mut Graph,
    expr: &Expr,
    env: &HashMap<String, f64>,
) -> Result<NodeId, SeverError> {
    match expr {
        Expr::Literal(Lit::Int(v)) => Ok(graph.constant(*v as f64)),
        Expr::Literal(Lit::Float(v)) => Ok(graph.constant(*v)),
        Expr::Literal(Lit::Bool(v)) => Ok(graph.constant(if *v { 1.0 } else { 0.0 })),
        Expr::Literal(Lit::Null) | Expr::Literal(Lit::Str(_)) => Err(unsupported("literal")),
        Expr::Variable(name) => {
            let value = env.get(name).copied().ok_or_else(|| {
                SeverError::InvalidVariable(
                    ErrorInfo::new("AD020", format!("unknown variable '{name}'"))
                        .with_context("name", name),
                )
            })?;
            Ok(graph.variable(name.clone(), value))
        }
        Expr::Operator { kind, args } => lower_operator(graph, *kind, args, env),
        Expr::Call { name, args } => lower_call(graph, name, args, env),
        _ => Err(unsupported("expression variant")),
    }
}

fn lower_operator(
    graph: &mut Graph,
    kind: OperatorKind,
    args: &[Expr],
    env: &HashMap<String, f64>,
) -> Result<NodeId, SeverError> {
    let nodes = args
        .iter()
        .map(|a| eval_expr(graph, a, env))
        .collect::<Result<Vec<_>, _>>()?;
    match (kind, nodes.as_slice()) {
        (OperatorKind::Add, [a, b]) => Ok(graph.add(*a, *b)),
        (OperatorKind::Sub, [a, b]) => Ok(graph.sub(*a, *b)),
        (OperatorKind::Sub, [a]) => Ok(graph.neg(*a)),
        (OperatorKind::Mul, [a, b]) => Ok(graph.mul(*a, *b)),
        (OperatorKind::Div, [a, b]) => Ok(graph.div(*a, *b)),
        _ => Err(unsupported("operator")),
    }
}

fn lower_call(
    graph: &mut Graph,
    name: &str,
    args: &[Expr],
    env: &HashMap<String, f64>,
) -> Result<NodeId, SeverError> {
    let nodes = args
        .iter()
        .map(|a| eval_expr(graph, a, env))
        .collect::<Result<Vec<_>, _>>()?;
    match (name, nodes.as_slice()) {
        ("log", [a]) => Ok(graph.log(*a)),
        ("exp", [a]) => Ok(graph.exp(*a)),
        ("sin", [a]) => Ok(graph.sin(*a)),
        ("cos", [a]) => Ok(graph.cos(*a)),
        ("sqrt", [a]) => Ok(graph.sqrt(*a)),
        ("normal_lp", [x, mu, sigma]) => Ok(graph.normal_log_prob(*x, *mu, *sigma)),
        ("gamma_lp", [x, alpha, beta]) => Ok(graph.gamma_log_prob(*x, *alpha, *beta)),
        _ => Err(unsupported("call")),
    }
}

fn unsupported(what: &str) -> SeverError {
    SeverError::InvalidOperation(
        ErrorInfo::new("AD021", format!("autodiff lowering cannot handle this {what}"))
            .with_hint("observe/sample nodes are scored by the caller's log-density function, not by lowering"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowers_polynomial_and_differentiates() {
        let mut env = HashMap::new();
        env.insert("x".to_string(), 2.0);
        env.insert("y".to_string(), 3.0);
        // x^2 * y + x * y^2, expressed with only add/mul.
        let expr = Expr::binary(
            OperatorKind::Add,
            Expr::binary(
                OperatorKind::Mul,
                Expr::binary(OperatorKind::Mul, Expr::var("x"), Expr::var("x")),
                Expr::var("y"),
            ),
            Expr::binary(
                OperatorKind::Mul,
                Expr::var("x"),
                Expr::binary(OperatorKind::Mul, Expr::var("y"), Expr::var("y")),
            ),
        );
        let mut graph = Graph::new();
        let root = eval_expr(&mut graph, &expr, &env).unwrap();
        graph.backward(root);
        assert!((graph.value(root) - 30.0).abs() < 1e-9);
        assert!((graph.grad_of("x").unwrap() - 21.0).abs() < 1e-9);
        assert!((graph.grad_of("y").unwrap() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn lowers_normal_log_prob_call() {
        let mut env = HashMap::new();
        env.insert("x".to_string(), 1.0);
        env.insert("mu".to_string(), 0.0);
        env.insert("sigma".to_string(), 1.0);
        let expr = Expr::Call {
            name: "normal_lp".to_string(),
            args: vec![Expr::var("x"), Expr::var("mu"), Expr::var("sigma")],
        };
        let mut graph = Graph::new();
        let root = eval_expr(&mut graph, &expr, &env).unwrap();
        graph.backward(root);
        assert!((graph.value(root) - (-1.4189385)).abs() < 1e-6);
    }

    #[test]
    fn unknown_call_is_invalid_operation() {
        let env = HashMap::new();
        let expr = Expr::Call {
            name: "frobnicate".to_string(),
            args: vec![],
        };
        let mut graph = Graph::new();
        let err = eval_expr(&mut graph, &expr, &env).unwrap_err();
        assert!(matches!(err, SeverError::InvalidOperation(_)));
    }
}
