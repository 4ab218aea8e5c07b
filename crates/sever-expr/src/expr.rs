use serde::{Deserialize, Serialize};

/// A literal value embedded directly in an expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lit {
    /// A signed integer literal.
    Int(i64),
    /// A floating point literal.
    Float(f64),
    /// A boolean literal.
    Bool(bool),
    /// A string literal.
    Str(String),
    /// The null literal.
    Null,
}

/// Operator kinds available inside [`Expr::Operator`].
///
/// The set mirrors a conventional expression grammar: arithmetic,
/// comparison, boolean, and bitwise operators all share one tagged enum
/// rather than one variant per operator family, matching how move kinds are
/// enumerated elsewhere in this workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorKind {
    /// Arithmetic addition.
    Add,
    /// Arithmetic subtraction.
    Sub,
    /// Arithmetic multiplication.
    Mul,
    /// Arithmetic division.
    Div,
    /// Arithmetic remainder.
    Mod,
    /// Equality comparison.
    Eq,
    /// Inequality comparison.
    Ne,
    /// Less-than comparison.
    Lt,
    /// Less-than-or-equal comparison.
    Le,
    /// Greater-than comparison.
    Gt,
    /// Greater-than-or-equal comparison.
    Ge,
    /// Logical conjunction.
    And,
    /// Logical disjunction.
    Or,
    /// Logical negation (unary).
    Not,
    /// Bitwise AND.
    BitAnd,
    /// Bitwise OR.
    BitOr,
    /// Bitwise XOR.
    BitXor,
    /// Left shift.
    Shl,
    /// Right shift.
    Shr,
    /// Bitwise complement (unary).
    BitNot,
}

impl OperatorKind {
    /// Returns whether this operator takes exactly one argument.
    pub fn is_unary(&self) -> bool {
        matches!(self, OperatorKind::Not | OperatorKind::BitNot)
    }

    /// Returns a short machine-readable name for the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::Add => "add",
            OperatorKind::Sub => "sub",
            OperatorKind::Mul => "mul",
            OperatorKind::Div => "div",
            OperatorKind::Mod => "mod",
            OperatorKind::Eq => "eq",
            OperatorKind::Ne => "ne",
            OperatorKind::Lt => "lt",
            OperatorKind::Le => "le",
            OperatorKind::Gt => "gt",
            OperatorKind::Ge => "ge",
            OperatorKind::And => "and",
            OperatorKind::Or => "or",
            OperatorKind::Not => "not",
            OperatorKind::BitAnd => "bitand",
            OperatorKind::BitOr => "bitor",
            OperatorKind::BitXor => "bitxor",
            OperatorKind::Shl => "shl",
            OperatorKind::Shr => "shr",
            OperatorKind::BitNot => "bitnot",
        }
    }
}

/// Target type of a [`Expr::Cast`] expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastKind {
    /// Cast to a signed integer.
    Int,
    /// Cast to a floating point value.
    Float,
    /// Cast to a boolean.
    Bool,
    /// Cast to a string.
    Str,
}

/// A node in a Sever model expression tree.
///
/// `Expr` values are immutable once constructed; every lowering consumer
/// (autodiff, the dual evaluator, the graphical-model builder) only ever
/// reads a tree, it never mutates one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A literal value.
    Literal(Lit),
    /// A reference to a named variable in scope.
    Variable(String),
    /// An operator application over one or more operands.
    Operator {
        /// The operator being applied.
        kind: OperatorKind,
        /// Operands, in left-to-right order.
        args: Vec<Expr>,
    },
    /// A call to a named built-in or user function.
    Call {
        /// Name of the function being called.
        name: String,
        /// Arguments passed to the function, in order.
        args: Vec<Expr>,
    },
    /// Indexing into an array-valued expression.
    Index {
        /// Expression producing the array being indexed.
        base: Box<Expr>,
        /// Expression producing the index.
        index: Box<Expr>,
    },
    /// Field access on a struct-valued expression.
    Field {
        /// Expression producing the struct being accessed.
        base: Box<Expr>,
        /// Name of the field being accessed.
        name: String,
    },
    /// A literal array of expressions.
    Array(Vec<Expr>),
    /// A type cast of a sub-expression.
    Cast {
        /// Expression being cast.
        value: Box<Expr>,
        /// Target type of the cast.
        target: CastKind,
    },
    /// A random-variable declaration drawing from a named distribution.
    Sample {
        /// Name of the distribution to draw from.
        distribution: String,
        /// Arguments supplied to the distribution's parameters, in order.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Convenience constructor for an integer literal.
    pub fn int(value: i64) -> Self {
        Expr::Literal(Lit::Int(value))
    }

    /// Convenience constructor for a floating point literal.
    pub fn float(value: f64) -> Self {
        Expr::Literal(Lit::Float(value))
    }

    /// Convenience constructor for a variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    /// Convenience constructor for a binary operator application.
    pub fn binary(kind: OperatorKind, lhs: Expr, rhs: Expr) -> Self {
        Expr::Operator {
            kind,
            args: vec![lhs, rhs],
        }
    }

    /// Convenience constructor for a unary operator application.
    pub fn unary(kind: OperatorKind, operand: Expr) -> Self {
        Expr::Operator {
            kind,
            args: vec![operand],
        }
    }

    /// Returns the direct children of this node, for generic tree walks.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Variable(_) => Vec::new(),
            Expr::Operator { args, .. } | Expr::Call { args, .. } | Expr::Array(args) => {
                args.iter().collect()
            }
            Expr::Index { base, index } => vec![base.as_ref(), index.as_ref()],
            Expr::Field { base, .. } => vec![base.as_ref()],
            Expr::Cast { value, .. } => vec![value.as_ref()],
            Expr::Sample { args, .. } => args.iter().collect(),
        }
    }
}
