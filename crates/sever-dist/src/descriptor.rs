//! Distribution descriptors: the data shape a registry entry carries.

use serde::{Deserialize, Serialize};

/// Subset of the real line (or an integer/discrete analogue) on which a
/// density is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SupportKind {
    /// All of `(-inf, inf)`.
    RealLine,
    /// `(0, inf)`.
    PositiveReal,
    /// `[0, 1]`.
    UnitInterval,
    /// `{1, 2, 3, ...}`.
    PositiveInteger,
    /// `{0, 1, 2, ...}`.
    NonNegativeInteger,
    /// `[min, max]`, the bound's endpoints.
    BoundedInterval(f64, f64),
    /// A fixed, named finite set of values.
    DiscreteSet(Vec<f64>),
    /// The probability simplex in `usize` dimensions (number of categories).
    Simplex(usize),
    /// Positive-definite matrices of the given dimension.
    PositiveDefiniteMatrix(usize),
}

/// Constraint attached to one distribution parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ParamConstraint {
    /// Inclusive lower bound, if any.
    pub min: Option<f64>,
    /// Inclusive upper bound, if any.
    pub max: Option<f64>,
    /// Whether the value must be strictly positive.
    pub positive_only: bool,
    /// Whether the value must be an integer (fractional part exactly zero).
    pub integer_only: bool,
}

impl ParamConstraint {
    /// No constraint at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Shorthand for a strictly-positive real parameter.
    pub fn positive() -> Self {
        Self {
            positive_only: true,
            ..Self::default()
        }
    }

    /// Shorthand for a value bounded to `[min, max]`.
    pub fn bounded(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Self::default()
        }
    }

    /// Checks whether `value` satisfies this constraint.
    pub fn check(&self, value: f64) -> bool {
        if value.is_nan() || value.is_infinite() {
            return false;
        }
        if self.positive_only && value <= 0.0 {
            return false;
        }
        if self.integer_only && value.fract() != 0.0 {
            return false;
        }
        if let Some(min) = self.min {
            if value < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return false;
            }
        }
        true
    }
}

/// Numeric type a parameter's value is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericType {
    /// An integer-valued parameter (e.g. a trial count).
    Int,
    /// A floating-point parameter.
    Float,
}

/// One named, typed, optionally constrained parameter of a distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name, as referenced by callers.
    pub name: String,
    /// Numeric type the parameter's value is expected to hold.
    pub ty: NumericType,
    /// Constraint governing acceptable values.
    pub constraint: ParamConstraint,
}

impl ParamSpec {
    /// Convenience constructor. `ty` is inferred from the constraint:
    /// `integer_only` parameters are `NumericType::Int`, everything else
    /// is `NumericType::Float`.
    pub fn new(name: impl Into<String>, constraint: ParamConstraint) -> Self {
        let ty = if constraint.integer_only {
            NumericType::Int
        } else {
            NumericType::Float
        };
        Self {
            name: name.into(),
            ty,
            constraint,
        }
    }
}

/// A catalog entry describing one named probability distribution.
///
/// `log_prob` and `sample` are plain function pointers rather than trait
/// objects: every built-in and example distribution is a fixed, named
/// formula (§4.D), so there is no need for dynamic dispatch through a
/// trait boundary — just a descriptor plus a routine reference, matching
/// the "descriptor + lookup" shape of the pack's constraint-projector
/// types.
#[derive(Clone)]
pub struct Distribution {
    /// Name used for registry lookup.
    pub name: String,
    /// Ordered parameter list (order matches positional `args` callers use).
    pub params: Vec<ParamSpec>,
    /// Subset of the domain on which this distribution has support.
    pub support: SupportKind,
    /// Whether the distribution is defined over a discrete domain.
    pub discrete: bool,
    /// Whether this distribution belongs to the exponential family.
    pub exponential_family: bool,
    /// Whether this distribution is a location-scale family.
    pub location_scale: bool,
    /// Log-density routine: `(x, params) -> logp`.
    pub log_prob: fn(f64, &[f64]) -> f64,
    /// Optional sampling routine: `(rng, params) -> x`.
    pub sample: Option<fn(&mut dyn rand::RngCore, &[f64]) -> f64>,
    /// Optional mean/variance moment hook.
    pub moments: Option<fn(&[f64]) -> (f64, f64)>,
    /// Human-readable description.
    pub description: String,
}

impl std::fmt::Debug for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Distribution")
            .field("name", &self.name)
            .field("support", &self.support)
            .field("discrete", &self.discrete)
            .finish()
    }
}

impl Distribution {
    /// Validates a positional parameter list against this descriptor's
    /// constraints. Returns `false` on arity mismatch, constraint
    /// violation, or a non-finite value.
    pub fn validate(&self, params: &[f64]) -> bool {
        if params.len() != self.params.len() {
            return false;
        }
        params
            .iter()
            .zip(self.params.iter())
            .all(|(value, spec)| spec.constraint.check(*value))
    }
}
