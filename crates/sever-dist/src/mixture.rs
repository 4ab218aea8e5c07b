//! Mixture construction: validates a weighted list of component distributions.

use sever_core::errors::ErrorInfo;
use sever_core::SeverError;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// One component of a [`Mixture`]: a registry distribution name paired
/// with its mixing weight.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureComponent {
    /// Name of the component distribution, looked up in a [`crate::Registry`].
    pub distribution_name: String,
    /// Mixing weight; must be strictly positive and sum to one across components.
    pub weight: f64,
}

impl MixtureComponent {
    /// Convenience constructor.
    pub fn new(distribution_name: impl Into<String>, weight: f64) -> Self {
        Self {
            distribution_name: distribution_name.into(),
            weight,
        }
    }
}

/// A validated mixture of named component distributions.
#[derive(Debug, Clone, PartialEq)]
pub struct Mixture {
    components: Vec<MixtureComponent>,
}

impl Mixture {
    /// Constructs a mixture, validating weights per §4.D:
    ///
    /// - `EmptyMixture` if `components` is empty.
    /// - `InvalidWeight` if any weight is non-positive.
    /// - `WeightsNotNormalized` if `|sum(weights) - 1| > 1e-6`.
    pub fn new(components: Vec<MixtureComponent>) -> Result<Self, SeverError> {
        if components.is_empty() {
            return Err(SeverError::EmptyMixture(ErrorInfo::new(
                "MX001",
                "mixture must have at least one component",
            )));
        }
        for component in &components {
            if component.weight <= 0.0 || !component.weight.is_finite() {
                return Err(SeverError::InvalidWeight(
                    ErrorInfo::new(
                        "MX002",
                        format!(
                            "component '{}' has non-positive weight {}",
                            component.distribution_name, component.weight
                        ),
                    )
                    .with_context("distribution", &component.distribution_name),
                ));
            }
        }
        let total: f64 = components.iter().map(|c| c.weight).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(SeverError::WeightsNotNormalized(
                ErrorInfo::new("MX003", format!("component weights sum to {total}, expected 1"))
                    .with_hint("rescale weights so they sum to 1 within 1e-6"),
            ));
        }
        Ok(Self { components })
    }

    /// The validated component list, in construction order.
    pub fn components(&self) -> &[MixtureComponent] {
        &self.components
    }
}
