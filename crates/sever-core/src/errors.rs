//! Structured error types shared across Sever crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`SeverError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (parameter names, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the Sever inference engine.
///
/// Numerical domain issues (log of a non-positive number, a rejected
/// proposal) are never represented here — they propagate as `-inf`/`NaN`
/// through ordinary `f64` values. This enum is reserved for structural
/// failures that a caller cannot recover from by simply rejecting a sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "detail")]
pub enum SeverError {
    /// A variable name was referenced that does not exist in the graph or solver.
    #[error("invalid variable: {0}")]
    InvalidVariable(ErrorInfo),
    /// An autodiff primitive received an expression variant it cannot evaluate.
    #[error("invalid operation: {0}")]
    InvalidOperation(ErrorInfo),
    /// The requested sampling method is declared but not implemented.
    #[error("not implemented: {0}")]
    NotImplemented(ErrorInfo),
    /// Fewer than two usable chains were supplied to a diagnostic.
    #[error("insufficient chains: {0}")]
    InsufficientChains(ErrorInfo),
    /// A chain did not have enough samples for the requested diagnostic.
    #[error("insufficient data: {0}")]
    InsufficientData(ErrorInfo),
    /// A graphical-model declaration referenced a missing parent or observation.
    #[error("invalid model: {0}")]
    InvalidModel(ErrorInfo),
    /// A mixture component was given a non-positive weight.
    #[error("invalid weight: {0}")]
    InvalidWeight(ErrorInfo),
    /// Mixture component weights did not sum to one within tolerance.
    #[error("weights not normalized: {0}")]
    WeightsNotNormalized(ErrorInfo),
    /// A mixture was constructed with zero components.
    #[error("empty mixture: {0}")]
    EmptyMixture(ErrorInfo),
    /// An allocation or resource limit was exceeded.
    #[error("out of memory: {0}")]
    OutOfMemory(ErrorInfo),
    /// An I/O operation (trace export, checkpoint read/write) failed.
    #[error("io error: {0}")]
    IoError(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SeverError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SeverError::InvalidVariable(info)
            | SeverError::InvalidOperation(info)
            | SeverError::NotImplemented(info)
            | SeverError::InsufficientChains(info)
            | SeverError::InsufficientData(info)
            | SeverError::InvalidModel(info)
            | SeverError::InvalidWeight(info)
            | SeverError::WeightsNotNormalized(info)
            | SeverError::EmptyMixture(info)
            | SeverError::OutOfMemory(info)
            | SeverError::IoError(info) => info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_round_trips_through_builder_methods() {
        let info = ErrorInfo::new("E001", "bad parameter")
            .with_context("name", "sigma")
            .with_hint("sigma must be positive");
        assert_eq!(info.code, "E001");
        assert_eq!(info.context.get("name").map(String::as_str), Some("sigma"));
        assert_eq!(info.hint.as_deref(), Some("sigma must be positive"));
    }

    #[test]
    fn each_variant_exposes_its_info() {
        let info = ErrorInfo::new("X001", "boom");
        let err = SeverError::InvalidVariable(info.clone());
        assert_eq!(err.info(), &info);
        let err = SeverError::WeightsNotNormalized(info.clone());
        assert_eq!(err.info(), &info);
    }

    #[test]
    fn display_includes_context_and_hint() {
        let err = SeverError::InvalidModel(
            ErrorInfo::new("M001", "missing parent")
                .with_context("variable", "x")
                .with_hint("declare x before referencing it"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("missing parent"));
        assert!(rendered.contains("variable=x"));
        assert!(rendered.contains("declare x before referencing it"));
    }
}
