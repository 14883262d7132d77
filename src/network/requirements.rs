//! Hyperparameters each node kind resolves while the network is built.

use crate::config::BuildConfig;
use crate::tree::{NodeKind, OptionValue};

/// What to do when no value is found in scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    /// Build fails with the resolver's error.
    Required,
    /// The hyperparameter is left out.
    Optional,
    Value(OptionValue),
}

/// Constraint on a resolved value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Check {
    PositiveInt,
    NonNegativeInt,
    Probability,
    PositiveFloat,
    Shape,
    Any,
}

impl Check {
    pub fn accepts(self, value: &OptionValue) -> bool {
        match self {
            Check::PositiveInt => value.as_usize().map_or(false, |v| v > 0),
            Check::NonNegativeInt => value.as_usize().is_some(),
            Check::Probability => value.as_f64().map_or(false, |p| (0.0..1.0).contains(&p)),
            Check::PositiveFloat => value.as_f64().map_or(false, |v| v > 0.0),
            Check::Shape => value.as_shape().is_some(),
            Check::Any => true,
        }
    }

    pub fn expected(self) -> &'static str {
        match self {
            Check::PositiveInt => "a positive integer",
            Check::NonNegativeInt => "a non-negative integer",
            Check::Probability => "a probability in [0, 1)",
            Check::PositiveFloat => "a positive number",
            Check::Shape => "a shape or an integer",
            Check::Any => "any value",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    /// Name the resolved value is stored under.
    pub key: &'static str,
    /// Candidate names, in priority order.
    pub names: &'static [&'static str],
    pub fallback: Fallback,
    pub check: Check,
}

impl Requirement {
    fn new(key: &'static str, names: &'static [&'static str], fallback: Fallback, check: Check) -> Self {
        Self { key, names, fallback, check }
    }
}

pub fn requirements(kind: NodeKind, config: &BuildConfig) -> Vec<Requirement> {
    use Check::*;
    use Fallback::*;

    match kind {
        NodeKind::Input => vec![Requirement::new("shape", &["shape"], Required, Shape)],
        NodeKind::Dense => vec![
            Requirement::new("num_units", &["num_units"], Required, PositiveInt),
            Requirement::new("inits", &["inits"], Optional, Any),
        ],
        NodeKind::Conv2d => vec![
            Requirement::new("num_filters", &["num_filters"], Required, PositiveInt),
            Requirement::new("filter_size", &["filter_size"], Required, Shape),
            Requirement::new("stride", &["stride"], Value(OptionValue::Int(1)), Shape),
            Requirement::new("pad", &["pad"], Value(OptionValue::Int(0)), Any),
            Requirement::new("inits", &["inits"], Optional, Any),
        ],
        NodeKind::MaxPool2d => vec![
            Requirement::new("pool_size", &["pool_size"], Required, Shape),
            Requirement::new("pool_stride", &["pool_stride", "pool_size"], Optional, Shape),
        ],
        NodeKind::Dropout => vec![Requirement::new(
            "dropout_probability",
            &["dropout_probability", "p"],
            Value(OptionValue::Float(0.5)),
            Probability,
        )],
        NodeKind::BatchNormalization => vec![
            Requirement::new("epsilon", &["epsilon"], Value(OptionValue::Float(1e-4)), PositiveFloat),
            Requirement::new(
                "batch_axis",
                &["batch_axis"],
                Value(OptionValue::Int(config.batch_axis as i64)),
                NonNegativeInt,
            ),
        ],
        NodeKind::Identity
        | NodeKind::Hyperparameter
        | NodeKind::Sequential
        | NodeKind::Container
        | NodeKind::ReLU
        | NodeKind::Softmax => Vec::new(),
    }
}
