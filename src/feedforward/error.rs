use std::fmt;

use thiserror::Error;

/// Errors reported by network construction, processing and training.
///
/// All of them are contract violations by the caller, so nothing here is retried or coerced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetError {
    #[error(
        "Net must have at least two layers (input and output) of non-zero size, \
        but got geometry {0:?}!"
    )]
    InvalidTopology(Vec<usize>),

    #[error("Expected 1, 2 or {expected} activation function(s), but got {got}!")]
    InvalidActivationCount { expected: usize, got: usize },

    #[error("Bad {target} initializer: {reason}!")]
    InvalidInitializer {
        target: &'static str,
        reason: String,
    },

    #[error("Unknown activation function {0:?}!")]
    UnknownActivation(String),

    #[error("Bad {0}: {1}")]
    ShapeMismatch(Operand, SizeMismatch),

    #[error("Cannot end an iteration with no accumulated trials!")]
    EmptyIteration,

    #[error("No iteration in progress, call `start_iteration` first!")]
    NoIteration,
}

impl NetError {
    pub(crate) fn shape(operand: Operand, expected: usize, got: usize) -> Self {
        NetError::ShapeMismatch(operand, SizeMismatch { expected, got })
    }
}

/// Which value a `NetError::ShapeMismatch` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Inputs,
    Targets,
    Weights,
    Biases,
    Gradient,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Operand::Inputs => "inputs",
            Operand::Targets => "targets",
            Operand::Weights => "weights",
            Operand::Biases => "biases",
            Operand::Gradient => "gradient",
        };
        f.write_str(name)
    }
}

/// Error structure for collections size mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatch {
    pub expected: usize,
    pub got: usize,
}

impl fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Expected {} values, but got {}!",
            self.expected, self.got
        )
    }
}
