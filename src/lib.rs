//! Dense multilayer perceptron: forward propagation, backpropagation, gradient accumulation
//! over training iterations, and value-only snapshots for moving networks between workers.

pub mod config;
pub mod feedforward;

#[cfg(feature = "python")]
mod python_ffi;
