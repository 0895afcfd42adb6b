use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use super::error::NetError;

/// Neuron activation function.
///
/// Functions can't cross a serialization boundary, so every variant has a stable name
/// (see `Activation::name`) and is looked up again by `Activation::resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ActivationId", into = "ActivationId")]
pub enum Activation {
    Sigmoid,
    Relu,
    LeakyRelu { alpha: f64 },
    Tanh,
}

impl Activation {
    pub const SIGMOID: &'static str = "sigmoid";
    pub const RELU: &'static str = "relu";
    pub const LEAKY_RELU: &'static str = "leaky-relu";
    pub const TANH: &'static str = "tanh";

    /// Alpha used for `leaky-relu` when none is given.
    pub const DEFAULT_LEAKY_ALPHA: f64 = 0.01;

    pub fn leaky_relu(alpha: f64) -> Self {
        Activation::LeakyRelu { alpha }
    }

    /// Applies the function to a pre-activation value `x`.
    pub fn func(&self, x: f64) -> f64 {
        match *self {
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Relu => x.max(0.0),
            Activation::LeakyRelu { alpha } => x.max(alpha * x),
            Activation::Tanh => x.tanh(),
        }
    }

    /// Derivative of the function with respect to the pre-activation value `x`.
    ///
    /// Sigmoid and tanh are expressed through the function itself:
    /// `s * (1 - s)` and `1 - t^2`.
    pub fn derivative(&self, x: f64) -> f64 {
        match *self {
            Activation::Sigmoid => {
                let s = self.func(x);
                s * (1.0 - s)
            }
            Activation::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyRelu { alpha } => {
                if x > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Sigmoid => Activation::SIGMOID,
            Activation::Relu => Activation::RELU,
            Activation::LeakyRelu { .. } => Activation::LEAKY_RELU,
            Activation::Tanh => Activation::TANH,
        }
    }

    /// Returns the serializable identifier of this function.
    pub fn id(&self) -> ActivationId {
        ActivationId {
            name: self.name().to_owned(),
            alpha: match *self {
                Activation::LeakyRelu { alpha } => Some(alpha),
                _ => None,
            },
        }
    }

    /// Looks up the function registered under `id.name`.
    ///
    /// # Returns
    /// * `Ok(Activation)` for `sigmoid`, `relu`, `leaky-relu` and `tanh`;
    /// * `Err(NetError::UnknownActivation)` otherwise.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::feedforward::{Activation, ActivationId};
    /// let id = ActivationId::with_alpha("leaky-relu", 0.3);
    /// assert_eq!(Activation::resolve(&id).unwrap(), Activation::leaky_relu(0.3));
    /// assert!(Activation::resolve(&ActivationId::new("softplus")).is_err());
    /// ```
    pub fn resolve(id: &ActivationId) -> Result<Activation, NetError> {
        match id.name.as_str() {
            Activation::SIGMOID => Ok(Activation::Sigmoid),
            Activation::RELU => Ok(Activation::Relu),
            Activation::LEAKY_RELU => Ok(Activation::LeakyRelu {
                alpha: id.alpha.unwrap_or(Activation::DEFAULT_LEAKY_ALPHA),
            }),
            Activation::TANH => Ok(Activation::Tanh),
            other => Err(NetError::UnknownActivation(other.to_owned())),
        }
    }
}

/// Value-only identifier of an activation function: its name plus parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationId {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
}

impl ActivationId {
    pub fn new(name: &str) -> Self {
        ActivationId {
            name: name.to_owned(),
            alpha: None,
        }
    }

    pub fn with_alpha(name: &str, alpha: f64) -> Self {
        ActivationId {
            name: name.to_owned(),
            alpha: Some(alpha),
        }
    }
}

impl TryFrom<ActivationId> for Activation {
    type Error = NetError;

    fn try_from(id: ActivationId) -> Result<Self, Self::Error> {
        Activation::resolve(&id)
    }
}

impl From<Activation> for ActivationId {
    fn from(activation: Activation) -> Self {
        activation.id()
    }
}

/// Which activation function each non-input layer uses.
///
/// Resolved once, at construction, into one function per non-input layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationSpec {
    /// One function per non-input layer.
    PerLayer(Vec<Activation>),
    /// `(hidden, output)`: the first for every hidden layer, the second for the output layer.
    HiddenAndOutput(Activation, Activation),
    /// The same function for every non-input layer.
    Uniform(Activation),
}

impl Default for ActivationSpec {
    fn default() -> Self {
        ActivationSpec::HiddenAndOutput(Activation::Relu, Activation::Sigmoid)
    }
}

impl ActivationSpec {
    /// Builds an `ActivationSpec` from a plain list, judging its meaning by its length:
    /// * `num_layers - 1` functions - one per non-input layer;
    /// * 2 functions - `[hidden, output]`;
    /// * 1 function - the same for all layers.
    ///
    /// Any other length fails with `NetError::InvalidActivationCount`.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::feedforward::{Activation, ActivationSpec};
    /// let spec = ActivationSpec::from_shorthand(vec![Activation::Tanh, Activation::Sigmoid], 4).unwrap();
    /// assert_eq!(
    ///     &*spec.resolve(4).unwrap(),
    ///     &[Activation::Tanh, Activation::Tanh, Activation::Sigmoid]
    /// );
    /// ```
    pub fn from_shorthand(
        functions: Vec<Activation>,
        num_layers: usize,
    ) -> Result<ActivationSpec, NetError> {
        let expected = num_layers.saturating_sub(1);
        match functions.len() {
            len if len == expected => Ok(ActivationSpec::PerLayer(functions)),
            2 => Ok(ActivationSpec::HiddenAndOutput(functions[0], functions[1])),
            1 => Ok(ActivationSpec::Uniform(functions[0])),
            got => Err(NetError::InvalidActivationCount { expected, got }),
        }
    }

    /// Expands into one function per non-input layer of a `num_layers` network.
    pub fn resolve(&self, num_layers: usize) -> Result<Box<[Activation]>, NetError> {
        let count = num_layers.saturating_sub(1);
        let functions = match self {
            ActivationSpec::PerLayer(functions) => {
                if functions.len() != count {
                    return Err(NetError::InvalidActivationCount {
                        expected: count,
                        got: functions.len(),
                    });
                }
                functions.clone()
            }
            ActivationSpec::HiddenAndOutput(hidden, output) => {
                let mut functions = vec![*hidden; count];
                if let Some(last) = functions.last_mut() {
                    *last = *output;
                }
                functions
            }
            ActivationSpec::Uniform(function) => vec![*function; count],
        };
        Ok(functions.into_boxed_slice())
    }
}
