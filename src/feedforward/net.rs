use rand::Rng;
use tracing::{debug, trace};

use super::activation::Activation;
use super::error::{NetError, Operand};
use super::gradient::{add_scaled, Biases, Gradient, Weights};
use super::init::Initializer;
use super::iteration::IterationState;
use crate::config::{check_topology, NetworkConfig};

/// Neural network structure.
///
/// Besides parameters, the network owns every buffer forward and backward passes work in,
/// so a `Network` value is a self-contained unit of training state:
/// * `forward` fills `activations` and `pre_activations`;
/// * `backpropagate` fills the gradient buffers from the last forward pass,
/// and adds them to `totals` while an iteration is in progress;
/// * weights and biases change only through `end_iteration` and `apply_update` (gradient steps)
/// or `set_weights`, `set_biases` and `set_parameters` (wholesale replacement, e.g. resync).
///
/// Cloning a network deep-copies all of it, including accumulated totals.
#[derive(Debug, Clone)]
pub struct Network {
    /// The number of neurons in each layer.
    pub(super) layer_sizes: Box<[usize]>,

    /// Activation function of every non-input layer.
    pub(super) functions: Box<[Activation]>,

    /// `weights[layer][to][from]`, for every non-input layer.
    pub(super) weights: Weights,

    /// `biases[layer][neuron]`, for every non-input layer.
    pub(super) biases: Biases,

    /// Outputs of every layer, including input: `activations[0]` holds the last input.
    pub(super) activations: Vec<Vec<f64>>,

    /// Weighted sums plus bias of every non-input layer, before the activation function.
    pub(super) pre_activations: Vec<Vec<f64>>,

    /// Loss derivatives with respect to `activations` of every non-input layer.
    pub(super) activation_grads: Vec<Vec<f64>>,

    /// Loss derivatives with respect to `pre_activations`.
    pub(super) pre_activation_grads: Vec<Vec<f64>>,

    /// Weights & biases derivatives of the last backpropagated sample.
    pub(super) gradient: Gradient,

    /// Sum of sample gradients of the current iteration.
    pub(super) totals: Gradient,

    pub(super) trial_count: usize,
    pub(super) loss: f64,
    pub(super) total_loss: f64,
    pub(super) avg_loss: Option<f64>,
    pub(super) avg_gradient: Option<Gradient>,
    pub(super) state: IterationState,
}

impl Network {
    /// Returns network built from given config, initializing parameters with `rand::thread_rng`.
    ///
    /// # Returns
    /// * `Ok(Network)` if the config describes a valid network;
    /// * `Err(NetError)` otherwise: `InvalidTopology`, `InvalidActivationCount` or `InvalidInitializer`.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::config::NetworkConfig;
    /// # use mlpnet::feedforward::{Activation, ActivationSpec, InitConfig, Network};
    /// let config = NetworkConfig::new(&[2, 10, 10, 1])
    ///     .activations(ActivationSpec::HiddenAndOutput(Activation::Relu, Activation::Sigmoid))
    ///     .weight_init(InitConfig::random(1.0));
    /// let mut net = Network::new(&config).unwrap();
    /// let outputs = net.forward(&[0.5, -0.5]).unwrap();
    /// assert_eq!(outputs.len(), 1);
    /// ```
    pub fn new(config: &NetworkConfig) -> Result<Network, NetError> {
        Network::with_rng(config, &mut rand::thread_rng())
    }

    /// Same as `Network::new`, drawing random parameters from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        config: &NetworkConfig,
        rng: &mut R,
    ) -> Result<Network, NetError> {
        let layer_sizes = &config.layer_sizes;
        check_topology(layer_sizes)?;
        let functions = config.activations.resolve(layer_sizes.len())?;
        let weight_init = Initializer::from_config(&config.weight_init, "weight")?;
        let bias_init = Initializer::from_config(&config.bias_init, "bias")?;

        // One sample per scalar, every weight first, then every bias
        let weights: Weights = layer_sizes
            .windows(2)
            .map(|pair| {
                (0..pair[1])
                    .map(|_| (0..pair[0]).map(|_| weight_init.sample(&mut *rng)).collect())
                    .collect()
            })
            .collect();
        let biases: Biases = layer_sizes[1..]
            .iter()
            .map(|&size| (0..size).map(|_| bias_init.sample(&mut *rng)).collect())
            .collect();

        debug!(
            layer_sizes = ?layer_sizes,
            activations = ?functions,
            "built network"
        );

        Ok(Network::assemble(layer_sizes, functions, weights, biases))
    }

    /// Wraps already validated parameters, allocating every derived buffer zero-filled.
    pub(super) fn assemble(
        layer_sizes: &[usize],
        functions: Box<[Activation]>,
        weights: Weights,
        biases: Biases,
    ) -> Network {
        let non_input = || -> Vec<Vec<f64>> {
            layer_sizes[1..].iter().map(|&size| vec![0.0; size]).collect()
        };

        Network {
            layer_sizes: layer_sizes.to_owned().into_boxed_slice(),
            functions,
            weights,
            biases,
            activations: layer_sizes.iter().map(|&size| vec![0.0; size]).collect(),
            pre_activations: non_input(),
            activation_grads: non_input(),
            pre_activation_grads: non_input(),
            gradient: Gradient::zeros(layer_sizes),
            totals: Gradient::zeros(layer_sizes),
            trial_count: 0,
            loss: 0.0,
            total_loss: 0.0,
            avg_loss: None,
            avg_gradient: None,
            state: IterationState::Idle,
        }
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn num_layers(&self) -> usize {
        self.layer_sizes.len()
    }

    pub fn input_size(&self) -> usize {
        self.layer_sizes[0]
    }

    pub fn output_size(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    /// Activation function of every non-input layer.
    pub fn activation_functions(&self) -> &[Activation] {
        &self.functions
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn biases(&self) -> &Biases {
        &self.biases
    }

    /// Outputs of every layer computed by the last `forward` call, input layer included.
    pub fn activations(&self) -> &[Vec<f64>] {
        &self.activations
    }

    /// Weighted sums of every non-input layer computed by the last `forward` call.
    pub fn pre_activations(&self) -> &[Vec<f64>] {
        &self.pre_activations
    }

    /// Calculates scalar (dot) product of two vectors of the same length.
    fn scalar_product(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(a, b)| a * b).sum()
    }

    /// Calculates output of the network using given input.
    ///
    /// Activations of every layer are kept for a following `backpropagate` call.
    ///
    /// # Arguments
    /// * `inputs` - slice that holds activations of input neurons.
    ///
    /// # Returns
    /// * `Ok(Vec<f64>)` - copy of output layer activations, if amount of inputs is right;
    /// * `Err(NetError::ShapeMismatch)` otherwise.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::config::NetworkConfig;
    /// # use mlpnet::feedforward::{Activation, ActivationSpec, Network};
    /// // Zero parameters: every pre-activation is 0, whatever the input
    /// let config = NetworkConfig::new(&[2, 2, 1])
    ///     .activations(ActivationSpec::Uniform(Activation::Sigmoid));
    /// let mut net = Network::new(&config).unwrap();
    /// assert_eq!(net.forward(&[1.0, 1.0]).unwrap(), vec![0.5]);
    /// ```
    pub fn forward(&mut self, inputs: &[f64]) -> Result<Vec<f64>, NetError> {
        if inputs.len() != self.input_size() {
            return Err(NetError::shape(
                Operand::Inputs,
                self.input_size(),
                inputs.len(),
            ));
        }

        self.activations[0].copy_from_slice(inputs);

        for layer in 0..self.weights.len() {
            let (done, rest) = self.activations.split_at_mut(layer + 1);
            let old_activations = &done[layer];
            let new_activations = &mut rest[0];
            let function = self.functions[layer];

            for (to, (neuron_weights, &bias)) in self.weights[layer]
                .iter()
                .zip(self.biases[layer].iter())
                .enumerate()
            {
                let z = Network::scalar_product(old_activations, neuron_weights) + bias;
                self.pre_activations[layer][to] = z;
                new_activations[to] = function.func(z);
            }
        }

        Ok(self.activations[self.activations.len() - 1].clone())
    }

    /// Calculates mean squared error of outputs given the desired values.
    /// Implements the formula:
    /// `mean((outputs - desired outputs)^2)`
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::feedforward::Network;
    /// let outputs = [10.0; 1000];
    /// let desired_outputs = [10.25; 1000];
    /// let loss = Network::mse(&outputs, &desired_outputs).unwrap();
    /// assert_eq!(loss, 0.0625);
    /// ```
    pub fn mse(outputs: &[f64], desired_outputs: &[f64]) -> Result<f64, NetError> {
        if outputs.len() != desired_outputs.len() {
            return Err(NetError::shape(
                Operand::Targets,
                outputs.len(),
                desired_outputs.len(),
            ));
        }
        if outputs.is_empty() {
            return Ok(0.0);
        }

        let sum: f64 = outputs
            .iter()
            .zip(desired_outputs.iter())
            .map(|(&a, &b)| (a - b) * (a - b))
            .sum();
        Ok(sum / outputs.len() as f64)
    }

    /// Applies parameter changes, multiplied by a scalar coefficient:
    /// `weights += coeff * gradient.weights`, `biases += coeff * gradient.biases`.
    ///
    /// Nothing but weights and biases is touched.
    ///
    /// # Returns
    /// * `Ok(())` if `gradient` matches network geometry;
    /// * `Err(NetError::ShapeMismatch)` otherwise, leaving the network untouched.
    pub fn apply_update(&mut self, gradient: &Gradient, coeff: f64) -> Result<(), NetError> {
        check_parameters(&self.layer_sizes, &gradient.weights, &gradient.biases)
            .map_err(|err| match err {
                NetError::ShapeMismatch(_, mismatch) => {
                    NetError::ShapeMismatch(Operand::Gradient, mismatch)
                }
                other => other,
            })?;
        add_scaled(&mut self.weights, &mut self.biases, gradient, coeff);
        Ok(())
    }

    /// Replaces weights, e.g. with the ones of a coordinating network after its update.
    pub fn set_weights(&mut self, weights: Weights) -> Result<(), NetError> {
        check_weights(&self.layer_sizes, &weights)?;
        trace!("weights replaced");
        self.weights = weights;
        Ok(())
    }

    /// Replaces biases, e.g. with the ones of a coordinating network after its update.
    pub fn set_biases(&mut self, biases: Biases) -> Result<(), NetError> {
        check_biases(&self.layer_sizes, &biases)?;
        trace!("biases replaced");
        self.biases = biases;
        Ok(())
    }

    /// Replaces both weights and biases; on error neither is changed.
    pub fn set_parameters(&mut self, weights: Weights, biases: Biases) -> Result<(), NetError> {
        check_parameters(&self.layer_sizes, &weights, &biases)?;
        self.weights = weights;
        self.biases = biases;
        trace!("parameters replaced");
        Ok(())
    }
}

/// Checks that `weights` is shaped `[layer][layer_sizes[l + 1]][layer_sizes[l]]`.
pub(super) fn check_weights(layer_sizes: &[usize], weights: &Weights) -> Result<(), NetError> {
    let layers = layer_sizes.len() - 1;
    if weights.len() != layers {
        return Err(NetError::shape(Operand::Weights, layers, weights.len()));
    }
    for (pair, layer) in layer_sizes.windows(2).zip(weights.iter()) {
        if layer.len() != pair[1] {
            return Err(NetError::shape(Operand::Weights, pair[1], layer.len()));
        }
        if let Some(row) = layer.iter().find(|row| row.len() != pair[0]) {
            return Err(NetError::shape(Operand::Weights, pair[0], row.len()));
        }
    }
    Ok(())
}

/// Checks that `biases` is shaped `[layer][layer_sizes[l + 1]]`.
pub(super) fn check_biases(layer_sizes: &[usize], biases: &Biases) -> Result<(), NetError> {
    let layers = layer_sizes.len() - 1;
    if biases.len() != layers {
        return Err(NetError::shape(Operand::Biases, layers, biases.len()));
    }
    for (&size, layer) in layer_sizes[1..].iter().zip(biases.iter()) {
        if layer.len() != size {
            return Err(NetError::shape(Operand::Biases, size, layer.len()));
        }
    }
    Ok(())
}

pub(super) fn check_parameters(
    layer_sizes: &[usize],
    weights: &Weights,
    biases: &Biases,
) -> Result<(), NetError> {
    check_weights(layer_sizes, weights)?;
    check_biases(layer_sizes, biases)
}
