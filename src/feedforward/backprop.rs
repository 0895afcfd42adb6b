use super::error::{NetError, Operand};
use super::gradient::Gradient;
use super::iteration::IterationState;
use super::net::Network;

/// Derivatives computed by the last backpropagation, borrowed from the network.
#[derive(Debug, Clone, Copy)]
pub struct Backprop<'a> {
    /// Weights & biases derivatives.
    pub gradient: &'a Gradient,

    /// Derivatives with respect to pre-activations of every non-input layer.
    pub pre_activation_grads: &'a [Vec<f64>],

    /// Derivatives with respect to activations of every non-input layer.
    pub activation_grads: &'a [Vec<f64>],

    /// Mean squared error of the sample.
    pub loss: f64,
}

impl Network {
    /// Calculates derivatives of the loss for the sample last passed to `Network::forward`,
    /// given its desired outputs.
    ///
    /// While an iteration is in progress (see `Network::start_iteration`), the weights & biases
    /// derivatives are also added to the iteration totals and the trial is counted.
    /// Parameters are never changed here.
    ///
    /// The reported loss is the mean squared error over the outputs, while derivatives start from
    /// `2 * (output - desired)` per output neuron.
    ///
    /// Results are meaningless unless `forward` was called with this sample's inputs just before.
    ///
    /// # Returns
    /// * `Ok(Backprop)` if amount of desired outputs is right;
    /// * `Err(NetError::ShapeMismatch)` otherwise.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::config::NetworkConfig;
    /// # use mlpnet::feedforward::{InitConfig, Network};
    /// let config = NetworkConfig::new(&[2, 3, 1]).weight_init(InitConfig::random(1.0));
    /// let mut net = Network::new(&config).unwrap();
    /// net.forward(&[1.0, 0.0]).unwrap();
    /// let bp = net.backpropagate(&[1.0]).unwrap();
    /// assert_eq!(bp.gradient.weights[1][0].len(), 3);
    /// ```
    pub fn backpropagate(&mut self, desired_outputs: &[f64]) -> Result<Backprop<'_>, NetError> {
        self.backward(desired_outputs, true)
    }

    /// Same as `Network::backpropagate`, but never touches iteration totals.
    ///
    /// Useful for per-sample gradients weighted by the caller.
    pub fn backpropagate_detached(
        &mut self,
        desired_outputs: &[f64],
    ) -> Result<Backprop<'_>, NetError> {
        self.backward(desired_outputs, false)
    }

    fn backward(&mut self, desired_outputs: &[f64], is_trial: bool) -> Result<Backprop<'_>, NetError> {
        if desired_outputs.len() != self.output_size() {
            return Err(NetError::shape(
                Operand::Targets,
                self.output_size(),
                desired_outputs.len(),
            ));
        }

        let output_layer = self.weights.len() - 1;

        // Derivatives of output layer activations
        let mut loss = 0.0;
        for ((da, &o), &d_o) in self.activation_grads[output_layer]
            .iter_mut()
            .zip(self.activations[output_layer + 1].iter())
            .zip(desired_outputs.iter())
        {
            let diff = o - d_o;
            *da = 2.0 * diff;
            loss += diff * diff;
        }
        self.loss = loss / desired_outputs.len() as f64;

        // Output layer first, then hidden layers in reverse
        for layer in (0..=output_layer).rev() {
            if layer < output_layer {
                // Each neuron gets the weighted sum of derivatives of neurons it signals to
                let next_grads = &self.pre_activation_grads[layer + 1];
                let next_weights = &self.weights[layer + 1];
                for (i, da) in self.activation_grads[layer].iter_mut().enumerate() {
                    *da = next_grads
                        .iter()
                        .zip(next_weights.iter())
                        .map(|(&dz, neuron_weights)| dz * neuron_weights[i])
                        .sum();
                }
            }

            let function = self.functions[layer];
            let old_activations = &self.activations[layer];
            for (to, (&da, &z)) in self.activation_grads[layer]
                .iter()
                .zip(self.pre_activations[layer].iter())
                .enumerate()
            {
                let dz = da * function.derivative(z);
                self.pre_activation_grads[layer][to] = dz;

                // Bias is a linear constant in z
                self.gradient.biases[layer][to] = dz;
                for (dw, &a) in self.gradient.weights[layer][to]
                    .iter_mut()
                    .zip(old_activations.iter())
                {
                    *dw = dz * a;
                }
            }
        }

        if is_trial && self.state == IterationState::Accumulating {
            self.totals.add_unchecked(&self.gradient, 1.0);
            self.trial_count += 1;
            self.total_loss += self.loss;
        }

        Ok(Backprop {
            gradient: &self.gradient,
            pre_activation_grads: &self.pre_activation_grads,
            activation_grads: &self.activation_grads,
            loss: self.loss,
        })
    }
}
