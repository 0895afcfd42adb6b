use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::NetworkConfig;
use crate::feedforward::{
    Activation, ActivationId, ActivationSpec, Biases, Gradient, InitConfig, NetError,
    Network as InnerNetwork, Operand, SizeMismatch, Snapshot, Weights,
};
use crate::Impl_to_PyErr;

#[pyclass]
pub struct Network {
    pub(super) net: InnerNetwork,
}

fn init_config(range: Option<f64>) -> InitConfig {
    match range {
        Some(range) => InitConfig::random(range),
        None => InitConfig::zero(),
    }
}

#[pymethods]
impl Network {
    /// `activations` is a list of `(name, alpha)` pairs, using the same shorthand as
    /// `ActivationSpec::from_shorthand`; an empty list selects the default functions.
    /// A missing range means zero-filled parameters.
    #[new]
    pub fn new(
        layer_sizes: Vec<usize>,
        activations: Vec<(String, Option<f64>)>,
        weight_range: Option<f64>,
        bias_range: Option<f64>,
    ) -> Result<Self, NetError> {
        let spec = if activations.is_empty() {
            ActivationSpec::default()
        } else {
            let functions = activations
                .into_iter()
                .map(|(name, alpha)| Activation::resolve(&ActivationId { name, alpha }))
                .collect::<Result<Vec<_>, _>>()?;
            ActivationSpec::from_shorthand(functions, layer_sizes.len())?
        };

        let config = NetworkConfig::new(&layer_sizes)
            .activations(spec)
            .weight_init(init_config(weight_range))
            .bias_init(init_config(bias_range));

        Ok(Self {
            net: InnerNetwork::new(&config)?,
        })
    }

    pub fn layer_sizes(&self) -> Vec<usize> {
        self.net.layer_sizes().to_vec()
    }

    pub fn export(&self) -> (Weights, Biases) {
        (self.net.weights().clone(), self.net.biases().clone())
    }

    pub fn forward(&mut self, inputs: Vec<f64>) -> Result<Vec<f64>, NetError> {
        self.net.forward(&inputs)
    }

    /// Returns `(weights derivatives, biases derivatives, loss)` of the sample.
    pub fn backpropagate(
        &mut self,
        desired_outputs: Vec<f64>,
        is_trial: bool,
    ) -> Result<(Weights, Biases, f64), NetError> {
        let bp = if is_trial {
            self.net.backpropagate(&desired_outputs)?
        } else {
            self.net.backpropagate_detached(&desired_outputs)?
        };
        Ok((
            bp.gradient.weights.clone(),
            bp.gradient.biases.clone(),
            bp.loss,
        ))
    }

    pub fn start_iteration(&mut self) {
        self.net.start_iteration();
    }

    pub fn end_iteration(&mut self, learning_rate: f64, apply: bool) -> Result<f64, NetError> {
        self.net.end_iteration(learning_rate, apply)
    }

    pub fn apply_update(
        &mut self,
        weights: Weights,
        biases: Biases,
        coeff: f64,
    ) -> Result<(), NetError> {
        self.net.apply_update(&Gradient { weights, biases }, coeff)
    }

    pub fn set_parameters(&mut self, weights: Weights, biases: Biases) -> Result<(), NetError> {
        self.net.set_parameters(weights, biases)
    }

    pub fn gradient_totals(&self) -> (Weights, Biases) {
        let totals = self.net.gradient_totals();
        (totals.weights.clone(), totals.biases.clone())
    }

    pub fn trial_count(&self) -> usize {
        self.net.trial_count()
    }

    pub fn avg_loss(&self) -> Option<f64> {
        self.net.avg_loss()
    }

    #[staticmethod]
    pub fn _flatten_training_data(
        samples: Vec<(Vec<f64>, Vec<f64>)>,
        input_layer_size: usize,
        output_layer_size: usize,
    ) -> Result<(Vec<f64>, Vec<f64>), NetError> {
        let samples_count = samples.len();

        let mut all_inputs_vec = Vec::with_capacity(samples_count * input_layer_size);
        let mut all_desired_outputs_vec = Vec::with_capacity(samples_count * output_layer_size);

        for (inputs, desired_outputs) in samples {
            if inputs.len() != input_layer_size {
                return Err(NetError::ShapeMismatch(
                    Operand::Inputs,
                    SizeMismatch {
                        expected: input_layer_size,
                        got: inputs.len(),
                    },
                ));
            }
            all_inputs_vec.extend(inputs);

            if desired_outputs.len() != output_layer_size {
                return Err(NetError::ShapeMismatch(
                    Operand::Targets,
                    SizeMismatch {
                        expected: output_layer_size,
                        got: desired_outputs.len(),
                    },
                ));
            }
            all_desired_outputs_vec.extend(desired_outputs);
        }

        Ok((all_inputs_vec, all_desired_outputs_vec))
    }

    pub fn train_batch(
        &mut self,
        samples: Vec<(Vec<f64>, Vec<f64>)>,
        learning_rate: f64,
    ) -> Result<f64, NetError> {
        let (all_inputs, all_desired_outputs) = Network::_flatten_training_data(
            samples,
            self.net.input_size(),
            self.net.output_size(),
        )?;
        self.net
            .train_batch(&all_inputs, &all_desired_outputs, learning_rate)
    }

    pub fn train_random(
        &mut self,
        samples: Vec<(Vec<f64>, Vec<f64>)>,
        trials: usize,
        learning_rate: f64,
    ) -> Result<f64, NetError> {
        let (all_inputs, all_desired_outputs) = Network::_flatten_training_data(
            samples,
            self.net.input_size(),
            self.net.output_size(),
        )?;
        self.net.train_random(
            &all_inputs,
            &all_desired_outputs,
            trials,
            learning_rate,
            &mut rand::thread_rng(),
        )
    }

    /// JSON snapshot, see `Snapshot`.
    pub fn serialize(&self) -> PyResult<String> {
        self.net
            .serialize()
            .to_json()
            .map_err(|err| PyValueError::new_err(err.to_string()))
    }

    #[staticmethod]
    pub fn from_snapshot(json: &str) -> PyResult<Network> {
        let snapshot =
            Snapshot::from_json(json).map_err(|err| PyValueError::new_err(err.to_string()))?;
        Ok(Network {
            net: InnerNetwork::from_snapshot(&snapshot)?,
        })
    }
}

Impl_to_PyErr!(for NetError);
