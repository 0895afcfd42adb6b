use serde::{ser, Deserialize, Serialize};
use tracing::debug;

use super::activation::{Activation, ActivationId};
use super::error::NetError;
use super::gradient::{Biases, Weights};
use super::net::{check_parameters, Network};
use crate::config::check_topology;

/// Value-only copy of a network: geometry, activation function identifiers and parameters.
///
/// Holds no references to the network it was taken from, so it can be sent anywhere
/// (another thread, process or machine) and turned into an equivalent `Network` there.
/// Forward & backward buffers and iteration totals are not part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub layer_sizes: Vec<usize>,
    pub num_layers: usize,
    pub activation_functions: Vec<ActivationId>,
    pub weights: Weights,
    pub biases: Biases,
}

impl Snapshot {
    /// Serializes the snapshot to a JSON string.
    ///
    /// JSON has no NaN or infinity, so a snapshot holding such values (e.g. of a diverged
    /// network) is an error here rather than a string `from_json` can't read back.
    pub fn to_json(&self) -> serde_json::Result<String> {
        if let Some(value) = self.first_non_finite() {
            return Err(ser::Error::custom(format!(
                "can't represent non-finite parameter {} in JSON",
                value
            )));
        }
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Snapshot> {
        serde_json::from_str(json)
    }

    fn first_non_finite(&self) -> Option<f64> {
        let weights = self.weights.iter().flatten().flatten();
        let biases = self.biases.iter().flatten();
        let alphas = self.activation_functions.iter().filter_map(|id| id.alpha.as_ref());
        weights
            .chain(biases)
            .chain(alphas)
            .copied()
            .find(|v| !v.is_finite())
    }
}

impl Network {
    /// Takes a value-only snapshot of the network.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::config::NetworkConfig;
    /// # use mlpnet::feedforward::{Activation, ActivationSpec, InitConfig, Network, Snapshot};
    /// let config = NetworkConfig::new(&[3, 4, 2])
    ///     .activations(ActivationSpec::HiddenAndOutput(Activation::leaky_relu(0.2), Activation::Tanh))
    ///     .weight_init(InitConfig::random(1.0));
    /// let mut net = Network::new(&config).unwrap();
    ///
    /// let json = net.serialize().to_json().unwrap();
    /// let mut copy = Network::from_snapshot(&Snapshot::from_json(&json).unwrap()).unwrap();
    ///
    /// let inputs = [0.3, -1.0, 2.0];
    /// assert_eq!(net.forward(&inputs).unwrap(), copy.forward(&inputs).unwrap());
    /// ```
    pub fn serialize(&self) -> Snapshot {
        Snapshot {
            layer_sizes: self.layer_sizes.to_vec(),
            num_layers: self.layer_sizes.len(),
            activation_functions: self.functions.iter().map(Activation::id).collect(),
            weights: self.weights.clone(),
            biases: self.biases.clone(),
        }
    }

    /// Rebuilds a network from a snapshot.
    ///
    /// Activation functions are looked up again by their identifiers, parameters are copied,
    /// every other buffer is allocated anew.
    ///
    /// # Returns
    /// * `Ok(Network)` if the snapshot is consistent;
    /// * `Err(NetError)` otherwise: `InvalidTopology`, `InvalidActivationCount`,
    /// `UnknownActivation` or `ShapeMismatch`.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Network, NetError> {
        let layer_sizes = &snapshot.layer_sizes;
        check_topology(layer_sizes)?;
        if snapshot.num_layers != layer_sizes.len() {
            return Err(NetError::InvalidTopology(layer_sizes.clone()));
        }

        let expected = layer_sizes.len() - 1;
        if snapshot.activation_functions.len() != expected {
            return Err(NetError::InvalidActivationCount {
                expected,
                got: snapshot.activation_functions.len(),
            });
        }
        let functions = snapshot
            .activation_functions
            .iter()
            .map(Activation::resolve)
            .collect::<Result<Vec<_>, _>>()?
            .into_boxed_slice();

        check_parameters(layer_sizes, &snapshot.weights, &snapshot.biases)?;

        debug!(layer_sizes = ?layer_sizes, "network rebuilt from snapshot");

        Ok(Network::assemble(
            layer_sizes,
            functions,
            snapshot.weights.clone(),
            snapshot.biases.clone(),
        ))
    }
}
