//! Network configuration
//!
//! A `NetworkConfig` describes everything needed to build a fresh `Network`: its geometry,
//! activation functions and parameter initializers. It can be built in code or loaded from JSON:
//!
//! ```json
//! {
//!   "layer_sizes": [2, 16, 16, 1],
//!   "activations": { "hidden_and_output": [{ "name": "leaky-relu", "alpha": 0.1 }, { "name": "sigmoid" }] },
//!   "weight_init": { "method": "random", "range": 1.0 },
//!   "bias_init": { "method": "random", "range": 0.1 }
//! }
//! ```
//!
//! `activations`, `weight_init` and `bias_init` may be omitted; they default to
//! relu hidden layers with a sigmoid output, and zero-filled parameters.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::Path;

use crate::feedforward::{ActivationSpec, InitConfig, Initializer, NetError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// The number of neurons in each layer, input first.
    pub layer_sizes: Vec<usize>,

    #[serde(default)]
    pub activations: ActivationSpec,

    #[serde(default)]
    pub weight_init: InitConfig,

    #[serde(default)]
    pub bias_init: InitConfig,
}

impl NetworkConfig {
    /// Config with default activations and zero initializers.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::config::NetworkConfig;
    /// # use mlpnet::feedforward::{Activation, ActivationSpec, InitConfig};
    /// let config = NetworkConfig::new(&[2, 8, 1])
    ///     .activations(ActivationSpec::Uniform(Activation::Tanh))
    ///     .weight_init(InitConfig::random(1.0));
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(layer_sizes: &[usize]) -> Self {
        NetworkConfig {
            layer_sizes: layer_sizes.to_vec(),
            activations: ActivationSpec::default(),
            weight_init: InitConfig::default(),
            bias_init: InitConfig::default(),
        }
    }

    pub fn activations(mut self, activations: ActivationSpec) -> Self {
        self.activations = activations;
        self
    }

    pub fn weight_init(mut self, weight_init: InitConfig) -> Self {
        self.weight_init = weight_init;
        self
    }

    pub fn bias_init(mut self, bias_init: InitConfig) -> Self {
        self.bias_init = bias_init;
        self
    }

    /// Checks geometry, activation count and initializers without building anything.
    pub fn validate(&self) -> Result<(), NetError> {
        check_topology(&self.layer_sizes)?;
        self.activations.resolve(self.layer_sizes.len())?;
        Initializer::from_config(&self.weight_init, "weight")?;
        Initializer::from_config(&self.bias_init, "bias")?;
        Ok(())
    }
}

/// Geometry must have at least two layers, none of them empty.
pub(crate) fn check_topology(layer_sizes: &[usize]) -> Result<(), NetError> {
    if layer_sizes.len() < 2 || layer_sizes.contains(&0) {
        return Err(NetError::InvalidTopology(layer_sizes.to_vec()));
    }
    Ok(())
}

/// Loads a network configuration from a JSON file.
///
/// Reads the file at `path`, deserializes it into a `NetworkConfig` and validates it.
///
/// # Returns
///
/// `Ok(NetworkConfig)` on success, or an error if the file cannot be read, the JSON is invalid
/// or the described network cannot be built.
///
/// # Examples
///
/// ```no_run
/// use mlpnet::config::load_config;
///
/// let cfg = load_config("config/image.json").unwrap();
/// assert_eq!(cfg.layer_sizes[0], 2);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<NetworkConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let config: NetworkConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedforward::Activation;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_full_config() {
        let file = write_config(
            r#"{
                "layer_sizes": [2, 16, 16, 1],
                "activations": {"hidden_and_output": [{"name": "leaky-relu", "alpha": 0.1}, {"name": "sigmoid"}]},
                "weight_init": {"method": "RANDOM", "range": 1.0},
                "bias_init": {"method": "random", "range": 0.1}
            }"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.layer_sizes, vec![2, 16, 16, 1]);
        assert_eq!(
            config.activations,
            ActivationSpec::HiddenAndOutput(Activation::leaky_relu(0.1), Activation::Sigmoid)
        );
        assert_eq!(config.bias_init.range, Some(0.1));
    }

    #[test]
    fn load_uses_defaults() {
        let file = write_config(r#"{"layer_sizes": [3, 1]}"#);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config, NetworkConfig::new(&[3, 1]));
        assert_eq!(
            config.activations,
            ActivationSpec::HiddenAndOutput(Activation::Relu, Activation::Sigmoid)
        );
        assert_eq!(config.weight_init, InitConfig::zero());
    }

    #[test]
    fn load_rejects_bad_topology() {
        let file = write_config(r#"{"layer_sizes": [5]}"#);
        let err = load_config(file.path()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<NetError>(),
            Some(&NetError::InvalidTopology(vec![5]))
        );
    }

    #[test]
    fn load_rejects_unknown_activation() {
        let file = write_config(r#"{"layer_sizes": [1, 1], "activations": {"uniform": {"name": "gelu"}}}"#);
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn load_rejects_missing_file() {
        assert!(load_config("/nonexistent/network.json").is_err());
    }

    #[test]
    fn validate_checks_everything() {
        assert!(NetworkConfig::new(&[2, 0, 1]).validate().is_err());
        assert!(NetworkConfig::new(&[2, 3, 1])
            .activations(ActivationSpec::PerLayer(vec![Activation::Relu]))
            .validate()
            .is_err());
        assert!(NetworkConfig::new(&[2, 3, 1])
            .bias_init(InitConfig {
                method: "random".to_owned(),
                range: None
            })
            .validate()
            .is_err());
        assert!(NetworkConfig::new(&[2, 3, 1]).validate().is_ok());
    }
}
