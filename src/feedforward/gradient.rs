use serde::{Deserialize, Serialize};

use super::error::{NetError, Operand, SizeMismatch};

/// Weights of all non-input layers: `weights[layer][to][from]`.
pub type Weights = Vec<Vec<Vec<f64>>>;

/// Biases of all non-input layers: `biases[layer][neuron]`.
pub type Biases = Vec<Vec<f64>>;

/// Changes to network parameters, shaped exactly like the network's weights and biases.
///
/// Used for per-sample gradients, accumulated totals and their averages alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub weights: Weights,
    pub biases: Biases,
}

impl Gradient {
    /// Returns zero-filled gradient for given geometry.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::feedforward::Gradient;
    /// let g = Gradient::zeros(&[3, 2, 1]);
    /// assert_eq!(g.weights, vec![vec![vec![0.0; 3]; 2], vec![vec![0.0; 2]; 1]]);
    /// assert_eq!(g.biases, vec![vec![0.0; 2], vec![0.0; 1]]);
    /// ```
    pub fn zeros(layer_sizes: &[usize]) -> Gradient {
        let weights = layer_sizes
            .windows(2)
            .map(|pair| vec![vec![0.0; pair[0]]; pair[1]])
            .collect();
        let biases = layer_sizes
            .iter()
            .skip(1)
            .map(|&size| vec![0.0; size])
            .collect();
        Gradient { weights, biases }
    }

    /// Whether `other` has the same shape, i.e. comes from the same topology.
    pub fn same_shape(&self, other: &Gradient) -> bool {
        self.first_mismatch(other).is_none()
    }

    /// First differing length, walking weights (layers, rows, row lengths) then biases.
    fn first_mismatch(&self, other: &Gradient) -> Option<SizeMismatch> {
        let differ = |expected: usize, got: usize| {
            if expected != got {
                Some(SizeMismatch { expected, got })
            } else {
                None
            }
        };

        differ(self.weights.len(), other.weights.len())
            .or_else(|| {
                self.weights
                    .iter()
                    .zip(other.weights.iter())
                    .find_map(|(a, b)| {
                        differ(a.len(), b.len()).or_else(|| {
                            a.iter()
                                .zip(b.iter())
                                .find_map(|(ra, rb)| differ(ra.len(), rb.len()))
                        })
                    })
            })
            .or_else(|| differ(self.biases.len(), other.biases.len()))
            .or_else(|| {
                self.biases
                    .iter()
                    .zip(other.biases.iter())
                    .find_map(|(a, b)| differ(a.len(), b.len()))
            })
    }

    /// Adds `other` to this gradient elementwise.
    ///
    /// # Returns
    /// * `Ok(())` if both gradients share the same topology;
    /// * `Err(NetError::ShapeMismatch)` otherwise, carrying the first layer or row length
    /// that differs and leaving this gradient untouched.
    pub fn add(&mut self, other: &Gradient) -> Result<(), NetError> {
        if let Some(mismatch) = self.first_mismatch(other) {
            return Err(NetError::ShapeMismatch(Operand::Gradient, mismatch));
        }
        self.add_unchecked(other, 1.0);
        Ok(())
    }

    /// Multiplies every entry by `coeff`.
    pub fn scale(&mut self, coeff: f64) {
        self.map_inplace(|v| *v *= coeff);
    }

    /// Returns a copy with every entry multiplied by `coeff`.
    pub fn scaled(&self, coeff: f64) -> Gradient {
        let mut res = self.clone();
        res.scale(coeff);
        res
    }

    /// Returns a copy with every entry divided by `divisor`.
    pub fn divided(&self, divisor: f64) -> Gradient {
        let mut res = self.clone();
        res.map_inplace(|v| *v /= divisor);
        res
    }

    /// Total number of scalar entries (weights + biases).
    pub fn len(&self) -> usize {
        let weights: usize = self
            .weights
            .iter()
            .flat_map(|layer| layer.iter())
            .map(|row| row.len())
            .sum();
        let biases: usize = self.biases.iter().map(|layer| layer.len()).sum();
        weights + biases
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets every entry to zero, keeping the shape.
    pub(crate) fn clear(&mut self) {
        self.map_inplace(|v| *v = 0.0);
    }

    /// `self += coeff * other`, shapes are assumed to match.
    pub(crate) fn add_unchecked(&mut self, other: &Gradient, coeff: f64) {
        add_scaled(&mut self.weights, &mut self.biases, other, coeff);
    }

    fn map_inplace<F: FnMut(&mut f64)>(&mut self, mut f: F) {
        self.weights
            .iter_mut()
            .flat_map(|layer| layer.iter_mut())
            .flat_map(|row| row.iter_mut())
            .for_each(&mut f);
        self.biases
            .iter_mut()
            .flat_map(|layer| layer.iter_mut())
            .for_each(&mut f);
    }
}

/// `weights += coeff * gradient.weights; biases += coeff * gradient.biases`, elementwise.
pub(crate) fn add_scaled(weights: &mut Weights, biases: &mut Biases, gradient: &Gradient, coeff: f64) {
    for (layer, g_layer) in weights.iter_mut().zip(gradient.weights.iter()) {
        for (row, g_row) in layer.iter_mut().zip(g_layer.iter()) {
            for (w, &g) in row.iter_mut().zip(g_row.iter()) {
                *w += coeff * g;
            }
        }
    }
    for (layer, g_layer) in biases.iter_mut().zip(gradient.biases.iter()) {
        for (b, &g) in layer.iter_mut().zip(g_layer.iter()) {
            *b += coeff * g;
        }
    }
}
