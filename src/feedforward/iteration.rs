use tracing::{debug, trace};

use super::error::NetError;
use super::gradient::Gradient;
use super::net::Network;

/// Whether backpropagated samples are being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationState {
    Idle,
    Accumulating,
}

impl Network {
    /// Resets gradient totals, trial counter and total loss, and starts accumulating
    /// every following `backpropagate` call.
    ///
    /// Starting an iteration while one is in progress discards the previous totals.
    pub fn start_iteration(&mut self) {
        self.totals.clear();
        self.trial_count = 0;
        self.total_loss = 0.0;
        self.avg_loss = None;
        self.state = IterationState::Accumulating;
        trace!("iteration started");
    }

    /// Ends the current iteration, averaging accumulated gradient over trials count.
    ///
    /// # Arguments
    /// * `learning_rate` - the averaged gradient is applied with coefficient `-learning_rate`;
    /// * `apply` - whether to change parameters at all. The average is available
    /// through `Network::avg_gradient` either way.
    ///
    /// # Returns
    /// * `Ok(f64)` - average loss of the iteration's trials;
    /// * `Err(NetError::NoIteration)` if no iteration was started;
    /// * `Err(NetError::EmptyIteration)` if nothing was backpropagated since it started.
    /// The iteration stays in progress in this case.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::config::NetworkConfig;
    /// # use mlpnet::feedforward::{InitConfig, Network};
    /// let config = NetworkConfig::new(&[2, 4, 1]).weight_init(InitConfig::random(1.0));
    /// let mut net = Network::new(&config).unwrap();
    ///
    /// net.start_iteration();
    /// for (inputs, desired) in [([0.0, 1.0], [1.0]), ([1.0, 1.0], [0.0])].iter() {
    ///     net.forward(inputs).unwrap();
    ///     net.backpropagate(desired).unwrap();
    /// }
    /// let avg_loss = net.end_iteration(0.5, true).unwrap();
    /// assert_eq!(net.avg_loss(), Some(avg_loss));
    /// ```
    pub fn end_iteration(&mut self, learning_rate: f64, apply: bool) -> Result<f64, NetError> {
        if self.state != IterationState::Accumulating {
            return Err(NetError::NoIteration);
        }
        if self.trial_count == 0 {
            return Err(NetError::EmptyIteration);
        }

        let trials = self.trial_count as f64;
        let avg_gradient = self.totals.divided(trials);
        if apply {
            self.apply_update(&avg_gradient, -learning_rate)?;
        }

        let avg_loss = self.total_loss / trials;
        self.avg_gradient = Some(avg_gradient);
        self.avg_loss = Some(avg_loss);
        self.state = IterationState::Idle;

        debug!(
            trials = self.trial_count,
            avg_loss,
            learning_rate,
            applied = apply,
            "iteration ended"
        );

        Ok(avg_loss)
    }

    pub fn iteration_state(&self) -> IterationState {
        self.state
    }

    /// Number of samples accumulated since the last `start_iteration`.
    pub fn trial_count(&self) -> usize {
        self.trial_count
    }

    /// Sum of gradients accumulated since the last `start_iteration`, not averaged.
    pub fn gradient_totals(&self) -> &Gradient {
        &self.totals
    }

    /// Averaged gradient of the last completed iteration.
    pub fn avg_gradient(&self) -> Option<&Gradient> {
        self.avg_gradient.as_ref()
    }

    /// Average loss of the last completed iteration.
    pub fn avg_loss(&self) -> Option<f64> {
        self.avg_loss
    }

    /// Loss of the last backpropagated sample.
    pub fn loss(&self) -> f64 {
        self.loss
    }
}
