use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use super::error::{NetError, Operand};
use super::gradient::Gradient;
use super::net::Network;

/// Training loops over flattened samples, built on the iteration lifecycle.
///
/// Samples are passed the way they are stored: all inputs joined in one slice,
/// all desired outputs joined in another, in the same order.
impl Network {
    /// Checks joined samples against network geometry.
    ///
    /// # Returns
    /// * `Ok(usize)` - number of samples, if sizes are consistent;
    /// * `Err(NetError::ShapeMismatch)` otherwise.
    fn samples_count(
        &self,
        all_inputs: &[f64],
        all_desired_outputs: &[f64],
    ) -> Result<usize, NetError> {
        let inputs_len = self.input_size();
        let outputs_len = self.output_size();

        let count = (all_inputs.len() + inputs_len - 1) / inputs_len;
        if all_inputs.len() != count * inputs_len {
            return Err(NetError::shape(
                Operand::Inputs,
                count * inputs_len,
                all_inputs.len(),
            ));
        }
        if all_desired_outputs.len() != count * outputs_len {
            return Err(NetError::shape(
                Operand::Targets,
                count * outputs_len,
                all_desired_outputs.len(),
            ));
        }
        Ok(count)
    }

    /// Performs one iteration over every sample in a given batch, then applies the averaged gradient.
    /// (It is equivalent to calling `Network::start_iteration`, then `forward` and `backpropagate`
    /// for every sample, and then `Network::end_iteration`.)
    ///
    /// # Arguments
    /// * `all_inputs` - slice of all samples' inputs, joined;
    /// * `all_desired_outputs` - slice of all samples' desired outputs, joined;
    /// * `learning_rate` - gradient multiplier.
    ///
    /// # Returns
    /// * `Ok(f64)` - the average loss of the batch;
    /// * `Err(NetError::EmptyIteration)` for an empty batch;
    /// * `Err(NetError::ShapeMismatch)` if samples don't match network geometry.
    ///
    /// On error no iteration is left in progress.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::config::NetworkConfig;
    /// # use mlpnet::feedforward::{InitConfig, Network};
    /// let config = NetworkConfig::new(&[2, 10, 10, 1]).weight_init(InitConfig::random(1.0));
    /// let mut net = Network::new(&config).unwrap();
    /// let inputs = [0.0, 0.0, 1.0, 1.0, 2.0, 2.0];
    /// let desired_outputs = [0.0, 0.5, 1.0];
    /// let loss = net.train_batch(&inputs, &desired_outputs, 0.1).unwrap();
    /// ```
    pub fn train_batch(
        &mut self,
        all_inputs: &[f64],
        all_desired_outputs: &[f64],
        learning_rate: f64,
    ) -> Result<f64, NetError> {
        // Checked before opening the iteration, so a failed call leaves the network idle
        if self.samples_count(all_inputs, all_desired_outputs)? == 0 {
            return Err(NetError::EmptyIteration);
        }

        self.start_iteration();
        for (inputs, desired_outputs) in all_inputs
            .chunks(self.input_size())
            .zip(all_desired_outputs.chunks(self.output_size()))
        {
            self.forward(inputs)?;
            self.backpropagate(desired_outputs)?;
        }
        self.end_iteration(learning_rate, true)
    }

    /// Starts an iteration and accumulates `trials` uniformly selected samples, without ending it.
    ///
    /// This is the work of one of several independent copies of a network: the returned totals
    /// are meant to be summed with the other copies' totals and applied to one network.
    ///
    /// # Arguments
    /// * `all_inputs` - slice of all samples' inputs, joined;
    /// * `all_desired_outputs` - slice of all samples' desired outputs, joined;
    /// * `trials` - number of samples to draw (with repetition);
    /// * `rng` - random numbers generator used for drawing.
    ///
    /// # Returns
    /// * `Ok(&Gradient)` - the iteration's gradient totals, not averaged;
    /// * `Err(NetError::EmptyIteration)` if there is nothing to draw from or `trials` is 0;
    /// * `Err(NetError::ShapeMismatch)` if samples don't match network geometry.
    ///
    /// No iteration is started on error.
    pub fn accumulate_random<R: Rng + ?Sized>(
        &mut self,
        all_inputs: &[f64],
        all_desired_outputs: &[f64],
        trials: usize,
        rng: &mut R,
    ) -> Result<&Gradient, NetError> {
        let selection_size = self.samples_count(all_inputs, all_desired_outputs)?;
        if selection_size == 0 || trials == 0 {
            return Err(NetError::EmptyIteration);
        }

        let inputs_len = self.input_size();
        let outputs_len = self.output_size();

        self.start_iteration();
        let indices_between = Uniform::from(0..selection_size);
        for _ in 0..trials {
            let random_index = indices_between.sample(rng);
            let inputs = &all_inputs[random_index * inputs_len..(random_index + 1) * inputs_len];
            let desired_outputs =
                &all_desired_outputs[random_index * outputs_len..(random_index + 1) * outputs_len];
            self.forward(inputs)?;
            self.backpropagate(desired_outputs)?;
        }

        Ok(&self.totals)
    }

    /// Performs training on `trials` uniformly selected samples, then applies.
    /// (It is equivalent to `Network::accumulate_random` followed by `Network::end_iteration`.)
    ///
    /// # Returns
    /// * The average loss of the drawn samples.
    ///
    /// # Examples
    /// ```
    /// # use mlpnet::config::NetworkConfig;
    /// # use mlpnet::feedforward::{InitConfig, Network};
    /// let config = NetworkConfig::new(&[2, 10, 10, 1]).weight_init(InitConfig::random(1.0));
    /// let mut net = Network::new(&config).unwrap();
    /// let inputs = [0.0, 0.0, 1.0, 1.0, 2.0, 2.0];
    /// let desired_outputs = [0.0, 0.5, 1.0];
    /// let loss = net
    ///     .train_random(&inputs, &desired_outputs, 10, 0.1, &mut rand::thread_rng())
    ///     .unwrap();
    /// ```
    pub fn train_random<R: Rng + ?Sized>(
        &mut self,
        all_inputs: &[f64],
        all_desired_outputs: &[f64],
        trials: usize,
        learning_rate: f64,
        rng: &mut R,
    ) -> Result<f64, NetError> {
        self.accumulate_random(all_inputs, all_desired_outputs, trials, rng)?;
        self.end_iteration(learning_rate, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::feedforward::{Activation, ActivationSpec, InitConfig, IterationState};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn net(seed: u64) -> Network {
        let config = NetworkConfig::new(&[2, 5, 1])
            .activations(ActivationSpec::HiddenAndOutput(
                Activation::leaky_relu(0.1),
                Activation::Sigmoid,
            ))
            .weight_init(InitConfig::random(1.0))
            .bias_init(InitConfig::random(0.2));
        Network::with_rng(&config, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    const INPUTS: [f64; 8] = [0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0];
    const DESIRED: [f64; 4] = [0.0, 1.0, 1.0, 1.0];

    #[test]
    fn batch_matches_manual_iteration() {
        let mut a = net(1);
        let mut b = a.clone();

        let loss = a.train_batch(&INPUTS, &DESIRED, 0.5).unwrap();

        b.start_iteration();
        for (inputs, desired) in INPUTS.chunks(2).zip(DESIRED.chunks(1)) {
            b.forward(inputs).unwrap();
            b.backpropagate(desired).unwrap();
        }
        assert_eq!(b.end_iteration(0.5, true).unwrap(), loss);
        assert_eq!(a.weights(), b.weights());
        assert_eq!(a.biases(), b.biases());
    }

    #[test]
    fn batch_checks_sizes() {
        let mut net = net(2);
        assert!(matches!(
            net.train_batch(&INPUTS[..7], &DESIRED, 0.5),
            Err(NetError::ShapeMismatch(Operand::Inputs, _))
        ));
        assert!(matches!(
            net.train_batch(&INPUTS, &DESIRED[..3], 0.5),
            Err(NetError::ShapeMismatch(Operand::Targets, _))
        ));
        assert_eq!(net.train_batch(&[], &[], 0.5), Err(NetError::EmptyIteration));
    }

    #[test]
    fn failed_batch_leaves_network_idle() {
        let mut net = net(6);
        assert_eq!(net.train_batch(&[], &[], 0.1), Err(NetError::EmptyIteration));
        assert_eq!(net.iteration_state(), IterationState::Idle);
        assert!(net.train_batch(&INPUTS[..3], &DESIRED, 0.1).is_err());
        assert_eq!(net.iteration_state(), IterationState::Idle);

        // A later plain backpropagation must not be counted
        net.forward(&INPUTS[..2]).unwrap();
        net.backpropagate(&DESIRED[..1]).unwrap();
        assert_eq!(net.trial_count(), 0);
        assert_eq!(net.gradient_totals(), &Gradient::zeros(&[2, 5, 1]));
    }

    #[test]
    fn random_accumulates_requested_trials() {
        let mut net = net(3);
        let weights = net.weights().clone();
        let mut rng = StdRng::seed_from_u64(3);

        net.accumulate_random(&INPUTS, &DESIRED, 25, &mut rng).unwrap();
        assert_eq!(net.trial_count(), 25);
        assert_ne!(net.gradient_totals(), &Gradient::zeros(&[2, 5, 1]));
        // Nothing applied yet
        assert_eq!(net.weights(), &weights);

        net.end_iteration(0.1, true).unwrap();
        assert_ne!(net.weights(), &weights);
    }

    #[test]
    fn random_with_nothing_to_draw() {
        let mut net = net(4);
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(
            net.train_random(&[], &[], 5, 0.1, &mut rng),
            Err(NetError::EmptyIteration)
        );
        assert_eq!(
            net.train_random(&INPUTS, &DESIRED, 0, 0.1, &mut rng),
            Err(NetError::EmptyIteration)
        );
        assert_eq!(net.iteration_state(), IterationState::Idle);
        assert_eq!(
            net.accumulate_random(&INPUTS, &DESIRED, 0, &mut rng),
            Err(NetError::EmptyIteration)
        );
        assert_eq!(net.iteration_state(), IterationState::Idle);

        net.forward(&INPUTS[..2]).unwrap();
        net.backpropagate(&DESIRED[..1]).unwrap();
        assert_eq!(net.trial_count(), 0);
    }

    #[test]
    fn random_training_fits_or() {
        let mut net = net(5);
        let mut rng = StdRng::seed_from_u64(5);
        let before = net.train_batch(&INPUTS, &DESIRED, 0.0).unwrap();
        for _ in 0..500 {
            net.train_random(&INPUTS, &DESIRED, 8, 1.0, &mut rng).unwrap();
        }
        let after = net.train_batch(&INPUTS, &DESIRED, 0.0).unwrap();
        assert!(after < before, "{} -> {}", before, after);
    }
}
