// Several independent copies of one network accumulate gradients on their own share of samples;
// a coordinating network sums their totals, applies them once and hands parameters back.

use approx::assert_relative_eq;
use mlpnet::config::NetworkConfig;
use mlpnet::feedforward::{Activation, ActivationSpec, Gradient, InitConfig, Network, Snapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;

const WORKERS: usize = 4;
const INPUTS_LEN: usize = 3;
const OUTPUTS_LEN: usize = 2;

fn coordinator() -> Network {
    let config = NetworkConfig::new(&[INPUTS_LEN, 8, OUTPUTS_LEN])
        .activations(ActivationSpec::HiddenAndOutput(
            Activation::leaky_relu(0.05),
            Activation::Sigmoid,
        ))
        .weight_init(InitConfig::random(1.0))
        .bias_init(InitConfig::random(0.1));
    Network::with_rng(&config, &mut StdRng::seed_from_u64(2021)).unwrap()
}

fn samples(count: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(7);
    let inputs: Vec<f64> = (0..count * INPUTS_LEN)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect();
    let desired = inputs
        .chunks(INPUTS_LEN)
        .flat_map(|x| vec![(x[0] + x[1] > 0.0) as u8 as f64, (x[2] > 0.0) as u8 as f64])
        .collect();
    (inputs, desired)
}

// Accumulates every sample in order, leaving the iteration open
fn accumulate(net: &mut Network, inputs: &[f64], desired: &[f64]) -> Gradient {
    net.start_iteration();
    for (x, y) in inputs
        .chunks(INPUTS_LEN)
        .zip(desired.chunks(OUTPUTS_LEN))
    {
        net.forward(x).unwrap();
        net.backpropagate(y).unwrap();
    }
    net.gradient_totals().clone()
}

fn assert_close(a: &Gradient, b: &Gradient) {
    assert!(a.same_shape(b));
    for (x, y) in a.weights.iter().flatten().flatten().zip(b.weights.iter().flatten().flatten()) {
        assert_relative_eq!(x, y, epsilon = 1e-12, max_relative = 1e-9);
    }
    for (x, y) in a.biases.iter().flatten().zip(b.biases.iter().flatten()) {
        assert_relative_eq!(x, y, epsilon = 1e-12, max_relative = 1e-9);
    }
}

#[test]
fn worker_totals_add_up_to_single_network_totals() {
    let (inputs, desired) = samples(40);
    let per_worker = 40 / WORKERS;

    let mut reference = coordinator();
    let expected = accumulate(&mut reference, &inputs, &desired);

    let snapshot = coordinator().serialize();
    let totals: Vec<(Gradient, usize)> = thread::scope(|s| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let snapshot = snapshot.clone();
                let inputs = &inputs[worker * per_worker * INPUTS_LEN..][..per_worker * INPUTS_LEN];
                let desired =
                    &desired[worker * per_worker * OUTPUTS_LEN..][..per_worker * OUTPUTS_LEN];
                s.spawn(move || {
                    let mut net = Network::from_snapshot(&snapshot).unwrap();
                    let totals = accumulate(&mut net, inputs, desired);
                    (totals, net.trial_count())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut sum = Gradient::zeros(&[INPUTS_LEN, 8, OUTPUTS_LEN]);
    let mut trials = 0;
    for (gradient, count) in totals.iter() {
        sum.add(gradient).unwrap();
        trials += count;
    }
    assert_eq!(trials, reference.trial_count());
    assert_close(&sum, &expected);
}

#[test]
fn coordinated_training_keeps_workers_in_sync() {
    let (inputs, desired) = samples(64);
    let per_worker = 64 / WORKERS;
    let learning_rate = 0.5;

    let mut canonical = coordinator();
    let mut workers: Vec<Network> = (0..WORKERS)
        .map(|_| Network::from_snapshot(&canonical.serialize()).unwrap())
        .collect();

    let initial_loss = canonical.train_batch(&inputs, &desired, 0.0).unwrap();

    for epoch in 0..30 {
        let totals: Vec<(Gradient, usize)> = thread::scope(|s| {
            let handles: Vec<_> = workers
                .iter_mut()
                .enumerate()
                .map(|(worker, net)| {
                    let inputs =
                        &inputs[worker * per_worker * INPUTS_LEN..][..per_worker * INPUTS_LEN];
                    let desired =
                        &desired[worker * per_worker * OUTPUTS_LEN..][..per_worker * OUTPUTS_LEN];
                    let seed = (epoch * WORKERS + worker) as u64;
                    s.spawn(move || {
                        let mut rng = StdRng::seed_from_u64(seed);
                        let totals = net
                            .accumulate_random(inputs, desired, per_worker, &mut rng)
                            .unwrap()
                            .clone();
                        (totals, net.trial_count())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut sum = Gradient::zeros(canonical.layer_sizes());
        let mut trials = 0;
        for (gradient, count) in totals.iter() {
            sum.add(gradient).unwrap();
            trials += count;
        }
        canonical
            .apply_update(&sum.divided(trials as f64), -learning_rate)
            .unwrap();

        // Workers never end their iterations, so their own parameters stay put until resynced
        let snapshot: Snapshot = canonical.serialize();
        for net in workers.iter_mut() {
            net.set_parameters(snapshot.weights.clone(), snapshot.biases.clone())
                .unwrap();
        }
    }

    for net in workers.iter() {
        assert_eq!(net.weights(), canonical.weights());
        assert_eq!(net.biases(), canonical.biases());
    }

    let final_loss = canonical.train_batch(&inputs, &desired, 0.0).unwrap();
    assert!(final_loss < initial_loss, "{} -> {}", initial_loss, final_loss);
}
