use ndarray::{array, Array2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sgld_nn::{ErrorKind, Network, Parameter, SgldError};

fn rng() -> StdRng {
    StdRng::from_seed([7u8; 32])
}

fn randomized_network() -> Network {
    let mut rng = rng();
    let mut network = Network::new(1, 1, 6, 0.0, &mut rng).unwrap();
    for param in network.parameters_mut() {
        param.value.mapv_inplace(|_| rng.gen_range(-1.0..1.0));
    }
    network.log_noise.value.fill(0.2);
    network
}

fn value_at(param: &Parameter, k: usize) -> f32 {
    param.value.iter().nth(k).copied().unwrap()
}

fn grad_at(param: &Parameter, k: usize) -> f32 {
    param.grad.iter().nth(k).copied().unwrap()
}

fn perturb(param: &mut Parameter, k: usize, delta: f32) {
    if let Some(v) = param.value.iter_mut().nth(k) {
        *v += delta;
    }
}

fn batch() -> (Array2<f32>, Array2<f32>) {
    (
        array![[-1.2f32], [-0.4], [0.3], [0.9]],
        array![[0.5f32], [-0.1], [0.2], [1.0]],
    )
}

#[test]
fn test_output_shape() {
    let network = Network::new(1, 3, 8, 0.0, &mut rng()).unwrap();
    let input = Array2::zeros((5, 1));

    assert_eq!(network.forward(input.view()).unwrap().shape(), &[5, 6]);
    assert_eq!(
        network.mean_predictions(input.view()).unwrap().shape(),
        &[5, 3]
    );
    assert_eq!(network.num_parameters(), 8 + 8 + 8 * 6 + 6 + 1);
}

#[test]
fn test_initialisation() {
    let network = Network::new(2, 1, 16, -1.5, &mut rng()).unwrap();

    assert_eq!(network.layer1.weights.shape(), &[2, 16]);
    assert_eq!(network.layer2.weights.shape(), &[16, 2]);
    assert_eq!(network.log_noise(), -1.5);
    for param in &network.parameters()[..4] {
        assert!(param.value.iter().all(|v| v.abs() <= 0.01));
        assert!(param.grad.iter().all(|g| *g == 0.0));
    }
}

#[test]
fn test_invalid_construction() {
    let err = Network::new(1, 1, 0, 0.0, &mut rng()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = Network::new(1, 1, 4, f32::INFINITY, &mut rng()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_input_shape_mismatch() {
    let network = Network::new(2, 1, 4, 0.0, &mut rng()).unwrap();
    let err = network.forward(Array2::zeros((3, 1)).view()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
}

#[test]
fn test_clone_is_independent() {
    let mut network = Network::new(1, 1, 4, 0.0, &mut rng()).unwrap();
    let snapshot = network.clone();

    network.layer1.weights.value.fill(1.0);
    network.log_noise.value.fill(3.0);

    assert_ne!(snapshot, network);
    assert_eq!(snapshot.log_noise(), 0.0);
    assert!(snapshot
        .layer1
        .weights
        .value
        .iter()
        .all(|v| v.abs() <= 0.01));
}

#[test]
fn test_gradients_accumulate_until_zeroed() {
    let mut network = randomized_network();
    let (x, y) = batch();

    network.loss_and_backward(x.view(), y.view()).unwrap();
    let first = grad_at(&network.log_noise, 0);
    assert!(first != 0.0);

    network.loss_and_backward(x.view(), y.view()).unwrap();
    assert!((grad_at(&network.log_noise, 0) - 2.0 * first).abs() < 1e-5);

    network.zero_grad();
    for param in network.parameters() {
        assert!(param.grad.iter().all(|g| *g == 0.0));
    }
}

#[test]
fn test_loss_matches_loss_and_backward() {
    let mut network = randomized_network();
    let (x, y) = batch();

    let loss = network.loss(x.view(), y.view()).unwrap();
    let backward_loss = network.loss_and_backward(x.view(), y.view()).unwrap();
    assert!((loss - backward_loss).abs() < 1e-6);
}

#[test]
fn test_output_layer_gradients_match_finite_difference() {
    let mut network = randomized_network();
    let (x, y) = batch();
    network.loss_and_backward(x.view(), y.view()).unwrap();
    let h = 1e-2f32;

    // layer2 weights, layer2 biases, log noise
    for param_index in [2usize, 3, 4] {
        let len = network.parameters()[param_index].len();
        for k in 0..len {
            let analytic = grad_at(network.parameters()[param_index], k);

            let mut plus = network.clone();
            perturb(plus.parameters_mut()[param_index], k, h);
            let mut minus = network.clone();
            perturb(minus.parameters_mut()[param_index], k, -h);
            let numeric = (plus.loss(x.view(), y.view()).unwrap()
                - minus.loss(x.view(), y.view()).unwrap())
                / (2.0 * h);

            assert!(
                (analytic - numeric).abs() < 1e-2 * analytic.abs().max(1.0),
                "{}[{}]: analytic {} numeric {}",
                network.parameters()[param_index].name(),
                k,
                analytic,
                numeric
            );
        }
    }
}

#[test]
fn test_hidden_bias_gradient_matches_finite_difference() {
    let mut network = randomized_network();
    let (x, y) = batch();
    network.loss_and_backward(x.view(), y.view()).unwrap();
    let h = 1e-3f32;

    // only units whose pre-activation stays away from the ReLU kink
    let hidden = network.layer1.forward(x.view()).unwrap();
    let units: Vec<usize> = (0..network.num_units)
        .filter(|&j| hidden.column(j).iter().all(|z| z.abs() > 0.05))
        .collect();
    assert!(!units.is_empty());

    for k in units {
        let analytic = grad_at(&network.layer1.biases, k);
        let mut plus = network.clone();
        perturb(&mut plus.layer1.biases, k, h);
        let mut minus = network.clone();
        perturb(&mut minus.layer1.biases, k, -h);
        let numeric = (plus.loss(x.view(), y.view()).unwrap()
            - minus.loss(x.view(), y.view()).unwrap())
            / (2.0 * h);
        assert!(
            (analytic - numeric).abs() < 2e-2 * analytic.abs().max(1.0),
            "layer1.biases[{}]: analytic {} numeric {} (bias {})",
            k,
            analytic,
            numeric,
            value_at(&network.layer1.biases, k)
        );
    }
}

#[test]
fn test_non_finite_gradient() {
    let mut network = Network::new(1, 1, 4, -10.0, &mut rng()).unwrap();
    network.layer1.weights.value.fill(1e32);
    network.layer1.biases.value.fill(0.0);
    network.layer2.weights.value.fill(0.0);
    network.layer2.biases.value.fill(0.0);

    // the loss stays finite while hidden · dY overflows
    let err = network
        .loss_and_backward(array![[1.0f32]].view(), array![[1.0f32]].view())
        .unwrap_err();
    assert_eq!(
        err,
        SgldError::NonFiniteGradient {
            parameter: "layer2.weights"
        }
    );
    assert_eq!(err.kind(), ErrorKind::Numerical);
}
