use ndarray::{arr1, ArrayD, IxDyn};
use rand::{rngs::StdRng, SeedableRng};
use sgld_algorithms::Sgld;
use sgld_nn::{
    Dataset, EpochPolicy, ErrorKind, GpSampler, LearningRateSchedule, Network, Optimizer,
    Parameter, SgldError, Trainer,
};

fn rng() -> StdRng {
    StdRng::from_seed([5u8; 32])
}

fn param(value: &[f32], grad: &[f32]) -> Parameter {
    let mut param = Parameter::new("p", arr1(value).into_dyn());
    param.grad = arr1(grad).into_dyn();
    param
}

fn values(param: &Parameter) -> Vec<f32> {
    param.value.iter().copied().collect()
}

#[test]
fn test_zero_grad() {
    let mut a = param(&[1.0, 2.0], &[0.5, -1.0]);
    let mut b = param(&[3.0], &[7.0]);
    Sgld::new(1.0).zero_grad(&mut [&mut a, &mut b]);

    assert!(a.grad.iter().chain(b.grad.iter()).all(|g| *g == 0.0));
    assert_eq!(values(&a), vec![1.0, 2.0]);
}

#[test]
fn test_update_without_noise() {
    let sgld = Sgld::new(0.1);
    let mut p = param(&[1.0, 2.0], &[0.5, -1.0]);
    let noise = ArrayD::zeros(IxDyn(&[2]));
    sgld.update(&mut p, 0.2, &noise).unwrap();

    let updated = values(&p);
    assert!((updated[0] - 0.94).abs() < 1e-6);
    assert!((updated[1] - 2.08).abs() < 1e-6);
}

#[test]
fn test_zero_learning_rate_is_noop() {
    let mut sgld = Sgld::new(0.0);
    let mut p = param(&[1.0, -2.0, 3.0], &[4.0, 5.0, 6.0]);
    sgld.step(&mut [&mut p], 0.0, &mut rng()).unwrap();

    assert_eq!(values(&p), vec![1.0, -2.0, 3.0]);
    assert_eq!(sgld.steps(), 1);
}

#[test]
fn test_noise_variance() {
    let lr = 0.01f32;
    let noise = Sgld::noise_term(&[200_000], lr, &mut rng());
    let n = noise.len() as f64;
    let mean = noise.iter().map(|v| *v as f64).sum::<f64>() / n;
    let var = noise.iter().map(|v| (*v as f64 - mean).powi(2)).sum::<f64>() / n;

    assert!(mean.abs() < 1e-3);
    assert!((var - lr as f64).abs() < 0.03 * lr as f64);
}

#[test]
fn test_step_is_reproducible() {
    let mut a = param(&[0.1, 0.2, 0.3], &[1.0, 0.0, -1.0]);
    let mut b = a.clone();
    Sgld::new(1.0).step(&mut [&mut a], 1e-2, &mut rng()).unwrap();
    Sgld::new(1.0).step(&mut [&mut b], 1e-2, &mut rng()).unwrap();

    assert_eq!(a, b);
    assert_ne!(values(&a), vec![0.1, 0.2, 0.3]);
}

#[test]
fn test_log_noise_can_go_negative() {
    let mut log_noise = param(&[-5.0], &[100.0]);
    Sgld::new(0.0)
        .update(&mut log_noise, 0.1, &ArrayD::zeros(IxDyn(&[1])))
        .unwrap();
    assert_eq!(values(&log_noise), vec![-10.0]);
}

#[test]
fn test_step_errors() {
    let mut sgld = Sgld::new(1.0);

    let mut good = param(&[1.0], &[1.0]);
    let mut bad = param(&[1.0, 2.0], &[1.0, 2.0, 3.0]);
    let err = sgld
        .step(&mut [&mut good, &mut bad], 0.1, &mut rng())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    // nothing is updated when any parameter is invalid
    assert_eq!(values(&good), vec![1.0]);

    let mut nan = param(&[1.0], &[f32::NAN]);
    assert_eq!(
        sgld.step(&mut [&mut nan], 0.1, &mut rng()),
        Err(SgldError::NonFiniteGradient { parameter: "p" })
    );

    let mut p = param(&[1.0], &[1.0]);
    let err = sgld.step(&mut [&mut p], -0.1, &mut rng()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(sgld.step(&mut [&mut p], f32::NAN, &mut rng()).is_err());
    assert_eq!(sgld.steps(), 0);

    let noise = ArrayD::zeros(IxDyn(&[3]));
    assert!(sgld.update(&mut p, 0.1, &noise).is_err());
}

#[test]
fn test_train_and_evaluate() {
    let mut rng = rng();
    let dataset: Dataset = GpSampler {
        num_points: 80,
        x_range: (-3.0, 3.0),
        lengthscale: 1.0,
        variance: 1.0,
        noise_std: 0.3,
        margin: 10,
    }
    .sample(&mut rng)
    .unwrap();
    let batches = dataset.batches(2).unwrap();
    let policy = EpochPolicy {
        num_epochs: 60,
        burnin_epochs: 20,
        mix_epochs: 5,
        record_period: 2,
        eval_period: 20,
    };
    let schedule = LearningRateSchedule::constant(1e-3, 60 * batches.len()).unwrap();
    let network = Network::new(1, 1, 16, 0.0, &mut rng).unwrap();

    let outcome = Trainer::new(network, Sgld::new(1.0), schedule, policy, batches)
        .unwrap()
        .with_query_points(vec![-4.0, 0.0, 4.0])
        .run(&mut rng)
        .unwrap();
    assert_eq!(outcome.ensemble.len(), 8);
    assert_eq!(outcome.num_steps, 120);
    assert_eq!(outcome.evaluations.len(), 2);

    let query: Vec<f32> = (0..9).map(|i| -4.0 + i as f32).collect();
    let estimates = outcome.ensemble.evaluate(&query).unwrap();
    assert_eq!(estimates.len(), 9);
    for estimate in estimates {
        assert!(estimate.mean.is_finite());
        assert!(estimate.aleatoric > 0.0);
        assert!(estimate.epistemic >= 0.0);
        assert!(estimate.total >= estimate.aleatoric);
        assert!(estimate.total >= estimate.epistemic);
        assert!((estimate.total - estimate.aleatoric.hypot(estimate.epistemic)).abs() < 1e-6);
    }
}
