use log::trace;
use ndarray::{ArrayD, IxDyn, Zip};
use rand::Rng;
use rand_distr::StandardNormal;
use sgld_nn::{Optimizer, Parameter, SgldError, SgldResult};

/// Stochastic Gradient Langevin Dynamics.
///
/// Every step applies
///
/// ```text
/// p ← p − ½·lr·(g + weight_decay·p) + √lr·ε,   ε ~ N(0, I)
/// ```
///
/// with no momentum and no per-parameter scaling: the injected noise has
/// variance exactly `lr`, so as the learning rate anneals the iterates
/// sample the posterior over the parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Sgld {
    weight_decay: f32,
    steps: usize,
}

impl Sgld {
    pub fn new(weight_decay: f32) -> Self {
        Self {
            weight_decay,
            steps: 0,
        }
    }

    pub fn weight_decay(&self) -> f32 {
        self.weight_decay
    }

    /// Number of completed steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// `√lr · ε` with `ε ~ N(0, I)` of the given shape.
    pub fn noise_term<R: Rng + ?Sized>(
        shape: &[usize],
        learning_rate: f32,
        rng: &mut R,
    ) -> ArrayD<f32> {
        let scale = learning_rate.sqrt();
        ArrayD::from_shape_simple_fn(IxDyn(shape), || {
            scale * rng.sample::<f32, _>(StandardNormal)
        })
    }

    /// Applies the update to `param` using an already drawn noise term.
    pub fn update(
        &self,
        param: &mut Parameter,
        learning_rate: f32,
        noise: &ArrayD<f32>,
    ) -> SgldResult<()> {
        param.check_grad_shape()?;
        if noise.shape() != param.shape() {
            return Err(SgldError::ShapeMismatch {
                context: "sgld noise",
                expected: param.shape().to_vec(),
                actual: noise.shape().to_vec(),
            });
        }
        let half_lr = 0.5 * learning_rate;
        let weight_decay = self.weight_decay;
        Zip::from(&mut param.value)
            .and(&param.grad)
            .and(noise)
            .for_each(|p, &g, &eps| {
                let grad = g + weight_decay * *p;
                *p += eps - half_lr * grad;
            });
        Ok(())
    }
}

impl Optimizer for Sgld {
    fn step<R: Rng + ?Sized>(
        &mut self,
        params: &mut [&mut Parameter],
        learning_rate: f32,
        rng: &mut R,
    ) -> SgldResult<()> {
        if !(learning_rate >= 0.0 && learning_rate.is_finite()) {
            return Err(SgldError::InvalidLearningRate {
                step: self.steps,
                value: learning_rate,
            });
        }
        for param in params.iter() {
            param.check_grad_shape()?;
            if !param.grad_is_finite() {
                return Err(SgldError::NonFiniteGradient {
                    parameter: param.name(),
                });
            }
        }
        for param in params.iter_mut() {
            let noise = Self::noise_term(param.shape(), learning_rate, rng);
            self.update(param, learning_rate, &noise)?;
        }
        self.steps += 1;
        trace!("SGLD step {} with learning rate {:e}", self.steps, learning_rate);
        Ok(())
    }
}
