use crate::{
    error::{SgldError, SgldResult},
    parameter::Parameter,
};
use ndarray::{Array2, ArrayD, ArrayView2, Axis, IxDyn};
use rand::Rng;
use rand_distr::Uniform;

/// Weights and biases start uniformly in `[-INIT_RANGE, INIT_RANGE]`.
pub const INIT_RANGE: f32 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    pub in_features: usize,
    pub out_features: usize,
    pub weights: Parameter,
    pub biases: Parameter,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        names: (&'static str, &'static str),
        rng: &mut R,
    ) -> Self {
        let init = Uniform::new_inclusive(-INIT_RANGE, INIT_RANGE);
        let weights = ArrayD::from_shape_simple_fn(IxDyn(&[in_features, out_features]), || {
            rng.sample(init)
        });
        let biases = ArrayD::from_shape_simple_fn(IxDyn(&[out_features]), || rng.sample(init));
        Self {
            in_features,
            out_features,
            weights: Parameter::new(names.0, weights),
            biases: Parameter::new(names.1, biases),
        }
    }

    /// `x · W + b` for a batch `x` of shape `(batch, in_features)`.
    pub fn forward(&self, input_batch: ArrayView2<f32>) -> SgldResult<Array2<f32>> {
        if input_batch.ncols() != self.in_features {
            return Err(SgldError::shape_mismatch(
                "dense layer input",
                &[input_batch.nrows(), self.in_features],
                input_batch.shape(),
            ));
        }
        let weights = self.weights.value2()?;
        let biases = self.biases.value1()?;
        Ok(input_batch.dot(&weights) + &biases)
    }

    /// Accumulates `dW = xᵀ · dY` and `db = Σ_batch dY`, returns `dX = dY · Wᵀ`.
    pub fn backward(
        &mut self,
        input_from_cache: ArrayView2<f32>,
        grad_output_batch: ArrayView2<f32>,
    ) -> SgldResult<Array2<f32>> {
        if grad_output_batch.ncols() != self.out_features
            || grad_output_batch.nrows() != input_from_cache.nrows()
        {
            return Err(SgldError::shape_mismatch(
                "dense layer output gradient",
                &[input_from_cache.nrows(), self.out_features],
                grad_output_batch.shape(),
            ));
        }
        let weight_grad = input_from_cache.t().dot(&grad_output_batch);
        let bias_grad = grad_output_batch.sum_axis(Axis(0));
        self.weights.accumulate_grad(weight_grad.view())?;
        self.biases.accumulate_grad(bias_grad.view())?;

        let weights = self.weights.value2()?;
        Ok(grad_output_batch.dot(&weights.t()))
    }

    pub fn zero_grad(&mut self) {
        self.weights.zero_grad();
        self.biases.zero_grad();
    }
}
