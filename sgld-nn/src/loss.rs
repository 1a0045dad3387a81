//! Gaussian negative log-likelihood with a single learned noise scale.
//!
//! The network emits `2·D` columns per sample: the first `D` are the predicted
//! means, the last `D` are per-output noise logits. The per-output logits are
//! not used by the likelihood: the observation noise is the global
//! `σ = exp(log_noise)` (noise exponent fixed to 1), so their gradient is zero.

use crate::error::{SgldError, SgldResult};
use ndarray::{s, Array2, ArrayView2};

/// `0.5 · ln(2π)`
pub const HALF_LN_2PI: f32 = 0.918_938_5;

#[derive(Debug, Clone, PartialEq)]
pub struct LossGradient {
    pub loss: f32,
    /// Gradient w.r.t. the full `(batch, 2·D)` network output.
    pub grad_output: Array2<f32>,
    pub grad_log_noise: f32,
}

fn output_dims(output: &ArrayView2<f32>, target: &ArrayView2<f32>) -> SgldResult<usize> {
    let dims = target.ncols();
    if target.is_empty() {
        return Err(SgldError::shape_mismatch(
            "loss target",
            &[target.nrows().max(1), dims.max(1)],
            target.shape(),
        ));
    }
    if output.nrows() != target.nrows() || output.ncols() != 2 * dims {
        return Err(SgldError::shape_mismatch(
            "network output",
            &[target.nrows(), 2 * dims],
            output.shape(),
        ));
    }
    Ok(dims)
}

/// Mean of `(target - pred_mean)²` over batch and outputs.
fn mean_squared_residual(output: &ArrayView2<f32>, target: &ArrayView2<f32>, dims: usize) -> f32 {
    let pred_mean = output.slice(s![.., ..dims]);
    let sum: f64 = target
        .iter()
        .zip(pred_mean.iter())
        .map(|(y, mu)| ((*y - *mu) as f64).powi(2))
        .sum();
    (sum / target.len() as f64) as f32
}

/// `mean[ 0.5·ln(2π) + log_noise + 0.5·((target − pred_mean) / exp(log_noise))² ]`
pub fn log_gaussian_loss(
    output: ArrayView2<f32>,
    target: ArrayView2<f32>,
    log_noise: f32,
) -> SgldResult<f32> {
    let dims = output_dims(&output, &target)?;
    let msr = mean_squared_residual(&output, &target, dims);
    finite_loss(HALF_LN_2PI + log_noise + 0.5 * msr * (-2.0 * log_noise).exp())
}

/// Loss together with its gradients w.r.t. the network output and `log_noise`.
pub fn log_gaussian_loss_and_grad(
    output: ArrayView2<f32>,
    target: ArrayView2<f32>,
    log_noise: f32,
) -> SgldResult<LossGradient> {
    let dims = output_dims(&output, &target)?;
    let inv_var = (-2.0 * log_noise).exp();
    let msr = mean_squared_residual(&output, &target, dims);
    let loss = finite_loss(HALF_LN_2PI + log_noise + 0.5 * msr * inv_var)?;

    let scale = inv_var / target.len() as f32;
    let mut grad_output = Array2::zeros(output.raw_dim());
    let residual = &output.slice(s![.., ..dims]) - &target;
    grad_output
        .slice_mut(s![.., ..dims])
        .assign(&residual.mapv(|r| r * scale));

    Ok(LossGradient {
        loss,
        grad_output,
        grad_log_noise: 1.0 - msr * inv_var,
    })
}

fn finite_loss(loss: f32) -> SgldResult<f32> {
    if loss.is_finite() {
        Ok(loss)
    } else {
        Err(SgldError::NonFiniteLoss { value: loss })
    }
}
