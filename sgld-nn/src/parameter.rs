use crate::error::{SgldError, SgldResult};
use ndarray::{ArrayD, ArrayView, ArrayView1, ArrayView2, Dimension, Ix1, Ix2};

/// A named tensor owned by a [`crate::Network`] together with the gradient
/// accumulated for it by the last backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: &'static str,
    pub value: ArrayD<f32>,
    pub grad: ArrayD<f32>,
}

impl Parameter {
    pub fn new(name: &'static str, value: ArrayD<f32>) -> Self {
        let grad = ArrayD::zeros(value.raw_dim());
        Self { name, value, grad }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> &[usize] {
        self.value.shape()
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Adds `grad` to the stored gradient. Shapes must match exactly.
    pub fn accumulate_grad<D: Dimension>(&mut self, grad: ArrayView<f32, D>) -> SgldResult<()> {
        self.check_grad_shape()?;
        if grad.shape() != self.value.shape() {
            return Err(SgldError::shape_mismatch(
                self.name,
                self.value.shape(),
                grad.shape(),
            ));
        }
        self.grad += &grad.into_dyn();
        Ok(())
    }

    pub fn check_grad_shape(&self) -> SgldResult<()> {
        if self.grad.shape() != self.value.shape() {
            return Err(SgldError::shape_mismatch(
                self.name,
                self.value.shape(),
                self.grad.shape(),
            ));
        }
        Ok(())
    }

    pub fn grad_is_finite(&self) -> bool {
        self.grad.iter().all(|g| g.is_finite())
    }

    pub fn value1(&self) -> SgldResult<ArrayView1<f32>> {
        self.value
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|_| SgldError::shape_mismatch(self.name, &[self.len()], self.shape()))
    }

    pub fn value2(&self) -> SgldResult<ArrayView2<f32>> {
        self.value
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| SgldError::shape_mismatch(self.name, &[self.len(), 1], self.shape()))
    }
}
