use crate::{error::SgldResult, parameter::Parameter};
use rand::Rng;

/// Update rule plugged into the [`crate::Trainer`].
///
/// The trainer owns the network and the learning rate schedule; an optimizer
/// only sees the parameters of the current step and the rate to apply.
pub trait Optimizer {
    fn zero_grad(&self, params: &mut [&mut Parameter]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    fn step<R: Rng + ?Sized>(
        &mut self,
        params: &mut [&mut Parameter],
        learning_rate: f32,
        rng: &mut R,
    ) -> SgldResult<()>;
}
