use crate::{
    dense::Dense,
    error::{SgldError, SgldResult},
    loss::{log_gaussian_loss, log_gaussian_loss_and_grad, LossGradient},
    parameter::Parameter,
};
use ndarray::{arr1, s, Array2, ArrayD, ArrayView2, IxDyn, Zip};
use rand::Rng;

/// Two dense layers with a ReLU in between plus a scalar log-noise.
///
/// `layer2` is `2 · output_dim` wide: predicted means followed by per-output
/// noise logits. Cloning a network deep copies every parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub input_dim: usize,
    pub output_dim: usize,
    pub num_units: usize,
    pub layer1: Dense,
    pub layer2: Dense,
    pub log_noise: Parameter,
}

#[derive(Debug, Clone)]
pub struct ForwardCache {
    pub input: Array2<f32>,
    pub hidden_linear: Array2<f32>,
    pub hidden_activated: Array2<f32>,
}

impl Network {
    pub fn new<R: Rng + ?Sized>(
        input_dim: usize,
        output_dim: usize,
        num_units: usize,
        init_log_noise: f32,
        rng: &mut R,
    ) -> SgldResult<Self> {
        for (name, value) in [
            ("input_dim", input_dim),
            ("output_dim", output_dim),
            ("num_units", num_units),
        ] {
            if value == 0 {
                return Err(SgldError::InvalidSetting {
                    name,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        if !init_log_noise.is_finite() {
            return Err(SgldError::InvalidSetting {
                name: "init_log_noise",
                reason: format!("{} is not finite", init_log_noise),
            });
        }
        let layer1 = Dense::new(
            input_dim,
            num_units,
            ("layer1.weights", "layer1.biases"),
            rng,
        );
        let layer2 = Dense::new(
            num_units,
            2 * output_dim,
            ("layer2.weights", "layer2.biases"),
            rng,
        );
        let log_noise = Parameter::new(
            "log_noise",
            ArrayD::from_elem(IxDyn(&[1]), init_log_noise),
        );
        Ok(Self {
            input_dim,
            output_dim,
            num_units,
            layer1,
            layer2,
            log_noise,
        })
    }

    pub fn forward(&self, input: ArrayView2<f32>) -> SgldResult<Array2<f32>> {
        Ok(self.forward_cached(input)?.0)
    }

    pub fn forward_cached(&self, input: ArrayView2<f32>) -> SgldResult<(Array2<f32>, ForwardCache)> {
        let hidden_linear = self.layer1.forward(input)?;
        let hidden_activated = hidden_linear.mapv(|v| v.max(0.0));
        let output = self.layer2.forward(hidden_activated.view())?;
        if output.ncols() != 2 * self.output_dim {
            return Err(SgldError::shape_mismatch(
                "network output",
                &[input.nrows(), 2 * self.output_dim],
                output.shape(),
            ));
        }
        Ok((
            output,
            ForwardCache {
                input: input.to_owned(),
                hidden_linear,
                hidden_activated,
            },
        ))
    }

    /// Predicted means only, shape `(batch, output_dim)`.
    pub fn mean_predictions(&self, input: ArrayView2<f32>) -> SgldResult<Array2<f32>> {
        let output = self.forward(input)?;
        Ok(output.slice(s![.., ..self.output_dim]).to_owned())
    }

    /// Accumulates gradients into every parameter.
    pub fn backward(
        &mut self,
        cache: &ForwardCache,
        grad_output: ArrayView2<f32>,
        grad_log_noise: f32,
    ) -> SgldResult<()> {
        let mut grad_hidden = self
            .layer2
            .backward(cache.hidden_activated.view(), grad_output)?;
        Zip::from(&mut grad_hidden)
            .and(&cache.hidden_linear)
            .for_each(|g, &z| {
                if z <= 0.0 {
                    *g = 0.0;
                }
            });
        self.layer1.backward(cache.input.view(), grad_hidden.view())?;
        self.log_noise
            .accumulate_grad(arr1(&[grad_log_noise]).view())?;
        Ok(())
    }

    /// Forward pass, loss and backward pass for one batch. Gradients are
    /// accumulated, so they must be zeroed beforehand.
    pub fn loss_and_backward(
        &mut self,
        input: ArrayView2<f32>,
        target: ArrayView2<f32>,
    ) -> SgldResult<f32> {
        let (output, cache) = self.forward_cached(input)?;
        let LossGradient {
            loss,
            grad_output,
            grad_log_noise,
        } = log_gaussian_loss_and_grad(output.view(), target, self.log_noise())?;
        self.backward(&cache, grad_output.view(), grad_log_noise)?;
        if let Some(param) = self.parameters().into_iter().find(|p| !p.grad_is_finite()) {
            return Err(SgldError::NonFiniteGradient {
                parameter: param.name(),
            });
        }
        Ok(loss)
    }

    pub fn loss(&self, input: ArrayView2<f32>, target: ArrayView2<f32>) -> SgldResult<f32> {
        let output = self.forward(input)?;
        log_gaussian_loss(output.view(), target, self.log_noise())
    }

    pub fn log_noise(&self) -> f32 {
        self.log_noise.value.iter().copied().next().unwrap_or_default()
    }

    /// Learned observation noise `exp(log_noise)`.
    pub fn noise_scale(&self) -> f32 {
        self.log_noise().exp()
    }

    pub fn parameters(&self) -> [&Parameter; 5] {
        [
            &self.layer1.weights,
            &self.layer1.biases,
            &self.layer2.weights,
            &self.layer2.biases,
            &self.log_noise,
        ]
    }

    pub fn parameters_mut(&mut self) -> [&mut Parameter; 5] {
        [
            &mut self.layer1.weights,
            &mut self.layer1.biases,
            &mut self.layer2.weights,
            &mut self.layer2.biases,
            &mut self.log_noise,
        ]
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }

    pub fn zero_grad(&mut self) {
        self.layer1.zero_grad();
        self.layer2.zero_grad();
        self.log_noise.zero_grad();
    }
}
