use crate::error::{SgldError, SgldResult};
use ndarray::{s, Array2, Axis};
use rand::{distributions::Distribution, seq::SliceRandom, Rng};
use rand_distr::Uniform;
use statrs::distribution::MultivariateNormal;

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: Array2<f32>,
    pub targets: Array2<f32>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.nrows() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub inputs: Array2<f32>,
    pub targets: Array2<f32>,
}

impl Dataset {
    pub fn new(inputs: Array2<f32>, targets: Array2<f32>) -> SgldResult<Self> {
        if inputs.nrows() != targets.nrows() {
            return Err(SgldError::shape_mismatch(
                "dataset targets",
                &[inputs.nrows(), targets.ncols()],
                targets.shape(),
            ));
        }
        Ok(Self { inputs, targets })
    }

    /// One input and one target column.
    pub fn from_columns(xs: &[f32], ys: &[f32]) -> SgldResult<Self> {
        if xs.len() != ys.len() {
            return Err(SgldError::shape_mismatch(
                "dataset targets",
                &[xs.len(), 1],
                &[ys.len(), 1],
            ));
        }
        let column = |values: &[f32]| Array2::from_shape_fn((values.len(), 1), |(i, _)| values[i]);
        Self::new(column(xs), column(ys))
    }

    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.nrows() == 0
    }

    pub fn input_dim(&self) -> usize {
        self.inputs.ncols()
    }

    pub fn output_dim(&self) -> usize {
        self.targets.ncols()
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);
        self.inputs = self.inputs.select(Axis(0), &indices);
        self.targets = self.targets.select(Axis(0), &indices);
    }

    /// Splits the dataset into consecutive batches of `len / num_batches`
    /// samples. When the length is not divisible the remainder forms one more,
    /// shorter, batch.
    pub fn batches(&self, num_batches: usize) -> SgldResult<Vec<Batch>> {
        let num_samples = self.len();
        if num_batches == 0 || num_batches > num_samples {
            return Err(SgldError::InvalidBatchCount {
                num_batches,
                num_samples,
            });
        }
        let batch_size = num_samples / num_batches;
        let batches: Vec<Batch> = (0..num_samples)
            .step_by(batch_size)
            .map(|start| {
                let end = (start + batch_size).min(num_samples);
                Batch {
                    inputs: self.inputs.slice(s![start..end, ..]).to_owned(),
                    targets: self.targets.slice(s![start..end, ..]).to_owned(),
                }
            })
            .filter(|batch| !batch.is_empty())
            .collect();
        if batches.is_empty() {
            return Err(SgldError::EmptyBatches);
        }
        Ok(batches)
    }

    pub fn xs(&self) -> Vec<f32> {
        self.inputs.column(0).to_vec()
    }

    pub fn ys(&self) -> Vec<f32> {
        self.targets.column(0).to_vec()
    }
}

/// Draws a 1-D regression dataset from a Gaussian process prior with an RBF
/// kernel plus i.i.d. observation noise.
#[derive(Debug, Clone, PartialEq)]
pub struct GpSampler {
    pub num_points: usize,
    pub x_range: (f32, f32),
    pub lengthscale: f32,
    pub variance: f32,
    pub noise_std: f32,
    /// Points dropped from each end of the sorted inputs, leaving a gap in
    /// the data at both edges of `x_range`.
    pub margin: usize,
}

impl GpSampler {
    pub fn rbf(&self, a: f64, b: f64) -> f64 {
        let lengthscale = self.lengthscale as f64;
        self.variance as f64 * (-(a - b).powi(2) / (2.0 * lengthscale * lengthscale)).exp()
    }

    /// Row-major `K(xs, xs) + noise_std² · I`.
    pub fn covariance(&self, xs: &[f64]) -> Vec<f64> {
        let n = xs.len();
        let noise_var = (self.noise_std as f64).powi(2);
        let mut cov = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let k = self.rbf(xs[i], xs[j]);
                cov[i * n + j] = k;
                cov[j * n + i] = k;
            }
            cov[i * n + i] += noise_var;
        }
        cov
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SgldResult<Dataset> {
        let (low, high) = self.x_range;
        if !(low < high) {
            return Err(SgldError::InvalidSetting {
                name: "x_range",
                reason: format!("({}, {}) is empty", low, high),
            });
        }
        if !(self.noise_std > 0.0 && self.noise_std.is_finite()) {
            return Err(SgldError::InvalidSetting {
                name: "noise_std",
                reason: format!("{} leaves the covariance singular", self.noise_std),
            });
        }
        if self.num_points <= 2 * self.margin {
            return Err(SgldError::InvalidSetting {
                name: "margin",
                reason: format!(
                    "{} points leave nothing after dropping {} from each end",
                    self.num_points, self.margin
                ),
            });
        }

        let uniform = Uniform::new(low as f64, high as f64);
        let mut xs: Vec<f64> = (0..self.num_points).map(|_| rng.sample(uniform)).collect();
        xs.sort_by(|a, b| a.total_cmp(b));

        let mvn = MultivariateNormal::new(vec![0.0; self.num_points], self.covariance(&xs))
            .map_err(|e| SgldError::Sampling {
                reason: format!("{:?}", e),
            })?;
        let ys: Vec<f64> = mvn.sample(rng).iter().copied().collect();
        let y_mean = ys.iter().sum::<f64>() / ys.len() as f64;

        let keep = self.margin..self.num_points - self.margin;
        let train_xs: Vec<f32> = xs[keep.clone()].iter().map(|x| *x as f32).collect();
        let train_ys: Vec<f32> = ys[keep].iter().map(|y| (*y - y_mean) as f32).collect();

        let mut dataset = Dataset::from_columns(&train_xs, &train_ys)?;
        dataset.shuffle(rng);
        Ok(dataset)
    }
}
