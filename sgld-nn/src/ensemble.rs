use crate::{
    error::{SgldError, SgldResult},
    network::Network,
};
use log::info;
use logging_timer::time;
use ndarray::{Array2, ArrayView2, Axis};

/// Epistemic spread needs at least two posterior samples.
pub const MIN_SNAPSHOTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UncertaintyEstimate {
    pub mean: f32,
    pub aleatoric: f32,
    pub epistemic: f32,
    /// `sqrt(aleatoric² + epistemic²)`
    pub total: f32,
}

impl UncertaintyEstimate {
    pub fn new(mean: f32, aleatoric: f32, epistemic: f32) -> Self {
        Self {
            mean,
            aleatoric,
            epistemic,
            total: aleatoric.hypot(epistemic),
        }
    }
}

/// A frozen copy of the training network, taken after `epoch`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    epoch: usize,
    network: Network,
}

impl Snapshot {
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn noise_scale(&self) -> f32 {
        self.network.noise_scale()
    }
}

/// Append-only collection of posterior samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ensemble {
    snapshots: Vec<Snapshot>,
}

impl Ensemble {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep copies `network` and returns the index of the new snapshot.
    pub fn push(&mut self, network: &Network, epoch: usize) -> usize {
        self.snapshots.push(Snapshot {
            epoch,
            network: network.clone(),
        });
        self.snapshots.len() - 1
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// Estimates at 1-D query points for the first output.
    #[time]
    pub fn evaluate(&self, query_points: &[f32]) -> SgldResult<Vec<UncertaintyEstimate>> {
        let inputs = Array2::from_shape_fn((query_points.len(), 1), |(i, _)| query_points[i]);
        self.evaluate_output(inputs.view(), 0)
    }

    /// Estimates for output column `output` at every row of `inputs`.
    pub fn evaluate_output(
        &self,
        inputs: ArrayView2<f32>,
        output: usize,
    ) -> SgldResult<Vec<UncertaintyEstimate>> {
        if self.len() < MIN_SNAPSHOTS {
            return Err(SgldError::EnsembleTooSmall { size: self.len() });
        }
        let mut predictions = Array2::zeros((self.len(), inputs.nrows()));
        let mut noise_scales = Vec::with_capacity(self.len());
        for (mut row, snapshot) in predictions.outer_iter_mut().zip(&self.snapshots) {
            let means = snapshot.network.mean_predictions(inputs)?;
            if output >= means.ncols() {
                return Err(SgldError::shape_mismatch(
                    "ensemble output column",
                    &[inputs.nrows(), output + 1],
                    means.shape(),
                ));
            }
            row.assign(&means.column(output));
            noise_scales.push(snapshot.noise_scale());
        }
        info!(
            "Evaluated {} snapshots at {} query points",
            self.len(),
            inputs.nrows()
        );
        aggregate(predictions.view(), &noise_scales)
    }
}

/// Reduces `(snapshots × query points)` mean predictions and per-snapshot
/// noise scales into one estimate per query point.
///
/// Epistemic uncertainty is the population standard deviation over the
/// snapshot axis. Aleatoric uncertainty is the mean noise scale, shared by
/// every query point.
pub fn aggregate(
    predictions: ArrayView2<f32>,
    noise_scales: &[f32],
) -> SgldResult<Vec<UncertaintyEstimate>> {
    let num_snapshots = predictions.nrows();
    if num_snapshots < MIN_SNAPSHOTS {
        return Err(SgldError::EnsembleTooSmall {
            size: num_snapshots,
        });
    }
    if noise_scales.len() != num_snapshots {
        return Err(SgldError::shape_mismatch(
            "ensemble noise scales",
            &[num_snapshots],
            &[noise_scales.len()],
        ));
    }
    let means = predictions
        .mean_axis(Axis(0))
        .ok_or(SgldError::EnsembleTooSmall {
            size: num_snapshots,
        })?;
    let epistemic = predictions.var_axis(Axis(0), 0.0).mapv(f32::sqrt);
    let aleatoric = noise_scales.iter().sum::<f32>() / num_snapshots as f32;

    Ok(means
        .iter()
        .zip(epistemic.iter())
        .map(|(&mean, &epistemic)| UncertaintyEstimate::new(mean, aleatoric, epistemic))
        .collect())
}
