use crate::{
    data::Batch,
    ensemble::{Ensemble, UncertaintyEstimate, MIN_SNAPSHOTS},
    error::{SgldError, SgldResult},
    network::Network,
    optimizer::Optimizer,
    schedule::LearningRateSchedule,
};
use log::{debug, info};
use logging_timer::time;
use rand::Rng;
use sgld_utils::mean;

/// Epoch thresholds driving the training loop. Epochs are numbered from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochPolicy {
    pub num_epochs: usize,
    /// No snapshot is taken at or before this epoch.
    pub burnin_epochs: usize,
    /// After burn-in, a snapshot is taken every `mix_epochs` epochs.
    pub mix_epochs: usize,
    /// Per-batch losses are recorded every `record_period` epochs.
    pub record_period: usize,
    /// After burn-in, the ensemble is evaluated every `eval_period` epochs.
    pub eval_period: usize,
}

impl EpochPolicy {
    pub fn validate(&self) -> SgldResult<()> {
        for (name, value) in [
            ("num_epochs", self.num_epochs),
            ("mix_epochs", self.mix_epochs),
            ("record_period", self.record_period),
            ("eval_period", self.eval_period),
        ] {
            if value == 0 {
                return Err(SgldError::InvalidSetting {
                    name,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn is_snapshot_epoch(&self, epoch: usize) -> bool {
        epoch > self.burnin_epochs && epoch % self.mix_epochs == 0
    }

    pub fn is_record_epoch(&self, epoch: usize) -> bool {
        epoch % self.record_period == 0
    }

    pub fn is_eval_epoch(&self, epoch: usize) -> bool {
        epoch > self.burnin_epochs && epoch % self.eval_period == 0
    }

    /// Number of snapshots a full run collects.
    pub fn expected_snapshots(&self) -> usize {
        if self.num_epochs <= self.burnin_epochs {
            0
        } else {
            self.num_epochs / self.mix_epochs - self.burnin_epochs / self.mix_epochs
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    pub epoch: usize,
    pub num_snapshots: usize,
    pub estimates: Vec<UncertaintyEstimate>,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub ensemble: Ensemble,
    /// Final state of the live network.
    pub network: Network,
    /// Mean batch loss of every epoch.
    pub epoch_losses: Vec<f32>,
    /// `batch_losses[j]` holds the loss of batch `j` at every recorded epoch.
    pub batch_losses: Vec<Vec<f32>>,
    pub evaluations: Vec<EvaluationRecord>,
    pub num_steps: usize,
}

/// Runs one SGLD chain: owns the live network, steps the optimizer once per
/// batch and snapshots the network into the ensemble after burn-in.
pub struct Trainer<O: Optimizer> {
    network: Network,
    optimizer: O,
    schedule: LearningRateSchedule,
    policy: EpochPolicy,
    batches: Vec<Batch>,
    query_points: Vec<f32>,
    step_count: usize,
}

impl<O: Optimizer> Trainer<O> {
    pub fn new(
        network: Network,
        optimizer: O,
        schedule: LearningRateSchedule,
        policy: EpochPolicy,
        batches: Vec<Batch>,
    ) -> SgldResult<Self> {
        policy.validate()?;
        if batches.is_empty() || batches.iter().any(|b| b.is_empty()) {
            return Err(SgldError::EmptyBatches);
        }
        for batch in &batches {
            if batch.inputs.ncols() != network.input_dim {
                return Err(SgldError::shape_mismatch(
                    "batch inputs",
                    &[batch.len(), network.input_dim],
                    batch.inputs.shape(),
                ));
            }
            if batch.targets.ncols() != network.output_dim || batch.targets.nrows() != batch.len()
            {
                return Err(SgldError::shape_mismatch(
                    "batch targets",
                    &[batch.len(), network.output_dim],
                    batch.targets.shape(),
                ));
            }
        }
        let num_steps = policy
            .num_epochs
            .checked_mul(batches.len())
            .ok_or_else(|| SgldError::InvalidSetting {
                name: "num_epochs",
                reason: format!(
                    "{} epochs of {} batches overflow the step counter",
                    policy.num_epochs,
                    batches.len()
                ),
            })?;
        schedule.ensure_covers(num_steps)?;
        Ok(Self {
            network,
            optimizer,
            schedule,
            policy,
            batches,
            query_points: Vec::new(),
            step_count: 0,
        })
    }

    /// Query points for the periodic evaluations during training. Without
    /// them no evaluation is recorded.
    pub fn with_query_points(mut self, query_points: Vec<f32>) -> Self {
        self.query_points = query_points;
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    #[time]
    pub fn run<R: Rng + ?Sized>(mut self, rng: &mut R) -> SgldResult<TrainingOutcome> {
        let mut ensemble = Ensemble::new();
        let mut epoch_losses = Vec::with_capacity(self.policy.num_epochs);
        let mut batch_losses = vec![Vec::new(); self.batches.len()];
        let mut evaluations = Vec::new();

        info!(
            "Training {} parameters for {} epochs of {} batches",
            self.network.num_parameters(),
            self.policy.num_epochs,
            self.batches.len()
        );
        for epoch in 1..=self.policy.num_epochs {
            let losses = self.run_epoch(rng)?;
            let epoch_loss = mean(&losses).ok_or(SgldError::EmptyBatches)?;
            epoch_losses.push(epoch_loss);
            debug!("Epoch: {:5}, Train loss = {:8.3}", epoch, epoch_loss);

            if self.policy.is_record_epoch(epoch) {
                for (history, loss) in batch_losses.iter_mut().zip(&losses) {
                    history.push(*loss);
                }
            }
            if epoch == self.policy.burnin_epochs {
                info!(
                    "Burn-in finished after {} epochs ({} steps)",
                    epoch, self.step_count
                );
            }
            if self.policy.is_snapshot_epoch(epoch) {
                let index = ensemble.push(&self.network, epoch);
                debug!(
                    "Snapshot {} taken at epoch {} (noise scale {:.4})",
                    index,
                    epoch,
                    self.network.noise_scale()
                );
            }
            if self.policy.is_eval_epoch(epoch) && !self.query_points.is_empty() {
                if ensemble.len() >= MIN_SNAPSHOTS {
                    evaluations.push(EvaluationRecord {
                        epoch,
                        num_snapshots: ensemble.len(),
                        estimates: ensemble.evaluate(&self.query_points)?,
                    });
                } else {
                    info!(
                        "Skipping evaluation at epoch {}: only {} snapshot(s)",
                        epoch,
                        ensemble.len()
                    );
                }
            }
        }
        info!(
            "Collected {} snapshots in {} steps",
            ensemble.len(),
            self.step_count
        );

        Ok(TrainingOutcome {
            ensemble,
            network: self.network,
            epoch_losses,
            batch_losses,
            evaluations,
            num_steps: self.step_count,
        })
    }

    /// One pass over every batch, returning the loss of each.
    fn run_epoch<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SgldResult<Vec<f32>> {
        let mut losses = Vec::with_capacity(self.batches.len());
        for batch in &self.batches {
            let learning_rate = self.schedule.get(self.step_count)?;

            self.optimizer.zero_grad(&mut self.network.parameters_mut());
            let loss = self
                .network
                .loss_and_backward(batch.inputs.view(), batch.targets.view())?;
            self.optimizer
                .step(&mut self.network.parameters_mut(), learning_rate, rng)?;

            self.step_count += 1;
            losses.push(loss);
        }
        Ok(losses)
    }
}
