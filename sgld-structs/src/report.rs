use crate::serializable_struct_with_getters;
use serde::{Deserialize, Serialize};

serializable_struct_with_getters! {
    EstimateRecord {
        x: f32,
        mean: f32,
        aleatoric: f32,
        epistemic: f32,
        total: f32,
    }
}
serializable_struct_with_getters! {
    EvaluationReport {
        epoch: usize,
        num_snapshots: usize,
        estimates: Vec<EstimateRecord>,
    }
}
serializable_struct_with_getters! {
    RunReport {
        num_batches: usize,
        batch_size: usize,
        batches_per_epoch: usize,
        num_epochs: usize,
        num_steps: usize,
        num_snapshots: usize,
        final_log_noise: f32,
        record_period: usize,
        epoch_losses: Vec<f32>,
        batch_losses: Vec<Vec<f32>>,
        evaluations: Vec<EvaluationReport>,
        final_estimates: Vec<EstimateRecord>,
    }
}
serializable_struct_with_getters! {
    TrainingData {
        x: Vec<f32>,
        y: Vec<f32>,
    }
}
