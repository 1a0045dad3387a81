use crate::serializable_struct_with_getters;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

serializable_struct_with_getters! {
    TrainingSettings {
        #[serde(default = "default_seed")]
        seed: String,
        #[serde(default = "default_num_units")]
        num_units: usize,
        #[serde(default)]
        init_log_noise: f32,
        #[serde(default = "default_weight_decay")]
        weight_decay: f32,
        #[serde(default)]
        learning_rate: LearningRateSettings,
        #[serde(default = "default_num_nets")]
        num_nets: usize,
        #[serde(default = "default_mix_epochs")]
        mix_epochs: usize,
        #[serde(default = "default_burnin_epochs")]
        burnin_epochs: usize,
        num_epochs: Option<usize>,
        #[serde(default = "default_num_batches")]
        num_batches: Vec<usize>,
        #[serde(default = "default_record_period")]
        record_period: usize,
        #[serde(default = "default_eval_period")]
        eval_period: usize,
        #[serde(default)]
        query_grid: QueryGridSettings,
        #[serde(default)]
        data: DataSettings,
    }
}
serializable_struct_with_getters! {
    LearningRateSettings {
        start: f32,
        end: f32,
    }
}
serializable_struct_with_getters! {
    QueryGridSettings {
        start: f32,
        end: f32,
        num_points: usize,
    }
}
serializable_struct_with_getters! {
    DataSettings {
        #[serde(default = "default_num_points")]
        num_points: usize,
        #[serde(default = "default_x_range")]
        x_range: (f32, f32),
        #[serde(default = "default_one")]
        lengthscale: f32,
        #[serde(default = "default_one")]
        variance: f32,
        #[serde(default = "default_noise_std")]
        noise_std: f32,
        #[serde(default = "default_margin")]
        margin: usize,
    }
}

fn default_seed() -> String {
    "sgld".to_string()
}
fn default_num_units() -> usize {
    200
}
fn default_weight_decay() -> f32 {
    1.0
}
fn default_num_nets() -> usize {
    100
}
fn default_mix_epochs() -> usize {
    100
}
fn default_burnin_epochs() -> usize {
    3000
}
fn default_num_batches() -> Vec<usize> {
    vec![7]
}
fn default_record_period() -> usize {
    2
}
fn default_eval_period() -> usize {
    500
}
fn default_num_points() -> usize {
    400
}
fn default_x_range() -> (f32, f32) {
    (-3.0, 3.0)
}
fn default_one() -> f32 {
    1.0
}
fn default_noise_std() -> f32 {
    0.3
}
fn default_margin() -> usize {
    75
}

impl Default for LearningRateSettings {
    fn default() -> Self {
        Self {
            start: 5e-5,
            end: 5e-5,
        }
    }
}

impl Default for QueryGridSettings {
    fn default() -> Self {
        Self {
            start: -5.0,
            end: 5.0,
            num_points: 200,
        }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            num_points: default_num_points(),
            x_range: default_x_range(),
            lengthscale: default_one(),
            variance: default_one(),
            noise_std: default_noise_std(),
            margin: default_margin(),
        }
    }
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            num_units: default_num_units(),
            init_log_noise: 0.0,
            weight_decay: default_weight_decay(),
            learning_rate: LearningRateSettings::default(),
            num_nets: default_num_nets(),
            mix_epochs: default_mix_epochs(),
            burnin_epochs: default_burnin_epochs(),
            num_epochs: None,
            num_batches: default_num_batches(),
            record_period: default_record_period(),
            eval_period: default_eval_period(),
            query_grid: QueryGridSettings::default(),
            data: DataSettings::default(),
        }
    }
}

impl TrainingSettings {
    /// Total number of epochs: explicit `num_epochs`, otherwise enough epochs
    /// to collect `num_nets` snapshots after burn-in.
    pub fn epochs(&self) -> Result<usize> {
        match self.num_epochs {
            Some(num_epochs) => Ok(num_epochs),
            None => self
                .mix_epochs
                .checked_mul(self.num_nets)
                .and_then(|mixing| mixing.checked_add(self.burnin_epochs))
                .ok_or_else(|| {
                    anyhow!(
                        "mix_epochs ({}) * num_nets ({}) + burnin_epochs ({}) overflows",
                        self.mix_epochs,
                        self.num_nets,
                        self.burnin_epochs
                    )
                }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_units == 0 {
            return Err(anyhow!("num_units must be greater than 0"));
        }
        if self.mix_epochs == 0 {
            return Err(anyhow!("mix_epochs must be greater than 0"));
        }
        if self.epochs()? == 0 {
            return Err(anyhow!("num_epochs must be greater than 0"));
        }
        if self.record_period == 0 || self.eval_period == 0 {
            return Err(anyhow!("record_period and eval_period must be greater than 0"));
        }
        if self.num_batches.is_empty() {
            return Err(anyhow!("num_batches must list at least one batch count"));
        }
        if self.num_batches.contains(&0) {
            return Err(anyhow!("num_batches entries must be greater than 0"));
        }
        let LearningRateSettings { start, end } = self.learning_rate;
        if !(start > 0.0 && end > 0.0 && start.is_finite() && end.is_finite()) {
            return Err(anyhow!(
                "Learning rates must be positive and finite, got start={} end={}",
                start,
                end
            ));
        }
        if !(self.weight_decay >= 0.0 && self.weight_decay.is_finite()) {
            return Err(anyhow!(
                "weight_decay must be non-negative, got {}",
                self.weight_decay
            ));
        }
        if !self.init_log_noise.is_finite() {
            return Err(anyhow!("init_log_noise must be finite"));
        }
        if self.query_grid.num_points == 0 {
            return Err(anyhow!("query_grid.num_points must be greater than 0"));
        }
        self.data.validate()
    }
}

impl DataSettings {
    pub fn num_train_points(&self) -> usize {
        self.num_points.saturating_sub(2 * self.margin)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_train_points() == 0 {
            return Err(anyhow!(
                "data.margin ({}) leaves no training points out of {}",
                self.margin,
                self.num_points
            ));
        }
        if !(self.x_range.0 < self.x_range.1) {
            return Err(anyhow!(
                "data.x_range must be increasing, got {:?}",
                self.x_range
            ));
        }
        if !(self.lengthscale > 0.0 && self.variance > 0.0 && self.noise_std > 0.0) {
            return Err(anyhow!(
                "data.lengthscale, data.variance and data.noise_std must be positive"
            ));
        }
        Ok(())
    }
}
