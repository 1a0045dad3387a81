use crate::error::{SgldError, SgldResult};
use log::warn;
use sgld_utils::linspace;

/// One learning rate per optimizer step.
///
/// Rates should decay towards zero for the chain to sample the posterior. A
/// schedule that increases is accepted but logged.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningRateSchedule {
    rates: Vec<f32>,
}

impl LearningRateSchedule {
    pub fn new(rates: Vec<f32>) -> SgldResult<Self> {
        if rates.is_empty() {
            return Err(SgldError::EmptySchedule);
        }
        if let Some((step, value)) = rates
            .iter()
            .enumerate()
            .find(|(_, lr)| !(**lr > 0.0 && lr.is_finite()))
        {
            return Err(SgldError::InvalidLearningRate {
                step,
                value: *value,
            });
        }
        if let Some(step) = rates.windows(2).position(|w| w[1] > w[0]) {
            warn!(
                "Learning rate schedule increases at step {} ({} -> {})",
                step + 1,
                rates[step],
                rates[step + 1]
            );
        }
        Ok(Self { rates })
    }

    /// `num_steps` rates spaced linearly from `start` to `end`.
    pub fn linear(start: f32, end: f32, num_steps: usize) -> SgldResult<Self> {
        Self::new(linspace(start, end, num_steps))
    }

    pub fn constant(learning_rate: f32, num_steps: usize) -> SgldResult<Self> {
        Self::new(vec![learning_rate; num_steps])
    }

    pub fn get(&self, step: usize) -> SgldResult<f32> {
        self.rates
            .get(step)
            .copied()
            .ok_or(SgldError::ScheduleExhausted {
                step,
                len: self.rates.len(),
            })
    }

    pub fn ensure_covers(&self, required_steps: usize) -> SgldResult<()> {
        if self.rates.len() < required_steps {
            return Err(SgldError::ScheduleTooShort {
                required: required_steps,
                len: self.rates.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn rates(&self) -> &[f32] {
        &self.rates
    }
}
