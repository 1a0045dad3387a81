#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    ShapeMismatch,
    Numerical,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SgldError {
    EmptyBatches,
    EmptySchedule,
    EnsembleTooSmall {
        size: usize,
    },
    InvalidBatchCount {
        num_batches: usize,
        num_samples: usize,
    },
    InvalidLearningRate {
        step: usize,
        value: f32,
    },
    InvalidSetting {
        name: &'static str,
        reason: String,
    },
    ScheduleExhausted {
        step: usize,
        len: usize,
    },
    ScheduleTooShort {
        required: usize,
        len: usize,
    },
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    NonFiniteGradient {
        parameter: &'static str,
    },
    NonFiniteLoss {
        value: f32,
    },
    Sampling {
        reason: String,
    },
}

impl SgldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SgldError::EmptyBatches
            | SgldError::EmptySchedule
            | SgldError::EnsembleTooSmall { .. }
            | SgldError::InvalidBatchCount { .. }
            | SgldError::InvalidLearningRate { .. }
            | SgldError::InvalidSetting { .. }
            | SgldError::ScheduleExhausted { .. }
            | SgldError::ScheduleTooShort { .. } => ErrorKind::Configuration,
            SgldError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            SgldError::NonFiniteGradient { .. }
            | SgldError::NonFiniteLoss { .. }
            | SgldError::Sampling { .. } => ErrorKind::Numerical,
        }
    }

    pub(crate) fn shape_mismatch(context: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        SgldError::ShapeMismatch {
            context,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

impl std::fmt::Display for SgldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SgldError::EmptyBatches => write!(f, "Training requires at least one non-empty batch"),
            SgldError::EmptySchedule => write!(f, "Learning rate schedule is empty"),
            SgldError::EnsembleTooSmall { size } => write!(
                f,
                "Ensemble has {} snapshot(s), at least 2 are required to estimate epistemic uncertainty",
                size
            ),
            SgldError::InvalidBatchCount {
                num_batches,
                num_samples,
            } => write!(
                f,
                "Cannot split {} samples into {} batches",
                num_samples, num_batches
            ),
            SgldError::InvalidLearningRate { step, value } => write!(
                f,
                "Learning rate '{}' at step {} is not a positive finite number",
                value, step
            ),
            SgldError::InvalidSetting { name, reason } => {
                write!(f, "Invalid setting '{}': {}", name, reason)
            }
            SgldError::ScheduleExhausted { step, len } => write!(
                f,
                "Learning rate requested for step {} but the schedule only has {} entries",
                step, len
            ),
            SgldError::ScheduleTooShort { required, len } => write!(
                f,
                "Learning rate schedule has {} entries but training takes {} steps",
                len, required
            ),
            SgldError::ShapeMismatch {
                context,
                expected,
                actual,
            } => write!(
                f,
                "Shape mismatch in {}. Expected: {:?}, Actual: {:?}",
                context, expected, actual
            ),
            SgldError::NonFiniteGradient { parameter } => {
                write!(f, "Gradient of '{}' is not finite", parameter)
            }
            SgldError::NonFiniteLoss { value } => write!(f, "Loss '{}' is not finite", value),
            SgldError::Sampling { reason } => write!(f, "Sampling failed: {}", reason),
        }
    }
}

impl std::error::Error for SgldError {}

pub type SgldResult<T> = std::result::Result<T, SgldError>;
