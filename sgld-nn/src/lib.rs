pub mod data;
pub use data::{Batch, Dataset, GpSampler};
pub mod dense;
pub use dense::Dense;
pub mod ensemble;
pub use ensemble::{aggregate, Ensemble, Snapshot, UncertaintyEstimate, MIN_SNAPSHOTS};
pub mod error;
pub use error::{ErrorKind, SgldError, SgldResult};
pub mod loss;
pub use loss::{log_gaussian_loss, log_gaussian_loss_and_grad, LossGradient, HALF_LN_2PI};
pub mod network;
pub use network::{ForwardCache, Network};
pub mod optimizer;
pub use optimizer::Optimizer;
pub mod parameter;
pub use parameter::Parameter;
pub mod schedule;
pub use schedule::LearningRateSchedule;
pub mod trainer;
pub use trainer::{EpochPolicy, EvaluationRecord, Trainer, TrainingOutcome};
