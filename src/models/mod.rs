// Domain models

mod baseline;
mod evaluation;
mod record;
mod sample;
mod state;
mod weights;

pub use baseline::{Baseline, MR_LIMIT_FACTOR, XMR_LIMIT_FACTOR};
pub use evaluation::{Detection, EvaluationResult, Status, trailing_offsets};
pub use record::{CompositeRecord, EvaluationRecord, MonitorEvent};
pub use sample::{MetricKey, MetricName, Sample};
pub use state::PauseState;
pub use weights::Weights;
