// SPC core: XmR baselines, pattern tests, pause/recalculation and scoring.
// Pure computation; no I/O and no async.

pub mod baseline;
pub mod history;
pub mod rules;
pub mod score;
pub mod state;

pub use history::History;
pub use score::{MetricScores, aggregate};
pub use state::{PauseRecalcStateMachine, StepOutcome, StreamState, Transition};
