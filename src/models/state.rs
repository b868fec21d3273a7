// Per-stream pause state (LIVE / PAUSED)

use serde::{Deserialize, Serialize};

/// Whether a stream is being scored or is collecting points for a new baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseState {
    pub paused: bool,
    pub points_collected_since_pause: u32,
}

impl PauseState {
    pub fn live() -> Self {
        Self::default()
    }

    pub fn is_live(&self) -> bool {
        !self.paused
    }
}
