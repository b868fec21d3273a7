// Replays JSON-lines samples, grouped by consecutive (machine_id, timestamp).

use std::collections::VecDeque;
use std::path::Path;

use super::SampleSource;
use crate::models::Sample;

pub struct ReplaySource {
    groups: VecDeque<Vec<Sample>>,
}

impl ReplaySource {
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("replay file {}: {}", path.display(), e))?;
        let source = Self::parse(&content);
        tracing::info!(
            path = %path.display(),
            groups = source.remaining(),
            "replay source loaded"
        );
        Ok(source)
    }

    /// Parse JSON lines; blank lines are ignored and malformed lines skipped with a warning.
    pub fn parse(content: &str) -> Self {
        let mut groups: VecDeque<Vec<Sample>> = VecDeque::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let sample: Sample = match serde_json::from_str(line) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(line = idx + 1, error = %e, "malformed replay line skipped");
                    continue;
                }
            };
            match groups.back_mut() {
                Some(group)
                    if group.first().is_some_and(|first| {
                        first.machine_id == sample.machine_id && first.timestamp == sample.timestamp
                    }) =>
                {
                    group.push(sample)
                }
                _ => groups.push_back(vec![sample]),
            }
        }
        Self { groups }
    }

    pub fn remaining(&self) -> usize {
        self.groups.len()
    }
}

impl SampleSource for ReplaySource {
    async fn next_group(&mut self) -> anyhow::Result<Option<Vec<Sample>>> {
        Ok(self.groups.pop_front())
    }
}
