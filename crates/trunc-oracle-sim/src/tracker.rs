//! Capping episode tracking.
//!
//! An episode starts with a capped update that follows an uncapped one and
//! ends with the next uncapped update.

use serde::{Deserialize, Serialize};
use trunc_oracle::ObservationOutcome;

/// Transition reported by [`CapEventTracker::observe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapEdge {
    Start,
    End,
}

/// One run of consecutive capped updates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapEpisode {
    pub started_at: u32,
    /// `None` while the episode is still running
    pub ended_at: Option<u32>,
    pub capped_updates: u32,
}

#[derive(Clone, Debug, Default)]
pub struct CapEventTracker {
    last_capped: bool,
    episodes: Vec<CapEpisode>,
    updates: u64,
    capped_updates: u64,
    cap_history: Vec<u32>,
}

impl CapEventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one recorded update
    pub fn observe(&mut self, outcome: &ObservationOutcome) -> Option<CapEdge> {
        self.updates += 1;
        self.cap_history.push(outcome.max_ticks_per_block);

        let edge = match (self.last_capped, outcome.capped) {
            (false, true) => {
                tracing::info!(timestamp = outcome.timestamp, ">> CAP event START");
                self.episodes.push(CapEpisode {
                    started_at: outcome.timestamp,
                    ended_at: None,
                    capped_updates: 0,
                });
                Some(CapEdge::Start)
            }
            (true, false) => {
                tracing::info!(timestamp = outcome.timestamp, ">> CAP event END");
                if let Some(episode) = self.episodes.last_mut() {
                    episode.ended_at = Some(outcome.timestamp);
                }
                Some(CapEdge::End)
            }
            _ => None,
        };

        if outcome.capped {
            self.capped_updates += 1;
            if let Some(episode) = self.episodes.last_mut() {
                episode.capped_updates += 1;
            }
        }
        self.last_capped = outcome.capped;
        edge
    }

    pub fn in_cap(&self) -> bool {
        self.last_capped
    }

    pub fn episodes(&self) -> &[CapEpisode] {
        &self.episodes
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn capped_updates(&self) -> u64 {
        self.capped_updates
    }

    /// Cap in force after each update
    pub fn cap_history(&self) -> &[u32] {
        &self.cap_history
    }
}
