//! Edge-triggered render tracking.
//!
//! The host only reports "rendering right now: yes/no". The tracker turns the
//! polled level into Idle/Active transitions and pins the start time on the
//! rising edge so the elapsed timer does not restart every tick.

use crate::types::RenderState;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct RenderTracker {
    state: RenderState,
}

impl RenderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Feeds one polled render flag. At most one transition per call. An
    /// unknown flag (failed query) leaves the state untouched.
    pub fn observe(&mut self, render_active: Option<bool>, now: DateTime<Utc>) -> RenderState {
        let Some(render_active) = render_active else {
            debug!(state = ?self.state, "Render status unknown; holding state");
            return self.state;
        };
        self.state = match (self.state, render_active) {
            (RenderState::Idle, true) => {
                info!(started_at = %now, "Render started");
                RenderState::Active { started_at: now }
            }
            (RenderState::Active { started_at }, false) => {
                let elapsed_secs = now.signed_duration_since(started_at).num_seconds();
                info!(elapsed_secs, "Render completed");
                RenderState::Idle
            }
            (state, _) => state,
        };
        self.state
    }
}
