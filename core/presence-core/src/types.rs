//! Data model shared by the sampler, builder, and supervisor.

use chrono::{DateTime, Utc};

// ─────────────────────────────────────────────────────────────────────────────
// Host-side values
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineInfo {
    pub name: String,
    /// As reported by the host setting, e.g. `"24"` or `"29.97"`.
    pub frame_rate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub job_id: String,
    pub target_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderJobStatus {
    pub job_status: Option<String>,
    pub completion_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderProgress {
    /// Whole percent, 0-100.
    pub percentage: u8,
    pub job_label: String,
}

/// One poll's worth of host state. Built fresh every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObservation {
    pub page: String,
    pub project_name: String,
    pub timeline: Option<TimelineInfo>,
    /// `None` when the render status query failed this tick.
    pub render_active: Option<bool>,
    pub render_progress: Option<RenderProgress>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Derived state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Active {
        started_at: DateTime<Utc>,
    },
}

impl RenderState {
    pub fn is_active(&self) -> bool {
        matches!(self, RenderState::Active { .. })
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RenderState::Idle => None,
            RenderState::Active { started_at } => Some(*started_at),
        }
    }
}

/// The status payload published to the presence service.
///
/// Equality is field-by-field; a snapshot that differs from the last
/// published one in any field (including `start_timestamp`) is republished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub details: String,
    pub state_text: Option<String>,
    pub large_image_key: String,
    pub large_image_text: String,
    pub small_image_key: Option<String>,
    pub small_image_text: Option<String>,
    /// Unix seconds.
    pub start_timestamp: Option<i64>,
}
