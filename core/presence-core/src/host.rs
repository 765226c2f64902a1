//! Seams to the two external collaborators.
//!
//! The supervisor only ever talks to these traits, so the whole sync loop can
//! be driven by scripted fakes in tests.

use crate::error::{HostResult, PresenceResult};
use crate::types::{PresenceSnapshot, ProjectInfo, RenderJob, RenderJobStatus, TimelineInfo};

/// Queries against the running creative application.
///
/// Every query is scoped to the project that is current at call time; there
/// is no cached project handle to go stale.
pub trait HostApp {
    /// Establishes the scripting session.
    fn connect(&mut self) -> HostResult<()>;

    fn current_page(&mut self) -> HostResult<String>;

    /// `Ok(None)` when the application is up but no project is open.
    fn current_project(&mut self) -> HostResult<Option<ProjectInfo>>;

    fn current_timeline(&mut self) -> HostResult<Option<TimelineInfo>>;

    fn is_rendering(&mut self) -> HostResult<bool>;

    fn render_jobs(&mut self) -> HostResult<Vec<RenderJob>>;

    fn render_job_status(&mut self, job_id: &str) -> HostResult<RenderJobStatus>;
}

/// A session with the presence-broadcasting service.
pub trait PresenceClient {
    fn connect(&mut self) -> PresenceResult<()>;

    fn update(&mut self, snapshot: &PresenceSnapshot) -> PresenceResult<()>;

    fn clear(&mut self) -> PresenceResult<()>;

    fn close(&mut self) -> PresenceResult<()>;
}
