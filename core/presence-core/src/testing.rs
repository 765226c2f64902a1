//! Scripted collaborators for unit tests.

use crate::error::{HostError, HostResult, PresenceError, PresenceResult};
use crate::host::{HostApp, PresenceClient};
use crate::types::{
    PresenceSnapshot, ProjectInfo, RenderJob, RenderJobStatus, TimelineInfo,
};
use std::sync::{Arc, Mutex};

fn query_error(method: &str) -> HostError {
    HostError::Query {
        method: method.to_string(),
        code: "scripted".to_string(),
        message: "scripted failure".to_string(),
    }
}

/// Host whose answers are plain fields. `None` on a fallible field means the
/// query errors.
#[derive(Debug, Default)]
pub struct FakeHost {
    pub connect_error: bool,
    pub page: Option<String>,
    /// `None` means the application is up with no project open.
    pub project: Option<String>,
    /// After this many successful `current_project` calls, the query errors.
    pub project_error_after: Option<usize>,
    pub timeline: Option<TimelineInfo>,
    pub timeline_error: bool,
    pub rendering: Option<bool>,
    pub jobs: Option<Vec<(RenderJob, RenderJobStatus)>>,
    pub project_calls: usize,
}

impl FakeHost {
    pub fn open(project: &str) -> Self {
        Self {
            page: Some("edit".to_string()),
            project: Some(project.to_string()),
            rendering: Some(false),
            jobs: Some(Vec::new()),
            ..Self::default()
        }
    }
}

impl HostApp for FakeHost {
    fn connect(&mut self) -> HostResult<()> {
        if self.connect_error {
            return Err(HostError::BridgeClosed);
        }
        Ok(())
    }

    fn current_page(&mut self) -> HostResult<String> {
        self.page.clone().ok_or_else(|| query_error("current_page"))
    }

    fn current_project(&mut self) -> HostResult<Option<ProjectInfo>> {
        if let Some(limit) = self.project_error_after {
            if self.project_calls >= limit {
                return Err(query_error("current_project"));
            }
        }
        self.project_calls += 1;
        Ok(self.project.clone().map(|name| ProjectInfo { name }))
    }

    fn current_timeline(&mut self) -> HostResult<Option<TimelineInfo>> {
        if self.timeline_error {
            return Err(query_error("current_timeline"));
        }
        Ok(self.timeline.clone())
    }

    fn is_rendering(&mut self) -> HostResult<bool> {
        self.rendering.ok_or_else(|| query_error("is_rendering"))
    }

    fn render_jobs(&mut self) -> HostResult<Vec<RenderJob>> {
        self.jobs
            .as_ref()
            .map(|jobs| jobs.iter().map(|(job, _)| job.clone()).collect())
            .ok_or_else(|| query_error("render_jobs"))
    }

    fn render_job_status(&mut self, job_id: &str) -> HostResult<RenderJobStatus> {
        self.jobs
            .as_ref()
            .and_then(|jobs| jobs.iter().find(|(job, _)| job.job_id == job_id))
            .map(|(_, status)| status.clone())
            .ok_or_else(|| query_error("render_job_status"))
    }
}

#[derive(Debug, Default)]
pub struct PresenceLog {
    pub connects: usize,
    pub updates: Vec<PresenceSnapshot>,
    pub update_attempts: usize,
    pub clears: usize,
    pub closes: usize,
}

#[derive(Debug, Default)]
pub struct RecordingPresence {
    pub log: Arc<Mutex<PresenceLog>>,
    pub connect_error: bool,
    /// Number of upcoming `update` calls that fail.
    pub failing_updates: usize,
    pub clear_error: bool,
}

impl RecordingPresence {
    pub fn new() -> (Self, Arc<Mutex<PresenceLog>>) {
        let presence = Self::default();
        let log = Arc::clone(&presence.log);
        (presence, log)
    }
}

impl PresenceClient for RecordingPresence {
    fn connect(&mut self) -> PresenceResult<()> {
        if self.connect_error {
            return Err(PresenceError::SocketNotFound);
        }
        self.log.lock().expect("presence log").connects += 1;
        Ok(())
    }

    fn update(&mut self, snapshot: &PresenceSnapshot) -> PresenceResult<()> {
        let mut log = self.log.lock().expect("presence log");
        log.update_attempts += 1;
        if self.failing_updates > 0 {
            self.failing_updates -= 1;
            return Err(PresenceError::NotConnected);
        }
        log.updates.push(snapshot.clone());
        Ok(())
    }

    fn clear(&mut self) -> PresenceResult<()> {
        self.log.lock().expect("presence log").clears += 1;
        if self.clear_error {
            return Err(PresenceError::NotConnected);
        }
        Ok(())
    }

    fn close(&mut self) -> PresenceResult<()> {
        self.log.lock().expect("presence log").closes += 1;
        Ok(())
    }
}
