//! Run loop and connection lifecycle.
//!
//! ```text
//! Disconnected → ConnectingService → ConnectingHost → Running → ShuttingDown → Terminated
//!                       │                  │              │
//!                       └→ Terminated      └──────────────┴→ ShuttingDown
//! ```
//!
//! Every exit path after the presence service connected funnels through
//! [`PresenceSession::cleanup`], which clears and closes at most once. The
//! session also cleans up on drop, so unwinding out of the loop still leaves
//! no dangling status behind.

use crate::change::should_publish;
use crate::config::{page_display, PresenceConfig};
use crate::error::{HostError, HostResult, PresenceError, PresenceResult};
use crate::host::{HostApp, PresenceClient};
use crate::render::RenderTracker;
use crate::sampler;
use crate::shutdown::ShutdownSignal;
use crate::snapshot;
use crate::types::{PresenceSnapshot, ProjectInfo, RawObservation, RenderState};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    ConnectingService,
    ConnectingHost,
    Running,
    ShuttingDown,
    Terminated,
}

/// Why the supervisor stopped. Maps onto the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Interrupt or terminate was received.
    ShutdownSignal,
    /// The host application or its project went away while running.
    HostClosed,
    /// The presence service could not be reached at startup.
    PresenceUnavailable,
    /// The host application (or an open project) was not available at startup.
    HostUnavailable,
}

impl ExitReason {
    pub fn exit_code(self) -> u8 {
        match self {
            ExitReason::ShutdownSignal | ExitReason::HostClosed => 0,
            ExitReason::PresenceUnavailable => 2,
            ExitReason::HostUnavailable => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    HostClosed,
}

/// Owns the presence client and guarantees the clear-and-close sequence
/// happens at most once, and only if a connection was established.
struct PresenceSession<P: PresenceClient> {
    client: P,
    live: bool,
    cleaned_up: bool,
}

impl<P: PresenceClient> PresenceSession<P> {
    fn new(client: P) -> Self {
        Self {
            client,
            live: false,
            cleaned_up: false,
        }
    }

    fn connect(&mut self) -> PresenceResult<()> {
        self.client.connect()?;
        self.live = true;
        Ok(())
    }

    fn publish(&mut self, snapshot: &PresenceSnapshot) -> PresenceResult<()> {
        if !self.live {
            return Err(PresenceError::NotConnected);
        }
        self.client.update(snapshot)
    }

    /// Returns true if this call performed the cleanup.
    fn cleanup(&mut self) -> bool {
        if self.cleaned_up {
            return false;
        }
        self.cleaned_up = true;
        if !self.live {
            return false;
        }
        self.live = false;

        info!("Clearing presence status");
        if let Err(err) = self.client.clear() {
            warn!(error = %err, "Failed to clear presence status");
        }
        match self.client.close() {
            Ok(()) => info!("Disconnected from presence service"),
            Err(err) => warn!(error = %err, "Failed to close presence connection"),
        }
        true
    }
}

impl<P: PresenceClient> Drop for PresenceSession<P> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

pub struct Supervisor<H: HostApp, P: PresenceClient> {
    config: PresenceConfig,
    host: H,
    presence: PresenceSession<P>,
    shutdown: ShutdownSignal,
    tracker: RenderTracker,
    last_published: Option<PresenceSnapshot>,
    process_started_at: Option<DateTime<Utc>>,
    phase: Phase,
    transitions: Vec<Phase>,
}

impl<H: HostApp, P: PresenceClient> Supervisor<H, P> {
    pub fn new(config: PresenceConfig, host: H, presence: P, shutdown: ShutdownSignal) -> Self {
        Self {
            config,
            host,
            presence: PresenceSession::new(presence),
            shutdown,
            tracker: RenderTracker::new(),
            last_published: None,
            process_started_at: None,
            phase: Phase::Disconnected,
            transitions: vec![Phase::Disconnected],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase entered so far, starting with `Disconnected`.
    pub fn transitions(&self) -> &[Phase] {
        &self.transitions
    }

    /// Runs the full lifecycle to completion. Consumes the supervisor so the
    /// lifecycle cannot be replayed.
    pub fn run(mut self) -> ExitReason {
        self.run_lifecycle()
    }

    fn run_lifecycle(&mut self) -> ExitReason {
        let reason = self.drive();
        if reason != ExitReason::PresenceUnavailable {
            self.enter(Phase::ShuttingDown);
            self.presence.cleanup();
        }
        self.enter(Phase::Terminated);
        info!(reason = ?reason, exit_code = reason.exit_code(), "Presence bridge stopped");
        reason
    }

    fn drive(&mut self) -> ExitReason {
        self.enter(Phase::ConnectingService);
        if let Err(err) = self.presence.connect() {
            error!(error = %err, "Failed to connect to presence service");
            return ExitReason::PresenceUnavailable;
        }
        info!("Connected to presence service");

        self.enter(Phase::ConnectingHost);
        let project = match self.connect_host() {
            Ok(project) => project,
            Err(err) => {
                error!(error = %err, "Failed to connect to host application");
                return ExitReason::HostUnavailable;
            }
        };
        info!(project = %project.name, "Connected to host application");

        self.process_started_at = Some(Utc::now());
        self.enter(Phase::Running);
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Presence sync running"
        );
        self.run_loop()
    }

    fn connect_host(&mut self) -> HostResult<ProjectInfo> {
        self.host.connect()?;
        self.host.current_project()?.ok_or(HostError::NoProject)
    }

    fn run_loop(&mut self) -> ExitReason {
        loop {
            if self.shutdown.is_triggered() {
                info!("Shutdown requested");
                return ExitReason::ShutdownSignal;
            }
            if self.poll_once() == TickOutcome::HostClosed {
                return ExitReason::HostClosed;
            }
            if self.shutdown.wait(self.config.poll_interval) {
                info!("Shutdown requested");
                return ExitReason::ShutdownSignal;
            }
        }
    }

    /// One tick: liveness check, sample, track, build, conditionally publish.
    pub fn poll_once(&mut self) -> TickOutcome {
        let project = match self.host.current_project() {
            Ok(Some(project)) => project,
            Ok(None) => {
                info!("Host project closed");
                return TickOutcome::HostClosed;
            }
            Err(err) => {
                info!(error = %err, "Host application unreachable");
                return TickOutcome::HostClosed;
            }
        };

        let observation = sampler::sample(&mut self.host, &project);
        let render = self.tracker.observe(observation.render_active, Utc::now());
        let process_started_at = *self.process_started_at.get_or_insert_with(Utc::now);
        let next = snapshot::build(&observation, render, process_started_at, &self.config);

        if !should_publish(&next, self.last_published.as_ref()) {
            debug!("Presence unchanged");
            return TickOutcome::Continue;
        }

        match self.presence.publish(&next) {
            Ok(()) => {
                log_published(&observation, render);
                self.last_published = Some(next);
            }
            Err(err) => {
                warn!(error = %err, "Failed to publish presence; retrying next tick");
            }
        }
        TickOutcome::Continue
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "Lifecycle transition");
        self.phase = phase;
        self.transitions.push(phase);
    }
}

fn log_published(observation: &RawObservation, render: RenderState) {
    if render.is_active() {
        match &observation.render_progress {
            Some(progress) => info!(
                percentage = progress.percentage,
                job = %progress.job_label,
                "Presence updated: rendering"
            ),
            None => info!("Presence updated: rendering"),
        }
        return;
    }
    let page = page_display(&observation.page)
        .map(|display| display.name)
        .unwrap_or(observation.page.as_str());
    info!(page, "Presence updated");
}
