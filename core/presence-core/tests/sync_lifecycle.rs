//! Integration tests driving the supervisor end to end with scripted
//! collaborators.

use presence_core::{
    ExitReason, HostApp, HostError, HostResult, PresenceClient, PresenceConfig, PresenceResult,
    PresenceSnapshot, ProjectInfo, RenderJob, RenderJobStatus, ShutdownSignal, Supervisor,
    TimelineInfo,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Connect,
    Update(PresenceSnapshot),
    Clear,
    Close,
}

#[derive(Clone, Default)]
struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().expect("call log").push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.0.lock().expect("call log").clone()
    }

    fn updates(&self) -> Vec<PresenceSnapshot> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Update(snapshot) => Some(snapshot),
                _ => None,
            })
            .collect()
    }

    fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|call| *call == wanted).count()
    }
}

struct LoggingPresence {
    log: CallLog,
}

impl PresenceClient for LoggingPresence {
    fn connect(&mut self) -> PresenceResult<()> {
        self.log.push(Call::Connect);
        Ok(())
    }

    fn update(&mut self, snapshot: &PresenceSnapshot) -> PresenceResult<()> {
        self.log.push(Call::Update(snapshot.clone()));
        Ok(())
    }

    fn clear(&mut self) -> PresenceResult<()> {
        self.log.push(Call::Clear);
        Ok(())
    }

    fn close(&mut self) -> PresenceResult<()> {
        self.log.push(Call::Close);
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct HostState {
    page: String,
    project_open: bool,
    reachable: bool,
    timeline: Option<String>,
    rendering: bool,
    percentage: f64,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            page: "edit".to_string(),
            project_open: true,
            reachable: true,
            timeline: None,
            rendering: false,
            percentage: 0.0,
        }
    }
}

#[derive(Clone, Default)]
struct SharedHost(Arc<Mutex<HostState>>);

impl SharedHost {
    fn update(&self, apply: impl FnOnce(&mut HostState)) {
        apply(&mut self.0.lock().expect("host state"));
    }

    fn state(&self) -> HostState {
        self.0.lock().expect("host state").clone()
    }
}

fn unreachable() -> HostError {
    HostError::BridgeClosed
}

impl HostApp for SharedHost {
    fn connect(&mut self) -> HostResult<()> {
        Ok(())
    }

    fn current_page(&mut self) -> HostResult<String> {
        Ok(self.state().page)
    }

    fn current_project(&mut self) -> HostResult<Option<ProjectInfo>> {
        let state = self.state();
        if !state.reachable {
            return Err(unreachable());
        }
        Ok(state.project_open.then(|| ProjectInfo {
            name: "Feature Film".to_string(),
        }))
    }

    fn current_timeline(&mut self) -> HostResult<Option<TimelineInfo>> {
        Ok(self.state().timeline.map(|name| TimelineInfo {
            name,
            frame_rate: Some("24".to_string()),
        }))
    }

    fn is_rendering(&mut self) -> HostResult<bool> {
        Ok(self.state().rendering)
    }

    fn render_jobs(&mut self) -> HostResult<Vec<RenderJob>> {
        Ok(vec![RenderJob {
            job_id: "job-1".to_string(),
            target_dir: Some("/renders".to_string()),
        }])
    }

    fn render_job_status(&mut self, _job_id: &str) -> HostResult<RenderJobStatus> {
        Ok(RenderJobStatus {
            job_status: Some("Rendering".to_string()),
            completion_percentage: Some(self.state().percentage),
        })
    }
}

fn config() -> PresenceConfig {
    PresenceConfig {
        poll_interval: Duration::from_millis(5),
        ..PresenceConfig::default()
    }
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("condition not met within {:?}", timeout);
}

/// Runs the supervisor on a background thread and returns handles to steer it.
fn spawn_supervisor(
    host: SharedHost,
) -> (CallLog, ShutdownSignal, thread::JoinHandle<ExitReason>) {
    let log = CallLog::default();
    let shutdown = ShutdownSignal::new();
    let presence = LoggingPresence { log: log.clone() };
    let supervisor = Supervisor::new(config(), host, presence, shutdown.clone());
    let handle = thread::spawn(move || supervisor.run());
    (log, shutdown, handle)
}

#[test]
fn steady_state_publishes_once_then_signal_cleans_up() {
    let host = SharedHost::default();
    let (log, shutdown, handle) = spawn_supervisor(host);

    wait_until(Duration::from_secs(5), || log.updates().len() == 1);
    // Give the loop several more ticks with nothing changing.
    thread::sleep(Duration::from_millis(50));
    shutdown.trigger();

    assert_eq!(handle.join().expect("join"), ExitReason::ShutdownSignal);
    let calls = log.calls();
    assert_eq!(calls.first(), Some(&Call::Connect));
    assert_eq!(log.updates().len(), 1);
    assert_eq!(log.count(&Call::Clear), 1);
    assert_eq!(log.count(&Call::Close), 1);
    assert_eq!(&calls[calls.len() - 2..], &[Call::Clear, Call::Close]);
}

#[test]
fn host_closing_mid_run_shuts_down_and_cleans_up_once() {
    let host = SharedHost::default();
    let (log, _shutdown, handle) = spawn_supervisor(host.clone());

    wait_until(Duration::from_secs(5), || !log.updates().is_empty());
    host.update(|state| state.reachable = false);

    assert_eq!(handle.join().expect("join"), ExitReason::HostClosed);
    assert_eq!(log.count(&Call::Clear), 1);
    assert_eq!(log.count(&Call::Close), 1);
    assert_eq!(log.calls().last(), Some(&Call::Close));
}

#[test]
fn project_closing_mid_run_counts_as_host_closed() {
    let host = SharedHost::default();
    let (log, _shutdown, handle) = spawn_supervisor(host.clone());

    wait_until(Duration::from_secs(5), || !log.updates().is_empty());
    host.update(|state| state.project_open = false);

    assert_eq!(handle.join().expect("join"), ExitReason::HostClosed);
    assert_eq!(log.count(&Call::Clear), 1);
}

#[test]
fn render_lifecycle_is_reflected_in_published_snapshots() {
    let host = SharedHost::default();
    host.update(|state| {
        state.page = "edit".to_string();
        state.timeline = Some("Sequence01".to_string());
    });
    let (log, shutdown, handle) = spawn_supervisor(host.clone());

    wait_until(Duration::from_secs(5), || log.updates().len() == 1);
    host.update(|state| {
        state.rendering = true;
        state.percentage = 45.0;
    });
    wait_until(Duration::from_secs(5), || log.updates().len() == 2);
    host.update(|state| state.rendering = false);
    wait_until(Duration::from_secs(5), || log.updates().len() == 3);
    shutdown.trigger();
    handle.join().expect("join");

    let updates = log.updates();
    assert_eq!(
        updates[0].state_text.as_deref(),
        Some("Edit | Timeline: Sequence01")
    );
    assert_eq!(updates[0].details, "Project: Feature Film");

    assert_eq!(
        updates[1].state_text.as_deref(),
        Some("Rendering: 45% complete")
    );
    assert_eq!(updates[1].small_image_key.as_deref(), Some("render_icon"));

    // Back to idle: page text returns, timer returns to process start.
    assert_eq!(updates[2], updates[0]);
}
