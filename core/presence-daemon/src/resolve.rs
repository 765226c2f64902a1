//! DaVinci Resolve adapter.
//!
//! Resolve only exposes its scripting API to Python and Lua, so the daemon
//! runs a small Python bridge (embedded from `bridge/resolve_bridge.py`) as a
//! child process and talks to it with newline-delimited JSON. The child's
//! stdout is drained by a reader thread so each request can wait with a
//! timeout instead of blocking forever on a hung host.

use presence_core::{
    HostApp, HostError, HostResult, ProjectInfo, RenderJob, RenderJobStatus, TimelineInfo,
};
use resolve_presence_protocol::{
    BridgeMethod, BridgeRequest, BridgeResponse, ProjectData, RenderJobData, RenderJobStatusData,
    RenderJobStatusParams, TimelineData, MAX_BRIDGE_LINE_BYTES,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::env;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const BRIDGE_SCRIPT: &str = include_str!("../bridge/resolve_bridge.py");
const PYTHON_ENV: &str = "RESOLVE_PRESENCE_PYTHON";
const SCRIPT_API_ENV: &str = "RESOLVE_SCRIPT_API";
const SCRIPT_LIB_ENV: &str = "RESOLVE_SCRIPT_LIB";
const DEFAULT_PYTHON: &str = "python3";
const DEFAULT_SCRIPT_API: &str = "/opt/resolve/Developer/Scripting";
const DEFAULT_SCRIPT_LIB: &str = "/opt/resolve/libs/Fusion/fusionscript.so";
const READY_TIMEOUT_SECS: u64 = 20;
const REQUEST_TIMEOUT_SECS: u64 = 5;
const READY_ID: u64 = 0;

/// How to launch the bridge process.
#[derive(Debug, Clone)]
pub struct BridgeCommand {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl BridgeCommand {
    pub fn from_env() -> Self {
        let program = env::var(PYTHON_ENV).unwrap_or_else(|_| DEFAULT_PYTHON.to_string());
        let script_api =
            env::var(SCRIPT_API_ENV).unwrap_or_else(|_| DEFAULT_SCRIPT_API.to_string());
        let script_lib =
            env::var(SCRIPT_LIB_ENV).unwrap_or_else(|_| DEFAULT_SCRIPT_LIB.to_string());
        Self {
            program,
            args: vec!["-u".to_string(), "-c".to_string(), BRIDGE_SCRIPT.to_string()],
            envs: vec![
                (SCRIPT_API_ENV.to_string(), script_api),
                (SCRIPT_LIB_ENV.to_string(), script_lib),
            ],
        }
    }
}

struct BridgeProcess {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<std::io::Result<String>>,
}

impl Drop for BridgeProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub struct ResolveBridge {
    command: BridgeCommand,
    process: Option<BridgeProcess>,
    next_id: u64,
    ready_timeout: Duration,
    request_timeout: Duration,
}

impl ResolveBridge {
    pub fn new(command: BridgeCommand) -> Self {
        Self {
            command,
            process: None,
            next_id: READY_ID,
            ready_timeout: Duration::from_secs(READY_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    #[cfg(test)]
    fn with_timeouts(mut self, ready: Duration, request: Duration) -> Self {
        self.ready_timeout = ready;
        self.request_timeout = request;
        self
    }

    fn spawn(&self) -> HostResult<BridgeProcess> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .envs(self.command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| HostError::Spawn {
                command: self.command.program.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| HostError::Protocol("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| HostError::Protocol("bridge stdout unavailable".to_string()))?;

        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        });

        Ok(BridgeProcess {
            child,
            stdin,
            lines,
        })
    }

    /// Waits for the response carrying `id`, discarding late answers to
    /// earlier requests that timed out.
    fn await_response(&mut self, id: u64, method: &str, timeout: Duration) -> HostResult<Value> {
        let process = self.process.as_mut().ok_or(HostError::BridgeClosed)?;
        loop {
            let line = match process.lines.recv_timeout(timeout) {
                Ok(Ok(line)) => line,
                Ok(Err(source)) => {
                    return Err(HostError::Io {
                        context: "reading bridge output".to_string(),
                        source,
                    })
                }
                Err(RecvTimeoutError::Timeout) => return Err(HostError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(HostError::BridgeClosed),
            };
            match decode_response(&line, id, method)? {
                Some(data) => return Ok(data),
                None => debug!(line = %line, "Discarding stale bridge response"),
            }
        }
    }

    fn request(&mut self, method: BridgeMethod, params: Option<Value>) -> HostResult<Value> {
        let label = method_label(method);
        let result = self.send_and_await(method, params, &label);
        if matches!(
            result,
            Err(HostError::BridgeClosed) | Err(HostError::Io { .. })
        ) {
            // The child is gone or its pipes are broken; later calls fail fast.
            self.process = None;
        }
        result
    }

    fn send_and_await(
        &mut self,
        method: BridgeMethod,
        params: Option<Value>,
        label: &str,
    ) -> HostResult<Value> {
        self.next_id += 1;
        let id = self.next_id;
        let request = BridgeRequest { id, method, params };
        let mut line = serde_json::to_vec(&request).map_err(|source| HostError::Json {
            context: format!("encoding {} request", label),
            source,
        })?;
        line.push(b'\n');

        let process = self.process.as_mut().ok_or(HostError::BridgeClosed)?;
        process
            .stdin
            .write_all(&line)
            .and_then(|_| process.stdin.flush())
            .map_err(|source| HostError::Io {
                context: format!("writing {} request", label),
                source,
            })?;

        let timeout = self.request_timeout;
        self.await_response(id, label, timeout)
    }

    fn query<T: DeserializeOwned>(
        &mut self,
        method: BridgeMethod,
        params: Option<Value>,
    ) -> HostResult<T> {
        let data = self.request(method, params)?;
        serde_json::from_value(data).map_err(|source| HostError::Json {
            context: format!("decoding {} data", method_label(method)),
            source,
        })
    }
}

/// Parses one bridge line. `Ok(None)` means the line answers a different
/// request or is not a response at all (stray output from Resolve's
/// scripting module shares the bridge's stdout).
fn decode_response(line: &str, expected_id: u64, method: &str) -> HostResult<Option<Value>> {
    if line.len() > MAX_BRIDGE_LINE_BYTES {
        return Err(HostError::Protocol(
            "bridge response exceeded maximum size".to_string(),
        ));
    }
    let response: BridgeResponse = match serde_json::from_str(line.trim()) {
        Ok(response) => response,
        Err(err) => {
            warn!(method, error = %err, line = %line, "Skipping non-response bridge output");
            return Ok(None);
        }
    };
    if response.id != Some(expected_id) {
        return Ok(None);
    }
    if response.ok {
        return Ok(Some(response.data.unwrap_or(Value::Null)));
    }
    let (code, message) = response
        .error
        .map(|err| (err.code, err.message))
        .unwrap_or_else(|| ("unknown".to_string(), "bridge reported failure".to_string()));
    Err(HostError::Query {
        method: method.to_string(),
        code,
        message,
    })
}

fn method_label(method: BridgeMethod) -> String {
    serde_json::to_value(method)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", method))
}

impl HostApp for ResolveBridge {
    fn connect(&mut self) -> HostResult<()> {
        self.process = Some(self.spawn()?);
        let timeout = self.ready_timeout;
        match self.await_response(READY_ID, "ready", timeout) {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(error = %err, "Resolve bridge failed to become ready");
                self.process = None;
                Err(err)
            }
        }
    }

    fn current_page(&mut self) -> HostResult<String> {
        self.query(BridgeMethod::CurrentPage, None)
    }

    fn current_project(&mut self) -> HostResult<Option<ProjectInfo>> {
        let project: Option<ProjectData> = self.query(BridgeMethod::CurrentProject, None)?;
        Ok(project.map(|data| ProjectInfo { name: data.name }))
    }

    fn current_timeline(&mut self) -> HostResult<Option<TimelineInfo>> {
        let timeline: Option<TimelineData> = self.query(BridgeMethod::CurrentTimeline, None)?;
        Ok(timeline.map(|data| TimelineInfo {
            name: data.name,
            frame_rate: data.frame_rate,
        }))
    }

    fn is_rendering(&mut self) -> HostResult<bool> {
        self.query(BridgeMethod::IsRendering, None)
    }

    fn render_jobs(&mut self) -> HostResult<Vec<RenderJob>> {
        let jobs: Vec<RenderJobData> = self.query(BridgeMethod::RenderJobs, None)?;
        Ok(jobs
            .into_iter()
            .map(|job| RenderJob {
                job_id: job.job_id,
                target_dir: job.target_dir,
            })
            .collect())
    }

    fn render_job_status(&mut self, job_id: &str) -> HostResult<RenderJobStatus> {
        let params = serde_json::to_value(RenderJobStatusParams {
            job_id: job_id.to_string(),
        })
        .map_err(|source| HostError::Json {
            context: "encoding render_job_status params".to_string(),
            source,
        })?;
        let status: RenderJobStatusData =
            self.query(BridgeMethod::RenderJobStatus, Some(params))?;
        Ok(RenderJobStatus {
            job_status: status.job_status,
            completion_percentage: status.completion_percentage,
        })
    }
}
