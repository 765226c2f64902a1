//! Wire types shared by the presence daemon and its two peers.
//!
//! Two protocols live here:
//!
//! - **Discord IPC**: length-prefixed JSON frames exchanged with the local
//!   Discord client over a Unix socket.
//! - **Host bridge**: newline-delimited JSON request/response exchanged with
//!   the interpreter process that talks to DaVinci Resolve's scripting API.
//!
//! Keeping both schemas in one crate prevents drift between the daemon and
//! the bridge script, and keeps the daemon free of ad-hoc `json!` payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const IPC_VERSION: u32 = 1;
pub const FRAME_HEADER_BYTES: usize = 8;
pub const MAX_FRAME_BYTES: usize = 64 * 1024;
pub const MAX_BRIDGE_LINE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_ACTIVITY_TEXT_CHARS: usize = 128;

pub const CMD_SET_ACTIVITY: &str = "SET_ACTIVITY";
pub const EVT_READY: &str = "READY";
pub const EVT_ERROR: &str = "ERROR";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Discord IPC
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Opcode {
    Handshake = 0,
    Frame = 1,
    Close = 2,
    Ping = 3,
    Pong = 4,
}

impl Opcode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Opcode::Handshake),
            1 => Some(Opcode::Frame),
            2 => Some(Opcode::Close),
            3 => Some(Opcode::Ping),
            4 => Some(Opcode::Pong),
            _ => None,
        }
    }
}

/// Serializes `payload` into a complete frame: opcode and length as
/// little-endian `u32`, followed by the JSON body.
pub fn encode_frame<T: Serialize>(opcode: Opcode, payload: &T) -> Result<Vec<u8>, ErrorInfo> {
    let body = serde_json::to_vec(payload).map_err(|err| {
        ErrorInfo::new(
            "serialization_error",
            format!("failed to serialize frame: {}", err),
        )
    })?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(ErrorInfo::new(
            "frame_too_large",
            "frame exceeded maximum size",
        ));
    }

    let mut frame = Vec::with_capacity(FRAME_HEADER_BYTES + body.len());
    frame.extend_from_slice(&(opcode as u32).to_le_bytes());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decodes a frame header into its opcode and body length.
pub fn decode_header(header: [u8; FRAME_HEADER_BYTES]) -> Result<(Opcode, usize), ErrorInfo> {
    let raw_opcode = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let length = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

    let opcode = Opcode::from_u32(raw_opcode).ok_or_else(|| {
        ErrorInfo::new("invalid_opcode", format!("unknown opcode {}", raw_opcode))
    })?;
    if length > MAX_FRAME_BYTES {
        return Err(ErrorInfo::new(
            "frame_too_large",
            "frame exceeded maximum size",
        ));
    }
    Ok((opcode, length))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Handshake {
    pub v: u32,
    pub client_id: String,
}

impl Handshake {
    pub fn new(client_id: &str) -> Self {
        Self {
            v: IPC_VERSION,
            client_id: client_id.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Command<A> {
    pub cmd: String,
    pub args: A,
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetActivityArgs {
    pub pid: u32,
    /// `None` serializes as `null`, which clears the activity.
    pub activity: Option<Activity>,
}

pub fn set_activity(pid: u32, activity: Option<Activity>, nonce: String) -> Command<SetActivityArgs> {
    Command {
        cmd: CMD_SET_ACTIVITY.to_string(),
        args: SetActivityArgs { pid, activity },
        nonce,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Timestamps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<Assets>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_text: Option<String>,
}

impl Activity {
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        let texts = [
            ("details", self.details.as_deref()),
            ("state", self.state.as_deref()),
            (
                "large_text",
                self.assets.as_ref().and_then(|a| a.large_text.as_deref()),
            ),
            (
                "small_text",
                self.assets.as_ref().and_then(|a| a.small_text.as_deref()),
            ),
        ];
        for (field, value) in texts {
            if let Some(value) = value {
                if value.chars().count() > MAX_ACTIVITY_TEXT_CHARS {
                    return Err(ErrorInfo::new(
                        "text_too_long",
                        format!(
                            "{} must be {} characters or fewer",
                            field, MAX_ACTIVITY_TEXT_CHARS
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Truncates display text to the activity field limit.
pub fn clamp_text(value: &str) -> String {
    value.chars().take(MAX_ACTIVITY_TEXT_CHARS).collect()
}

/// Any frame received from Discord after the handshake.
#[derive(Debug, Deserialize, Serialize)]
pub struct IpcMessage {
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub evt: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl IpcMessage {
    pub fn is_ready(&self) -> bool {
        self.evt.as_deref() == Some(EVT_READY)
    }

    /// Returns the error carried by an `ERROR` event, if this is one.
    pub fn error_info(&self) -> Option<ErrorInfo> {
        if self.evt.as_deref() != Some(EVT_ERROR) {
            return None;
        }
        let data = self.data.as_ref();
        let code = data
            .and_then(|d| d.get("code"))
            .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = data
            .and_then(|d| d.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("Discord reported an error")
            .to_string();
        Some(ErrorInfo { code, message })
    }
}

/// Payload of a close frame sent by Discord (e.g. invalid client id).
#[derive(Debug, Deserialize, Serialize)]
pub struct ClosePayload {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Host bridge
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeMethod {
    CurrentPage,
    CurrentProject,
    CurrentTimeline,
    IsRendering,
    RenderJobs,
    RenderJobStatus,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeRequest {
    pub id: u64,
    pub method: BridgeMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub ok: bool,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// `current_project` data: absent when no project is open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectData {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineData {
    pub name: String,
    #[serde(default)]
    pub frame_rate: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderJobData {
    pub job_id: String,
    #[serde(default)]
    pub target_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderJobStatusData {
    #[serde(default)]
    pub job_status: Option<String>,
    #[serde(default)]
    pub completion_percentage: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenderJobStatusParams {
    pub job_id: String,
}
