//! Discord Rich Presence over the local IPC socket.
//!
//! The desktop client listens on `discord-ipc-{0..9}` inside the runtime or
//! temp directory (or a Flatpak/Snap subdirectory of it). Each message is a
//! little-endian opcode and length followed by a JSON body.

use presence_core::{PresenceClient, PresenceError, PresenceResult, PresenceSnapshot};
use resolve_presence_protocol::{
    clamp_text, decode_header, encode_frame, set_activity, Activity, Assets, ClosePayload,
    ErrorInfo, Handshake, IpcMessage, Opcode, Timestamps, FRAME_HEADER_BYTES,
};
use serde::Serialize;
use std::env;
use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const SOCKET_PREFIX: &str = "discord-ipc-";
const SOCKET_SLOTS: u8 = 10;
const SOCKET_SUBDIRS: [&str; 3] = ["", "app/com.discordapp.Discord", "snap.discord"];
const TEMP_DIR_ENVS: [&str; 3] = ["TMPDIR", "TMP", "TEMP"];
const FALLBACK_TEMP_DIR: &str = "/tmp";
const READ_TIMEOUT_MS: u64 = 3_000;
const WRITE_TIMEOUT_MS: u64 = 3_000;
/// Upper bound on unrelated frames skipped while waiting for a reply.
const MAX_FRAMES_PER_REPLY: usize = 16;

pub struct DiscordIpcClient {
    client_id: String,
    socket_path: Option<PathBuf>,
    stream: Option<UnixStream>,
    pid: u32,
}

impl DiscordIpcClient {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            socket_path: None,
            stream: None,
            pid: std::process::id(),
        }
    }

    /// Pins the client to one socket instead of searching the usual places.
    pub fn with_socket(client_id: &str, path: PathBuf) -> Self {
        Self {
            socket_path: Some(path),
            ..Self::new(client_id)
        }
    }

    fn open_stream(&self) -> PresenceResult<UnixStream> {
        let candidates = match &self.socket_path {
            Some(path) => vec![path.clone()],
            None => candidate_socket_paths(),
        };
        for path in candidates {
            match UnixStream::connect(&path) {
                Ok(stream) => {
                    debug!(path = %path.display(), "Connected to Discord IPC socket");
                    configure_timeouts(&stream)?;
                    return Ok(stream);
                }
                Err(err) => {
                    if path.exists() {
                        debug!(path = %path.display(), error = %err, "Discord IPC socket refused");
                    }
                }
            }
        }
        Err(PresenceError::SocketNotFound)
    }

    fn send<T: Serialize>(&mut self, opcode: Opcode, payload: &T) -> PresenceResult<()> {
        let frame = encode_frame(opcode, payload).map_err(protocol_error)?;
        let stream = self.stream.as_mut().ok_or(PresenceError::NotConnected)?;
        stream
            .write_all(&frame)
            .and_then(|_| stream.flush())
            .map_err(|source| PresenceError::Io {
                context: "writing IPC frame".to_string(),
                source,
            })
    }

    fn recv(&mut self) -> PresenceResult<(Opcode, Vec<u8>)> {
        let stream = self.stream.as_mut().ok_or(PresenceError::NotConnected)?;
        let mut header = [0u8; FRAME_HEADER_BYTES];
        stream
            .read_exact(&mut header)
            .map_err(|source| PresenceError::Io {
                context: "reading IPC frame header".to_string(),
                source,
            })?;
        let (opcode, length) = decode_header(header).map_err(protocol_error)?;
        let mut body = vec![0u8; length];
        stream
            .read_exact(&mut body)
            .map_err(|source| PresenceError::Io {
                context: "reading IPC frame body".to_string(),
                source,
            })?;
        Ok((opcode, body))
    }

    /// Reads until a data frame arrives, answering pings along the way.
    fn recv_message(&mut self) -> PresenceResult<IpcMessage> {
        for _ in 0..MAX_FRAMES_PER_REPLY {
            let (opcode, body) = self.recv()?;
            match opcode {
                Opcode::Frame => return parse_json(&body, "IPC message"),
                Opcode::Ping => {
                    let payload: serde_json::Value = parse_json(&body, "ping")?;
                    self.send(Opcode::Pong, &payload)?;
                }
                Opcode::Close => {
                    let close: ClosePayload = parse_json(&body, "close frame")?;
                    self.stream = None;
                    return Err(PresenceError::ConnectionClosed {
                        code: close
                            .code
                            .map(|code| code.to_string())
                            .unwrap_or_else(|| "closed".to_string()),
                        message: close
                            .message
                            .unwrap_or_else(|| "Discord closed the connection".to_string()),
                    });
                }
                Opcode::Handshake | Opcode::Pong => {}
            }
        }
        Err(PresenceError::Protocol(
            "no reply from Discord within frame budget".to_string(),
        ))
    }

    fn send_activity(&mut self, activity: Option<Activity>) -> PresenceResult<()> {
        let nonce = ulid::Ulid::new().to_string();
        let command = set_activity(self.pid, activity, nonce.clone());
        self.send(Opcode::Frame, &command)?;

        for _ in 0..MAX_FRAMES_PER_REPLY {
            let message = self.recv_message()?;
            if message.nonce.as_deref() != Some(nonce.as_str()) {
                debug!(evt = ?message.evt, "Skipping unrelated IPC message");
                continue;
            }
            if let Some(err) = message.error_info() {
                return Err(PresenceError::CommandRejected {
                    code: err.code,
                    message: err.message,
                });
            }
            return Ok(());
        }
        Err(PresenceError::Protocol(
            "no reply to SET_ACTIVITY within frame budget".to_string(),
        ))
    }
}

impl PresenceClient for DiscordIpcClient {
    fn connect(&mut self) -> PresenceResult<()> {
        self.stream = Some(self.open_stream()?);
        let handshake = Handshake::new(&self.client_id);
        self.send(Opcode::Handshake, &handshake)?;

        let message = match self.recv_message() {
            Ok(message) => message,
            Err(PresenceError::ConnectionClosed { code, message }) => {
                self.stream = None;
                return Err(PresenceError::HandshakeRejected { code, message });
            }
            Err(err) => {
                self.stream = None;
                return Err(err);
            }
        };
        if let Some(err) = message.error_info() {
            self.stream = None;
            return Err(PresenceError::HandshakeRejected {
                code: err.code,
                message: err.message,
            });
        }
        if !message.is_ready() {
            self.stream = None;
            return Err(PresenceError::Protocol(format!(
                "expected READY, got {:?}",
                message.evt
            )));
        }
        Ok(())
    }

    fn update(&mut self, snapshot: &PresenceSnapshot) -> PresenceResult<()> {
        let activity = activity_from_snapshot(snapshot);
        activity.validate().map_err(protocol_error)?;
        self.send_activity(Some(activity))
    }

    fn clear(&mut self) -> PresenceResult<()> {
        self.send_activity(None)
    }

    fn close(&mut self) -> PresenceResult<()> {
        let result = self.send(Opcode::Close, &serde_json::json!({}));
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        result
    }
}

pub fn activity_from_snapshot(snapshot: &PresenceSnapshot) -> Activity {
    Activity {
        details: Some(clamp_text(&snapshot.details)),
        state: snapshot.state_text.as_deref().map(clamp_text),
        timestamps: snapshot.start_timestamp.map(|start| Timestamps { start: Some(start) }),
        assets: Some(Assets {
            large_image: Some(snapshot.large_image_key.clone()),
            large_text: Some(clamp_text(&snapshot.large_image_text)),
            small_image: snapshot.small_image_key.clone(),
            small_text: snapshot.small_image_text.as_deref().map(clamp_text),
        }),
    }
}

/// Every place a Discord client may have put its socket, in search order.
pub fn candidate_socket_paths() -> Vec<PathBuf> {
    let mut bases: Vec<PathBuf> = Vec::new();
    if let Some(runtime) = dirs::runtime_dir() {
        bases.push(runtime);
    }
    for name in TEMP_DIR_ENVS {
        if let Ok(value) = env::var(name) {
            if !value.trim().is_empty() {
                bases.push(PathBuf::from(value));
            }
        }
    }
    bases.push(PathBuf::from(FALLBACK_TEMP_DIR));
    bases.dedup();

    let mut paths = Vec::new();
    for base in &bases {
        for subdir in SOCKET_SUBDIRS {
            let dir = if subdir.is_empty() {
                base.clone()
            } else {
                base.join(subdir)
            };
            for slot in 0..SOCKET_SLOTS {
                paths.push(dir.join(format!("{}{}", SOCKET_PREFIX, slot)));
            }
        }
    }
    paths
}

fn configure_timeouts(stream: &UnixStream) -> PresenceResult<()> {
    stream
        .set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)))
        .and_then(|_| stream.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS))))
        .map_err(|source| PresenceError::Io {
            context: "setting IPC socket timeouts".to_string(),
            source,
        })
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8], what: &str) -> PresenceResult<T> {
    serde_json::from_slice(body).map_err(|source| PresenceError::Json {
        context: format!("parsing {}", what),
        source,
    })
}

fn protocol_error(err: ErrorInfo) -> PresenceError {
    PresenceError::Protocol(err.to_string())
}
