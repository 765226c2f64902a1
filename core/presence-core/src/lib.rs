//! # presence-core
//!
//! Synchronization core for the DaVinci Resolve → Discord presence bridge.
//!
//! ## Design Principles
//!
//! - **Synchronous**: one loop, blocking calls, no async runtime.
//! - **No I/O of its own**: the host application and the presence service are
//!   reached only through the [`HostApp`] and [`PresenceClient`] traits; the
//!   daemon crate supplies the real implementations.
//! - **Graceful degradation**: a failed host query degrades one field of the
//!   observation, never the whole tick.
//! - **Clean exit**: once connected, the published status is cleared exactly
//!   once, whichever way the process stops.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use presence_core::{PresenceConfig, ShutdownSignal, Supervisor};
//!
//! let shutdown = ShutdownSignal::new();
//! let reason = Supervisor::new(PresenceConfig::default(), host, presence, shutdown).run();
//! std::process::exit(reason.exit_code().into());
//! ```

pub mod change;
pub mod config;
pub mod error;
pub mod host;
pub mod render;
pub mod sampler;
pub mod shutdown;
pub mod snapshot;
pub mod supervisor;
pub mod types;

#[cfg(test)]
mod testing;

pub use change::should_publish;
pub use config::{page_display, PageDisplay, PresenceConfig};
pub use error::{HostError, HostResult, PresenceError, PresenceResult};
pub use host::{HostApp, PresenceClient};
pub use render::RenderTracker;
pub use shutdown::ShutdownSignal;
pub use supervisor::{ExitReason, Phase, Supervisor, TickOutcome};
pub use types::*;
