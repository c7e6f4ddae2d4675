//! Proxy process supervision.
//!
//! # Data Flow
//! ```text
//! launch:   <proxy> -c <live> <args>        (inherits stdio)
//! validate: <proxy> -t -c <staged> <args>   (exit 0 = valid)
//! reload:   validate → promote staged → SIGHUP
//! stop:     forward signal → wait for exit
//! ```
//!
//! # Design Decisions
//! - The supervisor is the only code that signals the child
//! - Exit is observed by awaiting, not by callback
//! - The child is killed if the supervisor is dropped while it runs

pub mod process;

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

pub use process::{ProcessSupervisor, ProxyState};

/// Exit code used when the proxy never started or left no exit code.
pub const EXIT_SENTINEL: i32 = 100;

/// Errors raised while controlling the proxy process.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The proxy binary could not be started.
    #[error("failed to spawn proxy '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    /// The proxy's config test rejected a config.
    #[error("config test failed for {path:?}: {status}")]
    Validation { path: PathBuf, status: ExitStatus },

    /// A signal could not be delivered.
    #[error("failed to signal proxy: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// `launch` was called while a child is alive.
    #[error("proxy is already running (pid {0})")]
    AlreadyRunning(u32),
}

/// Controller exit code for a proxy exit status.
pub fn exit_code(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(EXIT_SENTINEL)
}
