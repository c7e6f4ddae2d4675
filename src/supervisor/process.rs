//! Child process lifecycle for the reverse proxy.

use std::future;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};

use crate::config::ProxyConfig;
use crate::render::{ConfigSnapshot, StagedConfig};
use crate::supervisor::SupervisorError;

/// Lifecycle state of the supervised proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Owns the proxy child process and is the only thing that signals it.
#[derive(Debug)]
pub struct ProcessSupervisor {
    binary: String,
    args: Vec<String>,
    child: Option<Child>,
    pid: Option<u32>,
    state: ProxyState,
    exit: Option<ExitStatus>,
    reloads_sent: u64,
}

impl ProcessSupervisor {
    /// `args` are appended to every invocation, test runs included.
    pub fn new(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
            child: None,
            pid: None,
            state: ProxyState::Stopped,
            exit: None,
            reloads_sent: 0,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(config.binary.clone(), config.passthrough_args())
    }

    pub fn state(&self) -> ProxyState {
        self.state
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Number of reload signals delivered to the child so far.
    pub fn reloads_sent(&self) -> u64 {
        self.reloads_sent
    }

    /// Spawn the proxy serving `config_path`.
    pub fn launch(&mut self, config_path: &Path) -> Result<u32, SupervisorError> {
        if let (Some(pid), ProxyState::Running | ProxyState::Stopping) = (self.pid, self.state) {
            return Err(SupervisorError::AlreadyRunning(pid));
        }

        self.state = ProxyState::Starting;
        let spawned = Command::new(&self.binary)
            .arg("-c")
            .arg(config_path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn();

        let child = match spawned {
            Ok(child) => child,
            Err(source) => {
                self.state = ProxyState::Stopped;
                return Err(SupervisorError::Spawn {
                    binary: self.binary.clone(),
                    source,
                });
            }
        };

        let Some(pid) = child.id() else {
            self.state = ProxyState::Stopped;
            return Err(
                io::Error::new(io::ErrorKind::Other, "proxy exited before reporting a pid").into(),
            );
        };
        tracing::info!(pid, binary = %self.binary, config = ?config_path, "Proxy launched");

        self.child = Some(child);
        self.pid = Some(pid);
        self.exit = None;
        self.state = ProxyState::Running;
        Ok(pid)
    }

    /// Run the proxy's config test against `path`.
    pub async fn validate(&self, path: &Path) -> Result<(), SupervisorError> {
        let status = Command::new(&self.binary)
            .arg("-t")
            .arg("-c")
            .arg(path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| SupervisorError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(SupervisorError::Validation {
                path: path.to_path_buf(),
                status,
            })
        }
    }

    /// Validate `staged`, make it live, and ask the proxy to reload.
    ///
    /// A rejected config is discarded and the live file stays as it was.
    /// No signal is sent when the proxy is not running yet.
    pub async fn reload(&mut self, staged: StagedConfig) -> Result<ConfigSnapshot, SupervisorError> {
        if let Err(e) = self.validate(staged.path()).await {
            staged.discard();
            return Err(e);
        }

        let snapshot = staged.promote()?;
        if self.state == ProxyState::Running {
            self.signal(Signal::SIGHUP)?;
            self.reloads_sent += 1;
            tracing::info!(pid = ?self.pid, "Proxy reload signalled");
        }
        Ok(snapshot)
    }

    /// Deliver `sig` to the running proxy.
    pub fn signal(&self, sig: Signal) -> Result<(), SupervisorError> {
        match (self.pid, &self.child) {
            (Some(pid), Some(_)) => {
                let raw = i32::try_from(pid).map_err(|_| nix::errno::Errno::ESRCH)?;
                signal::kill(Pid::from_raw(raw), sig)?;
                Ok(())
            }
            _ => Err(SupervisorError::Signal(nix::errno::Errno::ESRCH)),
        }
    }

    /// Wait for the proxy to exit.
    ///
    /// Cancel-safe. Never resolves when no proxy was launched, which lets it
    /// sit in a `select!` unconditionally.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.exit {
            return Ok(status);
        }
        let Some(child) = self.child.as_mut() else {
            return future::pending().await;
        };

        let status = child.wait().await?;
        tracing::info!(pid = ?self.pid, %status, "Proxy exited");
        self.child = None;
        self.exit = Some(status);
        self.state = ProxyState::Stopped;
        Ok(status)
    }

    /// Forward `sig` to the proxy and wait until it has exited.
    pub async fn stop(&mut self, sig: Signal) -> Result<ExitStatus, SupervisorError> {
        if let Some(status) = self.exit {
            return Ok(status);
        }
        self.state = ProxyState::Stopping;
        tracing::info!(pid = ?self.pid, signal = %sig, "Stopping proxy");
        if let Err(e) = self.signal(sig) {
            self.state = ProxyState::Stopped;
            return Err(e);
        }
        Ok(self.wait().await?)
    }
}
