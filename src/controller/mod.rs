//! Reconciliation loop.
//!
//! # Data Flow
//! ```text
//! Init:     fetch → render → stage → validate → promote → launch
//! Running:  tick  → fetch → diff against last applied
//!                 → (changed) render → stage → validate → promote → SIGHUP
//!           reload event → re-render last applied → (text differs) apply
//! Shutdown: forward signal → await proxy exit → remove config files
//! ```
//!
//! # Design Decisions
//! - One task owns all controller state; every trigger is a `select!` branch
//! - A rejected render keeps the previous last-applied so the next tick retries
//! - Reload requests queued during an apply collapse into one re-render

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use nix::sys::signal::Signal;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::blockchain::{BlockchainError, BlockchainResult, StakingRegistry};
use crate::lifecycle::signals::ControlEvent;
use crate::observability::metrics;
use crate::render::{load_template, ConfigRenderer, LiveConfig};
use crate::supervisor::{exit_code, ProcessSupervisor, SupervisorError, EXIT_SENTINEL};
use crate::topology::{ChainStateReader, HostResolver, ObservedTopology};

/// Lifecycle of the controller itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Init,
    Running,
    ShuttingDown,
    Terminated,
}

/// What caused an apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyTrigger {
    Startup,
    Poll,
    Forced,
}

impl ApplyTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyTrigger::Startup => "startup",
            ApplyTrigger::Poll => "poll",
            ApplyTrigger::Forced => "forced",
        }
    }
}

/// Result of a tick or forced reload that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Nothing changed; no file written and no signal sent.
    Unchanged,
    /// A new config is live.
    Applied,
}

/// A render could not be made live. The previous config keeps serving.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("topology fetch failed: {0}")]
    Fetch(#[from] BlockchainError),

    #[error("failed to read template {path:?}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to stage config: {0}")]
    Stage(#[source] io::Error),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

/// Errors that stop the controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Nothing could be applied at startup; the proxy was never launched.
    #[error("initialization failed: {0}")]
    Initialization(#[source] ApplyError),

    #[error("proxy lifecycle error: {0}")]
    Lifecycle(#[from] SupervisorError),
}

/// How an in-flight fetch ended.
enum FetchInterrupt {
    Fetched(BlockchainResult<ObservedTopology>),
    Exited(io::Result<ExitStatus>),
    Shutdown(Signal),
}

/// Keeps the supervised proxy's config in line with the staking registry.
pub struct Controller<R, H> {
    reader: ChainStateReader<R, H>,
    renderer: ConfigRenderer,
    template: PathBuf,
    live: LiveConfig,
    supervisor: ProcessSupervisor,
    poll_interval: Duration,
    last_applied: Option<ObservedTopology>,
    state: ControllerState,
}

impl<R: StakingRegistry, H: HostResolver> Controller<R, H> {
    pub fn new(
        reader: ChainStateReader<R, H>,
        renderer: ConfigRenderer,
        supervisor: ProcessSupervisor,
        live: LiveConfig,
        template: impl Into<PathBuf>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            reader,
            renderer,
            template: template.into(),
            live,
            supervisor,
            poll_interval,
            last_applied: None,
            state: ControllerState::Init,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn last_applied(&self) -> Option<&ObservedTopology> {
        self.last_applied.as_ref()
    }

    pub fn live(&self) -> &LiveConfig {
        &self.live
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Apply the first topology and launch the proxy.
    ///
    /// On failure the config files are removed and the proxy is not started.
    pub async fn init(&mut self) -> Result<u32, ControllerError> {
        let started = self.start().await;
        match &started {
            Ok(pid) => {
                self.state = ControllerState::Running;
                tracing::info!(pid, config = ?self.live.path(), "Controller running");
            }
            Err(_) => {
                self.cleanup();
                self.state = ControllerState::Terminated;
            }
        }
        started
    }

    /// [`init`] that gives up when a shutdown arrives first.
    ///
    /// Returns `Ok(None)` when interrupted; the proxy is then never launched.
    /// Reload requests received meanwhile are dropped, since init renders the
    /// template fresh anyway.
    ///
    /// [`init`]: Controller::init
    pub async fn init_interruptible(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<ControlEvent>,
    ) -> Result<Option<u32>, ControllerError> {
        let interrupted = {
            let init = self.init();
            tokio::pin!(init);
            loop {
                tokio::select! {
                    started = &mut init => return started.map(Some),
                    event = events.recv() => match event {
                        Some(ControlEvent::Reload) => {}
                        Some(ControlEvent::Shutdown(sig)) => break sig,
                        None => return init.await.map(Some),
                    },
                }
            }
        };

        self.cleanup();
        self.state = ControllerState::Terminated;
        tracing::info!(signal = %interrupted, "Shutdown during startup, proxy not launched");
        Ok(None)
    }

    async fn start(&mut self) -> Result<u32, ControllerError> {
        let topology = self
            .fetch()
            .await
            .map_err(|e| ControllerError::Initialization(e.into()))?;
        self.apply(topology, ApplyTrigger::Startup)
            .await
            .map_err(ControllerError::Initialization)?;
        Ok(self.supervisor.launch(self.live.path())?)
    }

    /// Fetch the topology and apply it if it differs from the last one.
    pub async fn tick(&mut self) -> Result<ApplyOutcome, ApplyError> {
        let topology = self.fetch().await?;
        self.apply_if_changed(topology).await
    }

    /// Apply `topology` unless it equals the last applied one.
    pub async fn apply_if_changed(
        &mut self,
        topology: ObservedTopology,
    ) -> Result<ApplyOutcome, ApplyError> {
        if self.last_applied.as_ref() == Some(&topology) {
            tracing::debug!(stakers = topology.len(), "Topology unchanged");
            return Ok(ApplyOutcome::Unchanged);
        }
        tracing::info!(stakers = topology.len(), "Topology changed");
        self.apply(topology, ApplyTrigger::Poll).await?;
        Ok(ApplyOutcome::Applied)
    }

    /// Re-render the last applied topology without querying the chain.
    ///
    /// Nothing is written or signalled when the render matches the live file.
    pub async fn force_reload(&mut self) -> Result<ApplyOutcome, ApplyError> {
        let topology = self.last_applied.clone().unwrap_or_default();
        let text = self.render(&topology)?;
        let current = self.live.read().map_err(ApplyError::Stage)?;
        if current.as_deref() == Some(text.as_str()) {
            tracing::info!("Forced reload: config unchanged, not signalling proxy");
            return Ok(ApplyOutcome::Unchanged);
        }
        self.promote(topology, text, ApplyTrigger::Forced).await?;
        Ok(ApplyOutcome::Applied)
    }

    async fn apply(
        &mut self,
        topology: ObservedTopology,
        trigger: ApplyTrigger,
    ) -> Result<(), ApplyError> {
        let text = self.render(&topology)?;
        self.promote(topology, text, trigger).await
    }

    fn render(&self, topology: &ObservedTopology) -> Result<String, ApplyError> {
        let template = load_template(&self.template).map_err(|source| ApplyError::Template {
            path: self.template.clone(),
            source,
        })?;
        Ok(self.renderer.render(topology, &template))
    }

    async fn promote(
        &mut self,
        topology: ObservedTopology,
        text: String,
        trigger: ApplyTrigger,
    ) -> Result<(), ApplyError> {
        let staged = self.live.stage(text).map_err(ApplyError::Stage)?;
        match self.supervisor.reload(staged).await {
            Ok(snapshot) => {
                tracing::info!(
                    trigger = trigger.as_str(),
                    stakers = topology.len(),
                    total_weight = topology.total_weight(),
                    path = ?snapshot.path,
                    "Config applied"
                );
                metrics::record_config_applied(trigger.as_str());
                self.last_applied = Some(topology);
                Ok(())
            }
            Err(e) => {
                if matches!(e, SupervisorError::Validation { .. }) {
                    metrics::record_config_rejected(trigger.as_str());
                }
                Err(e.into())
            }
        }
    }

    async fn fetch(&self) -> BlockchainResult<ObservedTopology> {
        let fetched = self.reader.fetch_topology().await;
        Self::record_fetch(&fetched);
        fetched
    }

    fn record_fetch(fetched: &BlockchainResult<ObservedTopology>) {
        metrics::record_topology_fetch(fetched.is_ok(), fetched.as_ref().ok().map(|t| t.len()));
    }

    /// Drive the controller until the proxy exits or a shutdown arrives.
    ///
    /// Returns the process exit code. Must follow a successful [`init`].
    ///
    /// [`init`]: Controller::init
    pub async fn run(&mut self, mut events: mpsc::UnboundedReceiver<ControlEvent>) -> i32 {
        if self.state != ControllerState::Running {
            tracing::error!(state = ?self.state, "Controller is not running");
            return EXIT_SENTINEL;
        }

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;
        let mut reload_pending = false;

        loop {
            if reload_pending {
                reload_pending = false;
                let outcome = self.force_reload().await;
                log_forced(outcome);
            }

            tokio::select! {
                status = self.supervisor.wait() => return self.on_proxy_exit(status),
                event = events.recv(), if events_open => match event {
                    Some(ControlEvent::Reload) => match drain(&mut events) {
                        Some(sig) => return self.shutdown(sig).await,
                        None => reload_pending = true,
                    },
                    Some(ControlEvent::Shutdown(sig)) => return self.shutdown(sig).await,
                    None => events_open = false,
                },
                _ = ticker.tick() => {
                    let fetched = {
                        let fetch = self.reader.fetch_topology();
                        tokio::pin!(fetch);
                        loop {
                            tokio::select! {
                                result = &mut fetch => break FetchInterrupt::Fetched(result),
                                status = self.supervisor.wait() => break FetchInterrupt::Exited(status),
                                event = events.recv(), if events_open => match event {
                                    Some(ControlEvent::Reload) => reload_pending = true,
                                    Some(ControlEvent::Shutdown(sig)) => break FetchInterrupt::Shutdown(sig),
                                    None => events_open = false,
                                },
                            }
                        }
                    };

                    match fetched {
                        FetchInterrupt::Fetched(result) => {
                            Self::record_fetch(&result);
                            let outcome = match result {
                                Ok(topology) => self.apply_if_changed(topology).await,
                                Err(e) => Err(e.into()),
                            };
                            if let Err(e) = outcome {
                                tracing::warn!(error = %e, "Tick failed, keeping current config");
                            }
                        }
                        FetchInterrupt::Exited(status) => return self.on_proxy_exit(status),
                        FetchInterrupt::Shutdown(sig) => {
                            tracing::info!("Abandoning in-flight fetch");
                            return self.shutdown(sig).await;
                        }
                    }
                }
            }
        }
    }

    /// Forward `sig` to the proxy, wait for it, and clean up.
    ///
    /// Returns the proxy's exit code.
    pub async fn shutdown(&mut self, sig: Signal) -> i32 {
        self.state = ControllerState::ShuttingDown;
        tracing::info!(signal = %sig, "Shutting down");

        let code = match self.supervisor.stop(sig).await {
            Ok(status) => exit_code(&status),
            Err(e) => {
                tracing::error!(error = %e, "Failed to stop proxy");
                EXIT_SENTINEL
            }
        };
        self.terminate(code)
    }

    fn on_proxy_exit(&mut self, status: io::Result<ExitStatus>) -> i32 {
        let code = match status {
            Ok(status) => {
                tracing::warn!(%status, "Proxy exited, terminating controller");
                exit_code(&status)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to wait for proxy");
                EXIT_SENTINEL
            }
        };
        self.terminate(code)
    }

    fn terminate(&mut self, code: i32) -> i32 {
        self.cleanup();
        self.state = ControllerState::Terminated;
        tracing::info!(code, "Controller terminated");
        code
    }

    fn cleanup(&self) {
        if let Err(e) = self.live.remove() {
            tracing::warn!(path = ?self.live.path(), error = %e, "Failed to remove config files");
        }
    }
}

fn log_forced(outcome: Result<ApplyOutcome, ApplyError>) {
    match outcome {
        Ok(ApplyOutcome::Applied) => tracing::info!("Forced reload applied"),
        Ok(ApplyOutcome::Unchanged) => {}
        Err(e) => tracing::error!(error = %e, "Forced reload failed"),
    }
}

/// Swallow queued reload requests. Returns a shutdown signal if one was queued.
fn drain(events: &mut mpsc::UnboundedReceiver<ControlEvent>) -> Option<Signal> {
    loop {
        match events.try_recv() {
            Ok(ControlEvent::Reload) => continue,
            Ok(ControlEvent::Shutdown(sig)) => return Some(sig),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
        }
    }
}
