//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGTERM, SIGINT and SIGHUP
//! - Translate them into [`ControlEvent`]s for the controller loop
//!
//! # Design Decisions
//! - SIGHUP re-renders and reloads, it never shuts down
//! - The received signal is carried along so it can be forwarded to the proxy

use std::io;

use nix::sys::signal::Signal;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Requests delivered to the controller loop from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Re-render the last applied topology and reload if it changed.
    Reload,
    /// Forward the signal to the proxy and exit once it has stopped.
    Shutdown(Signal),
}

/// Install signal handlers and forward events into `tx`.
///
/// Handlers are registered before this returns. The task ends when the
/// receiving side is dropped.
pub fn listen(tx: mpsc::UnboundedSender<ControlEvent>) -> io::Result<JoinHandle<()>> {
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut hup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = term.recv() => ControlEvent::Shutdown(Signal::SIGTERM),
                _ = int.recv() => ControlEvent::Shutdown(Signal::SIGINT),
                _ = hup.recv() => ControlEvent::Reload,
            };
            tracing::info!(?event, "Signal received");
            if tx.send(event).is_err() {
                break;
            }
        }
    }))
}
