//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build chain client → reader → supervisor → Controller::init → run
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → ControlEvent::Shutdown (forwarded to the proxy)
//!     SIGHUP         → ControlEvent::Reload
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error ends the process before the proxy launches
//! - Config files are removed on every exit path

pub mod signals;
pub mod startup;
