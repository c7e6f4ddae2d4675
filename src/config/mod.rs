//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (flags override file values)
//!     → validation.rs (semantic checks)
//!     → ControllerConfig (validated, immutable)
//!
//! While running:
//!     watcher.rs detects template change
//!     → ControlEvent::Reload
//!     → controller re-renders the last applied topology
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; only the template is re-read at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{ChainConfig, ControllerConfig, ObservabilityConfig, ProxyConfig, ReconcileConfig};
