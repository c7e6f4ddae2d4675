//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! reader / controller / supervisor
//!     → logging.rs (tracing events to stderr)
//!     → metrics.rs (counters and gauges)
//!
//! Consumers:
//!     → Log aggregation (stderr)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Recording a metric without an installed exporter is a no-op
//! - Log filter comes from `RUST_LOG` first, then the configured level

pub mod logging;
pub mod metrics;
