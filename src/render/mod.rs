//! Proxy configuration rendering.
//!
//! # Data Flow
//! ```text
//! template file (read fresh per render)
//!     + ObservedTopology
//!     → ConfigRenderer::render (pure)
//!     → LiveConfig::stage (written beside the live path)
//!     → StagedConfig::promote (atomic rename once validated)
//! ```

pub mod snapshot;

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use crate::config::schema::STAKERS_PLACEHOLDER;
use crate::topology::ObservedTopology;

pub use snapshot::{ConfigSnapshot, LiveConfig, StagedConfig};

/// Directive keeping the proxy in the foreground under the supervisor.
const FOREGROUND_DIRECTIVE: &str = "daemon off;";

/// Read the config template from disk.
pub fn load_template(path: &Path) -> io::Result<String> {
    std::fs::read_to_string(path)
}

/// Renders upstream directives into a proxy config template.
#[derive(Debug, Clone)]
pub struct ConfigRenderer {
    fallback_upstream: String,
}

impl ConfigRenderer {
    pub fn new(fallback_upstream: impl Into<String>) -> Self {
        Self {
            fallback_upstream: fallback_upstream.into(),
        }
    }

    /// Render `template` for `topology`.
    ///
    /// Every placeholder occurrence gets one `server` line per staker, or the
    /// single fallback line when the topology is empty.
    pub fn render(&self, topology: &ObservedTopology, template: &str) -> String {
        let servers = self.upstream_block(topology);
        let mut config = template.replace(STAKERS_PLACEHOLDER, &servers);
        config.push('\n');
        config.push_str(FOREGROUND_DIRECTIVE);
        config.push('\n');
        config
    }

    fn upstream_block(&self, topology: &ObservedTopology) -> String {
        let mut block = String::new();
        if topology.is_empty() {
            let _ = writeln!(block, "server {};   # (fallback)", self.fallback_upstream);
            return block;
        }
        for staker in topology.stakers() {
            let _ = writeln!(
                block,
                "server {} weight={};   # {}",
                staker.upstream, staker.weight, staker.address
            );
        }
        block
    }
}
