//! Live and staged config files.
//!
//! A render is written to `<live>.next` first. Only a validated staged file
//! is renamed over the live path, so the live file is never half-written or
//! unvalidated.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The config the supervised proxy was launched with.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    path: PathBuf,
}

impl LiveConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Process-scoped path in the system temp directory.
    pub fn for_process() -> Self {
        let name = format!("gateway-proxy-{}.conf", std::process::id());
        Self::new(std::env::temp_dir().join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where renders wait for validation.
    pub fn staging_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".next");
        PathBuf::from(name)
    }

    /// Current live contents, or `None` before the first promotion.
    pub fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write `text` to the staging path.
    pub fn stage(&self, text: String) -> io::Result<StagedConfig> {
        let staged = self.staging_path();
        fs::write(&staged, &text)?;
        Ok(StagedConfig {
            staged,
            live: self.path.clone(),
            text,
        })
    }

    /// Delete the live and staging files. Missing files are fine.
    pub fn remove(&self) -> io::Result<()> {
        for path in [self.path.clone(), self.staging_path()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// A rendered config waiting for validation.
#[derive(Debug)]
pub struct StagedConfig {
    staged: PathBuf,
    live: PathBuf,
    text: String,
}

impl StagedConfig {
    /// Path of the staged file, for the proxy's config test.
    pub fn path(&self) -> &Path {
        &self.staged
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Atomically replace the live config with this one.
    pub fn promote(self) -> io::Result<ConfigSnapshot> {
        fs::rename(&self.staged, &self.live)?;
        Ok(ConfigSnapshot {
            path: self.live,
            text: self.text,
        })
    }

    /// Drop the staged file without touching the live config.
    pub fn discard(self) {
        if let Err(e) = fs::remove_file(&self.staged) {
            tracing::debug!(path = ?self.staged, error = %e, "Could not remove staged config");
        }
    }
}

/// The config currently being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub path: PathBuf,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_path_is_sibling() {
        let live = LiveConfig::new("/tmp/gateway-proxy-1.conf");
        assert_eq!(live.staging_path(), PathBuf::from("/tmp/gateway-proxy-1.conf.next"));
    }

    #[test]
    fn test_process_path_contains_pid() {
        let live = LiveConfig::for_process();
        let name = live.path().file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, format!("gateway-proxy-{}.conf", std::process::id()));
    }

    #[test]
    fn test_promote_replaces_live() {
        let dir = tempfile::tempdir().unwrap();
        let live = LiveConfig::new(dir.path().join("proxy.conf"));
        assert_eq!(live.read().unwrap(), None);

        let staged = live.stage("first".into()).unwrap();
        assert_eq!(live.read().unwrap(), None);
        let snapshot = staged.promote().unwrap();

        assert_eq!(snapshot.text, "first");
        assert_eq!(live.read().unwrap().as_deref(), Some("first"));
        assert!(!live.staging_path().exists());
    }

    #[test]
    fn test_discard_keeps_live() {
        let dir = tempfile::tempdir().unwrap();
        let live = LiveConfig::new(dir.path().join("proxy.conf"));
        live.stage("good".into()).unwrap().promote().unwrap();

        let staged = live.stage("bad".into()).unwrap();
        assert_eq!(staged.text(), "bad");
        staged.discard();

        assert_eq!(live.read().unwrap().as_deref(), Some("good"));
        assert!(!live.staging_path().exists());
    }

    #[test]
    fn test_remove_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let live = LiveConfig::new(dir.path().join("proxy.conf"));
        live.remove().unwrap();

        live.stage("x".into()).unwrap().promote().unwrap();
        live.stage("y".into()).unwrap();
        live.remove().unwrap();
        assert!(!live.path().exists());
        assert!(!live.staging_path().exists());
    }
}
