//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ControllerConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a settings file without validating it.
///
/// CLI flags are merged on top before validation, so a partial file is fine.
pub fn read_config(path: &Path) -> Result<ControllerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [chain]
            rpc_url = "http://127.0.0.1:9999"
            contract_address = "0x0000000000000000000000000000000000000000"

            [proxy]
            template = "gateway.conf.tmpl"
            fallback_upstream = "127.0.0.1:6000"

            [reconcile]
            poll_interval_ms = 250
            "#
        )
        .unwrap();

        let config = read_config(file.path()).unwrap();
        assert_eq!(config.chain.rpc_url, "http://127.0.0.1:9999");
        assert_eq!(config.reconcile.poll_interval_ms, 250);
    }

    #[test]
    fn test_partial_file_is_not_validated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[proxy]\nfallback_upstream = \"nope\"").unwrap();

        let config = read_config(file.path()).unwrap();
        assert_eq!(config.proxy.fallback_upstream, "nope");
        assert!(config.chain.contract_address.is_empty());
    }

    #[test]
    fn test_validation_display_lists_fields() {
        let err = ConfigError::Validation(vec![
            ValidationError::new("chain.rpc_url", "bad"),
            ValidationError::new("proxy.template", "must not be empty"),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("Validation failed: "));
        assert!(text.contains("chain.rpc_url"));
        assert!(text.contains("proxy.template"));
    }

    #[test]
    fn test_read_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[chain").unwrap();
        assert!(matches!(read_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_config(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(err.to_string().starts_with("IO error"));
    }
}
