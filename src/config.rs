use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Display surfaces only; the collection period is fixed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TerminalConfig {
    #[serde(default = "default_terminal_enabled")]
    pub enabled: bool,
    #[serde(default = "default_title")]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            enabled: default_terminal_enabled(),
            title: default_title(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terminal.title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "terminal.title must not be empty".to_string(),
            ));
        }
        if self.web.enabled && SocketAddr::from_str(&self.web.listen).is_err() {
            return Err(ConfigError::Validation(format!(
                "web.listen must be a host:port address, got '{}'",
                self.web.listen
            )));
        }
        if !self.terminal.enabled && !self.web.enabled {
            return Err(ConfigError::Validation(
                "at least one of terminal.enabled or web.enabled must be true".to_string(),
            ));
        }

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

const fn default_terminal_enabled() -> bool {
    true
}

fn default_title() -> String {
    "System Info Viewer".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:9110".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().expect("defaults must validate");
        assert!(cfg.terminal.enabled);
        assert!(!cfg.web.enabled);
    }

    #[test]
    fn example_yaml_parses() {
        let cfg: Config = serde_yaml::from_str(Config::example_yaml()).expect("example parses");
        cfg.validate().expect("example validates");
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").expect("empty map parses");
        assert_eq!(cfg.web.listen, "127.0.0.1:9110");
        assert_eq!(cfg.terminal.title, "System Info Viewer");
    }

    #[test]
    fn bad_listen_rejected_when_web_enabled() {
        let mut cfg = Config::default();
        cfg.web.enabled = true;
        cfg.web.listen = "not-an-address".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        cfg.web.enabled = false;
        cfg.validate().expect("listen is ignored while web is off");
    }

    #[test]
    fn all_views_disabled_rejected() {
        let mut cfg = Config::default();
        cfg.terminal.enabled = false;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::load_from_file("/nonexistent/sysview.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
