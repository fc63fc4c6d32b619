//! Configuration loading from coxswain.toml.

use mcp::HostConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Tool host process to spawn per query.
    #[serde(default)]
    pub host: HostSection,

    /// Tool selection model.
    #[serde(default)]
    pub selector: SelectorSection,
}

/// `[host]` section.
#[derive(Debug, Deserialize, Default)]
pub struct HostSection {
    /// Command to run. Defaults to this executable with `serve`, which
    /// hosts the built-in quote tools.
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// `[selector]` section.
#[derive(Debug, Deserialize)]
pub struct SelectorSection {
    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Gemini API key. Falls back to the GEMINI_API_KEY environment
    /// variable when unset.
    pub api_key: Option<String>,
}

impl Default for SelectorSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash-001".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Create a default configuration.
    pub fn default_config() -> Self {
        Self {
            host: HostSection::default(),
            selector: SelectorSection::default(),
        }
    }

    /// Resolve the API key from config or environment.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = &self.selector.api_key {
            return Ok(key.clone());
        }
        std::env::var("GEMINI_API_KEY").map_err(|_| ConfigError::MissingApiKey)
    }

    /// Build the host spawn configuration.
    ///
    /// With no `[host]` command configured, the host is this executable
    /// re-run with `serve`.
    pub fn host_config(&self) -> Result<HostConfig, ConfigError> {
        let (command, args) = match &self.host.command {
            Some(command) => (command.clone(), self.host.args.clone()),
            None => {
                let exe = std::env::current_exe()?;
                (
                    exe.to_string_lossy().into_owned(),
                    vec!["serve".to_string()],
                )
            }
        };

        Ok(HostConfig {
            command,
            args,
            env: self.host.env.clone(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("API key not configured: set selector.api_key or GEMINI_API_KEY")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = Config::parse(
            r#"
            [host]
            command = "python3"
            args = ["mcp_server.py"]

            [selector]
            model = "gemini-2.0-flash-001"
            api_key = "AIza-test"
            "#,
        )
        .unwrap();

        assert_eq!(config.host.command.as_deref(), Some("python3"));
        assert_eq!(config.host.args, vec!["mcp_server.py"]);
        assert_eq!(config.selector.model, "gemini-2.0-flash-001");
        assert_eq!(config.api_key().unwrap(), "AIza-test");
    }

    #[test]
    fn empty_config_gets_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.host.command.is_none());
        assert_eq!(config.selector.model, "gemini-2.0-flash-001");
    }

    #[test]
    fn configured_host_command_is_used_verbatim() {
        let config = Config::parse("[host]\ncommand = \"my-host\"\n").unwrap();
        let host = config.host_config().unwrap();
        assert_eq!(host.command, "my-host");
        assert!(host.args.is_empty());
    }

    #[test]
    fn default_host_is_self_serve() {
        let config = Config::default_config();
        let host = config.host_config().unwrap();
        assert_eq!(host.args, vec!["serve"]);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = Config::parse("[host\ncommand = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
