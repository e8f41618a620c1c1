use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Settings read from an optional TOML file. Command-line flags are applied
/// on top by `main`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path of the single MCP endpoint.
    pub path: String,
    /// Name reported in `serverInfo`.
    pub name: String,
    /// Do not issue or require session ids.
    pub stateless: bool,
    /// Answer requests with plain JSON bodies instead of event streams.
    pub json_response: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            path: "/mcp".into(),
            name: "arith-mcp".into(),
            stateless: false,
            json_response: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub client_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000/mcp".into(),
            timeout_secs: 30,
            client_name: "arith-mcp-demo".into(),
        }
    }
}

impl Config {
    /// Load the config file if one was given, otherwise use defaults.
    /// Not validated here, since flags may still override file values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.server.path.starts_with('/') {
            bail!("server.path must start with '/': {}", self.server.path);
        }
        if self.client.timeout_secs == 0 {
            bail!("client.timeout_secs must be positive");
        }
        Ok(())
    }
}
