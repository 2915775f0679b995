pub mod schema;

pub use schema::{
    A2aConfig, BashToolConfig, ComputerConfig, Config, GitHubConfig, McpConfig, McpServerConfig,
    PollStrategy, SandboxConfig, ToolsConfig, WebFetchConfig, WebSearchConfig,
};

use anyhow::{Context, Result};
use std::path::Path;

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse config")
    }
}
