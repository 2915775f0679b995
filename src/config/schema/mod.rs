use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub a2a: A2aConfig,
    #[serde(default)]
    pub mcp: McpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Global tools switch. When off, every tool reports itself disabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-tool switches: names listed here are disabled individually.
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub bash: BashToolConfig,
    #[serde(default, rename = "webFetch")]
    pub web_fetch: WebFetchConfig,
    #[serde(default, rename = "webSearch")]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub computer: ComputerConfig,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            disabled: Vec::new(),
            sandbox: SandboxConfig::default(),
            bash: BashToolConfig::default(),
            web_fetch: WebFetchConfig::default(),
            web_search: WebSearchConfig::default(),
            github: GitHubConfig::default(),
            computer: ComputerConfig::default(),
        }
    }
}

impl ToolsConfig {
    /// Whether a tool is enabled, combining the global switch with the
    /// per-tool disabled list.
    pub fn tool_enabled(&self, name: &str) -> bool {
        self.enabled && !self.disabled.iter().any(|d| d == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Directory roots tools may touch. Relative entries resolve against the
    /// working directory at startup.
    #[serde(default = "default_allowed_paths", rename = "allowedPaths")]
    pub allowed_paths: Vec<String>,
    /// Protected path patterns: `dir/`, `dir/*`, `*.ext`, or literal names.
    #[serde(default = "default_protected_paths", rename = "protectedPaths")]
    pub protected_paths: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            allowed_paths: default_allowed_paths(),
            protected_paths: default_protected_paths(),
        }
    }
}

fn default_allowed_paths() -> Vec<String> {
    vec![".".to_string()]
}

fn default_protected_paths() -> Vec<String> {
    [".git/", ".env", "*.pem", "*.key", "id_rsa", "id_ed25519"]
        .iter()
        .map(std::string::ToString::to_string)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BashToolConfig {
    #[serde(default = "default_bash_timeout")]
    pub timeout: u64,
    /// Exact first-token whitelist.
    #[serde(default = "default_whitelisted_commands", rename = "whitelistedCommands")]
    pub whitelisted_commands: Vec<String>,
    /// Full-command regex whitelist, tried when the first token is unknown.
    #[serde(default, rename = "whitelistedPatterns")]
    pub whitelisted_patterns: Vec<String>,
}

impl Default for BashToolConfig {
    fn default() -> Self {
        Self {
            timeout: default_bash_timeout(),
            whitelisted_commands: default_whitelisted_commands(),
            whitelisted_patterns: Vec::new(),
        }
    }
}

fn default_bash_timeout() -> u64 {
    60
}

fn default_whitelisted_commands() -> Vec<String> {
    [
        // File listing & navigation
        "ls", "find", "tree", "pwd", "basename", "dirname", "realpath", "stat", "file",
        // File reading
        "cat", "head", "tail", "wc", "md5sum", "sha256sum",
        // Text processing
        "grep", "awk", "sed", "sort", "uniq", "cut", "tr", "diff",
        // Search
        "rg", "fd",
        // JSON/data
        "jq",
        // Git
        "git",
        // Development tools
        "cargo", "rustc", "npm", "node", "python3", "make", "go",
        // System info
        "date", "whoami", "hostname", "uname", "df", "du", "ps", "which",
        // Misc utilities
        "echo", "printf", "seq", "tee", "touch", "mkdir", "cp", "mv",
    ]
    .iter()
    .map(std::string::ToString::to_string)
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebFetchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fetch_timeout")]
    pub timeout: u64,
    /// Maximum response body size in bytes.
    #[serde(default = "default_max_size", rename = "maxSize")]
    pub max_size: usize,
}

impl Default for WebFetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: default_fetch_timeout(),
            max_size: default_max_size(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_max_size() -> usize {
    2 * 1024 * 1024
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Search engines the model may select. Reflected verbatim in the tool's
    /// descriptor enum.
    #[serde(default = "default_search_providers")]
    pub providers: Vec<String>,
    #[serde(default = "default_search_provider", rename = "defaultProvider")]
    pub default_provider: String,
    /// Google Custom Search credentials. `${ENV}` references are resolved at
    /// call time.
    #[serde(default, rename = "googleApiKey")]
    pub google_api_key: String,
    #[serde(default, rename = "googleEngineId")]
    pub google_engine_id: String,
    #[serde(default = "default_max_results", rename = "maxResults")]
    pub max_results: usize,
    #[serde(default = "default_search_timeout")]
    pub timeout: u64,
}

impl std::fmt::Debug for WebSearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSearchConfig")
            .field("enabled", &self.enabled)
            .field("providers", &self.providers)
            .field("default_provider", &self.default_provider)
            .field("google_api_key", &"<redacted>")
            .field("google_engine_id", &self.google_engine_id)
            .field("max_results", &self.max_results)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            providers: default_search_providers(),
            default_provider: default_search_provider(),
            google_api_key: String::new(),
            google_engine_id: String::new(),
            max_results: default_max_results(),
            timeout: default_search_timeout(),
        }
    }
}

fn default_search_providers() -> Vec<String> {
    vec!["google".to_string(), "duckduckgo".to_string()]
}

fn default_search_provider() -> String {
    "duckduckgo".to_string()
}

fn default_max_results() -> usize {
    5
}

fn default_search_timeout() -> u64 {
    10
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct GitHubConfig {
    #[serde(default)]
    pub enabled: bool,
    /// The only owner this tool will operate on. Caller-passed owners that
    /// differ are rejected at validate time.
    #[serde(default)]
    pub owner: String,
    /// Token or `${ENV}` reference resolved at call time.
    #[serde(default)]
    pub token: String,
    #[serde(default, rename = "baseUrl")]
    pub base_url: Option<String>,
    #[serde(default = "default_github_timeout")]
    pub timeout: u64,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("enabled", &self.enabled)
            .field("owner", &self.owner)
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn default_github_timeout() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputerConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Sliding-window admission bound for computer-use actions.
    #[serde(default = "default_max_actions", rename = "maxActions")]
    pub max_actions: usize,
    #[serde(default = "default_action_window", rename = "windowSeconds")]
    pub window_seconds: u64,
}

impl Default for ComputerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_actions: default_max_actions(),
            window_seconds: default_action_window(),
        }
    }
}

fn default_max_actions() -> usize {
    10
}

fn default_action_window() -> u64 {
    60
}

/// Polling schedule selection for A2A task monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PollStrategy {
    Fixed,
    #[default]
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct A2aConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_a2a_timeout", rename = "requestTimeout")]
    pub request_timeout: u64,
    #[serde(default, rename = "pollStrategy")]
    pub poll_strategy: PollStrategy,
    /// Fixed-strategy interval, seconds.
    #[serde(default = "default_status_poll", rename = "statusPollSeconds")]
    pub status_poll_seconds: u64,
    /// Exponential-strategy starting interval, seconds.
    #[serde(default = "default_initial_poll", rename = "initialPollInterval")]
    pub initial_poll_interval: u64,
    #[serde(default = "default_backoff_multiplier", rename = "backoffMultiplier")]
    pub backoff_multiplier: f64,
    /// Exponential-strategy clamp, seconds.
    #[serde(default = "default_max_poll", rename = "maxPollInterval")]
    pub max_poll_interval: u64,
    #[serde(default = "default_download_dir", rename = "downloadDir")]
    pub download_dir: String,
    /// Place each artifact's files under a subdirectory named after its id.
    #[serde(default, rename = "organizeByArtifact")]
    pub organize_by_artifact: bool,
}

impl Default for A2aConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_timeout: default_a2a_timeout(),
            poll_strategy: PollStrategy::default(),
            status_poll_seconds: default_status_poll(),
            initial_poll_interval: default_initial_poll(),
            backoff_multiplier: default_backoff_multiplier(),
            max_poll_interval: default_max_poll(),
            download_dir: default_download_dir(),
            organize_by_artifact: false,
        }
    }
}

fn default_a2a_timeout() -> u64 {
    30
}

fn default_status_poll() -> u64 {
    5
}

fn default_initial_poll() -> u64 {
    2
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_max_poll() -> u64 {
    30
}

fn default_download_dir() -> String {
    "./downloads".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpConfig {
    #[serde(default)]
    pub servers: HashMap<String, McpServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// When non-empty, only these tool names are wrapped.
    #[serde(default)]
    pub include_tools: Vec<String>,
    /// Tool names to skip even when included.
    #[serde(default)]
    pub exclude_tools: Vec<String>,
}
