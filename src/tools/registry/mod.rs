use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::a2a::client::A2aClient;
use crate::a2a::tracker::AgentTaskTracker;
use crate::config::Config;
use crate::errors::ToolError;
use crate::policy::{CommandWhitelist, PathSandbox};
use crate::tools::a2a::{DownloadArtifactsTool, QueryTaskTool, SubmitTaskTool};
use crate::tools::base::{ReadLedger, Tool, ToolArgs, ToolDefinition, ToolResult};
use crate::tools::computer::{ComputerTool, ScreenDriver};
use crate::tools::delete::DeleteTool;
use crate::tools::edit::{EditTool, MultiEditTool};
use crate::tools::github::GitHubTool;
use crate::tools::grep::GrepTool;
use crate::tools::mcp::McpManager;
use crate::tools::read::ReadTool;
use crate::tools::shell::{BashTool, KillShellTool, ShellSessions};
use crate::tools::todo::TodoWriteTool;
use crate::tools::tree::TreeTool;
use crate::tools::web::{WebFetchTool, WebSearchTool};
use crate::tools::write::WriteTool;
use crate::utils::ratelimit::ActionRateLimiter;

/// Tool names are the invocation keys in the model's function-call channel.
fn is_valid_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Built once at startup, read-only afterwards. Tools are immutable after
/// construction; anything mutable inside them guards itself.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    tracker: Arc<AgentTaskTracker>,
    /// Keeps MCP server connections alive for the proxies' lifetime.
    mcp: Option<McpManager>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
            tracker: Arc::new(AgentTaskTracker::new()),
            mcp: None,
        }
    }

    /// Instantiate every known tool from the config, then wrap the tools of
    /// each enabled MCP server. `screen_driver` is the computer-use
    /// collaborator; without one the computer tool is not registered.
    pub async fn build(
        config: &Config,
        screen_driver: Option<Arc<dyn ScreenDriver>>,
    ) -> anyhow::Result<Self> {
        let tools_cfg = &config.tools;
        let sandbox = Arc::new(PathSandbox::from_config(
            &tools_cfg.sandbox.allowed_paths,
            tools_cfg.sandbox.protected_paths.clone(),
        ));
        let whitelist = Arc::new(CommandWhitelist::new(
            tools_cfg.bash.whitelisted_commands.clone(),
            &tools_cfg.bash.whitelisted_patterns,
        )?);
        let ledger = ReadLedger::new();
        let sessions = Arc::new(ShellSessions::new());

        let mut registry = Self::empty();
        let enabled = |name: &str| tools_cfg.tool_enabled(name);

        registry.register(Arc::new(ReadTool::new(
            sandbox.clone(),
            ledger.clone(),
            enabled(ReadTool::NAME),
        )));
        registry.register(Arc::new(WriteTool::new(
            sandbox.clone(),
            enabled(WriteTool::NAME),
        )));
        registry.register(Arc::new(EditTool::new(
            sandbox.clone(),
            ledger.clone(),
            enabled(EditTool::NAME),
        )));
        registry.register(Arc::new(MultiEditTool::new(
            sandbox.clone(),
            ledger.clone(),
            enabled(MultiEditTool::NAME),
        )));
        registry.register(Arc::new(DeleteTool::new(
            sandbox.clone(),
            enabled(DeleteTool::NAME),
        )));
        registry.register(Arc::new(GrepTool::new(
            sandbox.clone(),
            enabled(GrepTool::NAME),
        )));
        registry.register(Arc::new(TreeTool::new(
            sandbox.clone(),
            enabled(TreeTool::NAME),
        )));
        registry.register(Arc::new(BashTool::new(
            whitelist,
            sandbox.clone(),
            sessions.clone(),
            Duration::from_secs(tools_cfg.bash.timeout),
            enabled(BashTool::NAME),
        )));
        registry.register(Arc::new(KillShellTool::new(
            sessions,
            enabled(KillShellTool::NAME),
        )));
        registry.register(Arc::new(TodoWriteTool::new(enabled(TodoWriteTool::NAME))));

        registry.register(Arc::new(WebFetchTool::new(
            tools_cfg.web_fetch.clone(),
            enabled(WebFetchTool::NAME),
        )));
        registry.register(Arc::new(WebSearchTool::new(
            tools_cfg.web_search.clone(),
            enabled(WebSearchTool::NAME),
        )));
        registry.register(Arc::new(GitHubTool::new(
            tools_cfg.github.clone(),
            enabled(GitHubTool::NAME),
        )));

        if let Some(driver) = screen_driver {
            let limiter = Arc::new(ActionRateLimiter::new(
                Duration::from_secs(tools_cfg.computer.window_seconds),
                tools_cfg.computer.max_actions,
            ));
            registry.register(Arc::new(ComputerTool::new(
                driver,
                limiter,
                tools_cfg.computer.enabled && enabled(ComputerTool::NAME),
            )));
        }

        let a2a_client = Arc::new(A2aClient::new(Duration::from_secs(
            config.a2a.request_timeout,
        )));
        let a2a_enabled = |name: &str| config.a2a.enabled && enabled(name);
        registry.register(Arc::new(SubmitTaskTool::new(
            a2a_client.clone(),
            registry.tracker.clone(),
            &config.a2a,
            a2a_enabled(SubmitTaskTool::NAME),
        )));
        registry.register(Arc::new(QueryTaskTool::new(
            a2a_client.clone(),
            a2a_enabled(QueryTaskTool::NAME),
        )));
        registry.register(Arc::new(DownloadArtifactsTool::new(
            a2a_client,
            &config.a2a,
            a2a_enabled(DownloadArtifactsTool::NAME),
        )));

        // MCP tools: a fresh snapshot per build, so config reloads re-enumerate.
        if !config.mcp.servers.is_empty() {
            let manager = McpManager::connect(&config.mcp).await?;
            for tool in manager.discover_tools().await {
                registry.register(tool);
            }
            registry.mcp = Some(manager);
        }

        info!("tool registry built: {} tool(s)", registry.tools.len());
        Ok(registry)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        if !is_valid_tool_name(&name) {
            warn!("registry: rejecting tool with invalid name '{}'", name);
            return;
        }
        if self.tools.contains_key(&name) {
            warn!("registry: overwriting duplicate tool '{}'", name);
        }
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(format!("unknown tool: {}", name)))
    }

    /// Names of all tools whose `is_enabled()` is true, sorted.
    pub fn list_available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools
            .iter()
            .filter(|(_, t)| t.is_enabled())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Descriptors for the model's function-calling API, filtered by
    /// enablement and sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .filter(|t| t.is_enabled())
            .map(|t| t.definition())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn task_tracker(&self) -> Arc<AgentTaskTracker> {
        self.tracker.clone()
    }

    /// Full dispatch path for one model tool call: lookup, enablement,
    /// validation, execution, duration stamping. Expected failures come back
    /// inside the result; only Internal faults propagate as `Err`.
    pub async fn dispatch(
        &self,
        name: &str,
        args: ToolArgs,
        cancel: CancellationToken,
    ) -> anyhow::Result<ToolResult> {
        let started = Instant::now();
        let tool = match self.get(name) {
            Ok(tool) => tool,
            Err(err) => return Ok(stamp(ToolResult::failure(name, args, err), started)),
        };

        if !tool.is_enabled() {
            return Ok(stamp(
                ToolResult::failure(
                    name,
                    args,
                    ToolError::Disabled(format!(
                        "tool '{}' is disabled (check tools.enabled and the tools.disabled list)",
                        name
                    )),
                ),
                started,
            ));
        }

        if let Err(err) = tool.validate(&args) {
            debug!("tool '{}' rejected arguments: {}", name, err);
            return Ok(stamp(ToolResult::failure(name, args, err), started));
        }

        let result = tool.execute(cancel, args).await?;
        Ok(stamp(result, started))
    }

    pub async fn shutdown(self) {
        self.tracker.cancel_all().await;
        if let Some(mcp) = self.mcp {
            mcp.shutdown().await;
        }
    }
}

fn stamp(mut result: ToolResult, started: Instant) -> ToolResult {
    result.duration = started.elapsed();
    result
}

#[cfg(test)]
mod tests;
