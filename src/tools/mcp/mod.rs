pub mod proxy;

use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::TokioChildProcess;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::{McpConfig, McpServerConfig};
use crate::tools::Tool;
use crate::utils::env::resolve_env_refs;
use proxy::McpProxyTool;

/// A running MCP server connection.
struct RunningMcpServer {
    client: rmcp::service::RunningService<rmcp::RoleClient, ()>,
    server_name: String,
    include_tools: Vec<String>,
    exclude_tools: Vec<String>,
}

impl RunningMcpServer {
    fn wants(&self, tool_name: &str) -> bool {
        if !self.include_tools.is_empty() && !self.include_tools.iter().any(|t| t == tool_name) {
            return false;
        }
        !self.exclude_tools.iter().any(|t| t == tool_name)
    }
}

/// Manages connections to MCP servers and discovers their tools.
///
/// Discovery builds a fresh snapshot by querying every enabled server;
/// re-enumeration happens by rebuilding the manager (safe on config reload).
pub struct McpManager {
    servers: Vec<RunningMcpServer>,
}

impl McpManager {
    /// Connect to all enabled MCP servers defined in config. Individual
    /// connection failures are logged and skipped.
    pub async fn connect(config: &McpConfig) -> Result<Self> {
        let mut servers = Vec::new();

        for (name, server_cfg) in &config.servers {
            if !server_cfg.enabled {
                info!("MCP server '{}' is disabled, skipping", name);
                continue;
            }

            match Self::connect_server(name, server_cfg).await {
                Ok(server) => {
                    info!("MCP server '{}' connected", name);
                    servers.push(server);
                }
                Err(e) => {
                    warn!("Failed to connect MCP server '{}': {}", name, e);
                }
            }
        }

        Ok(Self { servers })
    }

    async fn connect_server(name: &str, config: &McpServerConfig) -> Result<RunningMcpServer> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);
        for (k, v) in &config.env {
            cmd.env(k, resolve_env_refs(v));
        }
        // Pipe stdin/stdout for MCP communication, inherit stderr for logging
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::inherit());

        let transport = TokioChildProcess::new(cmd)?;
        let client = ()
            .serve(transport)
            .await
            .map_err(|e| anyhow::anyhow!("MCP handshake failed for server '{}': {}", name, e))?;

        Ok(RunningMcpServer {
            client,
            server_name: name.to_string(),
            include_tools: config.include_tools.clone(),
            exclude_tools: config.exclude_tools.clone(),
        })
    }

    /// Discover the tools of every connected server and wrap each as an
    /// `impl Tool`, honouring per-server include/exclude lists.
    pub async fn discover_tools(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();

        for server in &self.servers {
            match server.client.peer().list_all_tools().await {
                Ok(mcp_tools) => {
                    for mcp_tool in mcp_tools {
                        if !server.wants(&mcp_tool.name) {
                            info!(
                                "MCP tool '{}' from '{}' filtered out by config",
                                mcp_tool.name, server.server_name
                            );
                            continue;
                        }
                        let description =
                            mcp_tool.description.as_deref().unwrap_or("").to_string();
                        let input_schema =
                            serde_json::Value::Object((*mcp_tool.input_schema).clone());

                        let proxy = McpProxyTool::new(
                            server.client.peer().clone(),
                            &server.server_name,
                            mcp_tool.name.to_string(),
                            description,
                            input_schema,
                        );
                        info!(
                            "Discovered MCP tool '{}' from server '{}'",
                            mcp_tool.name, server.server_name
                        );
                        tools.push(Arc::new(proxy));
                    }
                }
                Err(e) => {
                    warn!(
                        "Failed to list tools from MCP server '{}': {}",
                        server.server_name, e
                    );
                }
            }
        }

        tools
    }

    /// Gracefully shut down all MCP server connections.
    pub async fn shutdown(self) {
        for server in self.servers {
            if let Err(e) = server.client.cancel().await {
                warn!(
                    "Error shutting down MCP server '{}': {}",
                    server.server_name, e
                );
            }
        }
    }
}
