use async_trait::async_trait;
use rmcp::RoleClient;
use rmcp::model::{CallToolRequestParams, RawContent};
use rmcp::service::Peer;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt::Write;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::ToolError;
use crate::tools::base::{Tool, ToolArgs, ToolData, ToolDefinition, ToolResult};

/// Wraps a single MCP server tool behind the uniform tool contract.
/// Displayed name: `MCP_{server}_{tool}`.
pub struct McpProxyTool {
    peer: Peer<RoleClient>,
    server_name: String,
    tool_name: String,
    display_name: String,
    description: String,
    input_schema: Value,
}

/// Tool names are bounded to `[A-Za-z0-9_-]+`; anything else becomes `_`.
fn sanitize_name_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Check one argument value against a declared JSON-Schema primitive type.
/// `integer` accepts any JSON number; other types must match exactly.
fn value_matches_type(value: &Value, declared: &str) -> bool {
    match declared {
        "string" => value.is_string(),
        "integer" | "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

impl McpProxyTool {
    pub fn new(
        peer: Peer<RoleClient>,
        server_name: &str,
        tool_name: String,
        description: String,
        input_schema: Value,
    ) -> Self {
        let display_name = format!(
            "MCP_{}_{}",
            sanitize_name_component(server_name),
            sanitize_name_component(&tool_name)
        );
        Self {
            peer,
            server_name: server_name.to_string(),
            tool_name,
            display_name,
            description,
            input_schema,
        }
    }
}

#[async_trait]
impl Tool for McpProxyTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.display_name.clone(),
            description: self.description.clone(),
            parameters: self.input_schema.clone(),
        }
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        // Required keys from the declared schema.
        if let Some(required) = self.input_schema["required"].as_array() {
            for key in required.iter().filter_map(Value::as_str) {
                if !args.contains_key(key) {
                    return Err(ToolError::missing_param(key));
                }
            }
        }
        // Primitive type agreement for declared properties.
        if let Some(properties) = self.input_schema["properties"].as_object() {
            for (key, schema) in properties {
                if let (Some(value), Some(declared)) =
                    (args.get(key), schema["type"].as_str())
                    && !value_matches_type(value, declared)
                {
                    return Err(ToolError::invalid_param(
                        key,
                        &format!("expected {}", declared),
                    ));
                }
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        if let Err(err) = self.validate(&args) {
            return Ok(ToolResult::failure(&self.display_name, args, err));
        }
        debug!("MCP tool call: {} ({})", self.tool_name, self.server_name);

        let arguments = if args.is_empty() {
            None
        } else {
            Some(args.clone().into_iter().collect())
        };
        let mut request = CallToolRequestParams::new(Cow::Owned(self.tool_name.clone()));
        if let Some(arguments) = arguments {
            request = request.with_arguments(arguments);
        }

        let result = match self.peer.call_tool(request).await {
            Ok(r) => r,
            Err(e) => {
                warn!("MCP tool '{}' failed: {}", self.tool_name, e);
                return Ok(ToolResult::failure(
                    &self.display_name,
                    args,
                    ToolError::Remote(format!(
                        "MCP tool '{}' call failed: {}",
                        self.tool_name, e
                    )),
                ));
            }
        };

        let is_error = result.is_error.unwrap_or(false);

        // Concatenate text parts; mark image/binary parts with placeholders.
        let mut content = String::new();
        for block in &result.content {
            if !content.is_empty() {
                content.push('\n');
            }
            match &block.raw {
                RawContent::Text(text) => content.push_str(&text.text),
                RawContent::Image(img) => {
                    let _ = write!(
                        content,
                        "[Image: {} ({} bytes)]",
                        img.mime_type,
                        img.data.len()
                    );
                }
                RawContent::Audio(audio) => {
                    let _ = write!(
                        content,
                        "[Audio: {} ({} bytes)]",
                        audio.mime_type,
                        audio.data.len()
                    );
                }
                _ => content.push_str("[Unsupported MCP content type]"),
            }
        }
        if content.is_empty() {
            content = "(no output)".to_string();
        }

        let data = ToolData::Mcp {
            server_name: self.server_name.clone(),
            tool_name: self.tool_name.clone(),
            content: content.clone(),
        };

        Ok(if is_error {
            let mut result =
                ToolResult::failure(&self.display_name, args, ToolError::Remote(content));
            result.data = Some(data);
            result
        } else {
            ToolResult::success(&self.display_name, args, data)
        })
    }
}
