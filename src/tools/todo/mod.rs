use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::errors::ToolError;
use crate::tools::base::{
    Tool, ToolArgs, ToolData, ToolDefinition, ToolResult, TodoItem, TodoStatus,
};

/// Session todo list maintained for the model. Each call replaces the whole
/// list, mirroring how the model re-emits its plan.
pub struct TodoWriteTool {
    items: Mutex<Vec<TodoItem>>,
    enabled: bool,
}

fn parse_status(s: &str) -> Result<TodoStatus, ToolError> {
    match s {
        "pending" => Ok(TodoStatus::Pending),
        "in_progress" => Ok(TodoStatus::InProgress),
        "completed" => Ok(TodoStatus::Completed),
        other => Err(ToolError::invalid_param(
            "todos",
            &format!("unknown status '{}'", other),
        )),
    }
}

fn extract_items(args: &ToolArgs) -> Result<Vec<TodoItem>, ToolError> {
    let raw = args
        .get("todos")
        .and_then(Value::as_array)
        .ok_or_else(|| ToolError::missing_param("todos"))?;

    let mut items = Vec::with_capacity(raw.len());
    for (i, value) in raw.iter().enumerate() {
        let obj = value.as_object().ok_or_else(|| {
            ToolError::invalid_param("todos", &format!("item #{} must be an object", i))
        })?;
        let content = obj
            .get("content")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ToolError::invalid_param("todos", &format!("item #{} is missing content", i))
            })?;
        let status = parse_status(
            obj.get("status")
                .and_then(Value::as_str)
                .unwrap_or("pending"),
        )?;
        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| format!("{}", i + 1), String::from);
        items.push(TodoItem {
            id,
            content: content.to_string(),
            status,
        });
    }
    Ok(items)
}

impl TodoWriteTool {
    pub const NAME: &'static str = "todo_write";

    pub fn new(enabled: bool) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            enabled,
        }
    }

    /// Current list snapshot, for the host UI.
    pub fn snapshot(&self) -> Vec<TodoItem> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Tool for TodoWriteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Replace the session todo list.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "todos": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "content": { "type": "string" },
                                "status": {
                                    "type": "string",
                                    "enum": ["pending", "in_progress", "completed"],
                                    "default": "pending"
                                }
                            },
                            "required": ["content"]
                        }
                    }
                },
                "required": ["todos"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        extract_items(args).map(|_| ())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        let items = match extract_items(&args) {
            Ok(items) => items,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };
        *self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = items.clone();
        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::Todo { items },
        ))
    }
}

#[cfg(test)]
mod tests;
