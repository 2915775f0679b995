use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::ToolError;
use crate::policy::PathSandbox;
use crate::tools::base::{ReadLedger, Tool, ToolArgs, ToolData, ToolDefinition, ToolResult};
use crate::tools::params;

/// Maximum file size the read tool will load (10 MB).
const MAX_READ_BYTES: u64 = 10 * 1024 * 1024;

pub struct ReadTool {
    sandbox: Arc<PathSandbox>,
    ledger: ReadLedger,
    enabled: bool,
}

impl ReadTool {
    pub const NAME: &'static str = "read";

    pub fn new(sandbox: Arc<PathSandbox>, ledger: ReadLedger, enabled: bool) -> Self {
        Self {
            sandbox,
            ledger,
            enabled,
        }
    }

    fn extract(args: &ToolArgs) -> Result<(String, Option<usize>, Option<usize>), ToolError> {
        let file_path = params::require_str(args, "file_path")?;
        let read_line = |key: &str| -> Result<Option<usize>, ToolError> {
            match args.get(key) {
                None | Some(serde_json::Value::Null) => Ok(None),
                Some(_) => {
                    let n = params::require_int(args, key)?;
                    if n < 1 {
                        return Err(ToolError::invalid_param(key, "must be at least 1"));
                    }
                    Ok(Some(n as usize))
                }
            }
        };
        let start_line = read_line("start_line")?;
        let end_line = read_line("end_line")?;
        if let (Some(start), Some(end)) = (start_line, end_line)
            && end < start
        {
            return Err(ToolError::invalid_param(
                "end_line",
                &format!("{} is before start_line {}", end, start),
            ));
        }
        if end_line.is_some() && start_line.is_none() {
            return Err(ToolError::invalid_param(
                "end_line",
                "requires start_line",
            ));
        }
        Ok((file_path, start_line, end_line))
    }
}

#[async_trait]
impl Tool for ReadTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Read a file entirely, or a 1-indexed inclusive line range.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path of the file to read"
                    },
                    "start_line": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "First line to read (1-indexed)"
                    },
                    "end_line": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Last line to read (inclusive)"
                    }
                },
                "required": ["file_path"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let (file_path, _, _) = Self::extract(args)?;
        self.sandbox.validate(std::path::Path::new(&file_path))?;
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        let (file_path, start_line, end_line) = match Self::extract(&args) {
            Ok(parts) => parts,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };
        let resolved = match self.sandbox.validate(std::path::Path::new(&file_path)) {
            Ok(p) => p,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        if !resolved.exists() {
            return Ok(ToolResult::failure(
                Self::NAME,
                args,
                ToolError::NotFound(format!("file not found: {}", file_path)),
            ));
        }
        if !resolved.is_file() {
            return Ok(ToolResult::failure(
                Self::NAME,
                args,
                ToolError::Validation(format!("not a file: {}", file_path)),
            ));
        }

        let size = match std::fs::metadata(&resolved) {
            Ok(meta) => meta.len(),
            Err(e) => {
                return Ok(ToolResult::failure(
                    Self::NAME,
                    args,
                    ToolError::Internal(format!("cannot stat {}: {}", file_path, e)),
                ));
            }
        };
        if size > MAX_READ_BYTES {
            return Ok(ToolResult::failure(
                Self::NAME,
                args,
                ToolError::Validation(format!(
                    "file too large ({} bytes, max {})",
                    size, MAX_READ_BYTES
                )),
            ));
        }

        let full = match std::fs::read_to_string(&resolved) {
            Ok(content) => content,
            Err(e) => {
                return Ok(ToolResult::failure(
                    Self::NAME,
                    args,
                    ToolError::Internal(format!("error reading {}: {}", file_path, e)),
                ));
            }
        };

        let content = if let Some(start) = start_line {
            let lines: Vec<&str> = full.lines().collect();
            if start > lines.len() {
                return Ok(ToolResult::failure(
                    Self::NAME,
                    args,
                    ToolError::Validation(format!(
                        "start_line {} is beyond end of file ({} lines)",
                        start,
                        lines.len()
                    )),
                ));
            }
            let end = end_line.unwrap_or(lines.len()).min(lines.len());
            lines[start - 1..end].join("\n")
        } else {
            full
        };

        self.ledger.record(&resolved);

        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::FileRead {
                file_path,
                content,
                size,
                start_line,
                end_line,
            },
        ))
    }
}

#[cfg(test)]
mod tests;
