use async_trait::async_trait;
use serde_json::json;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use crate::errors::ToolError;
use crate::policy::PathSandbox;
use crate::tools::base::{Tool, ToolArgs, ToolData, ToolDefinition, ToolResult};
use crate::tools::params;

const DEFAULT_MAX_DEPTH: u64 = 3;
const MAX_ENTRIES: usize = 500;

pub struct TreeTool {
    sandbox: Arc<PathSandbox>,
    enabled: bool,
}

impl TreeTool {
    pub const NAME: &'static str = "tree";

    pub fn new(sandbox: Arc<PathSandbox>, enabled: bool) -> Self {
        Self { sandbox, enabled }
    }
}

#[async_trait]
impl Tool for TreeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Render a depth-bounded directory tree.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Root directory" },
                    "max_depth": { "type": "integer", "minimum": 1, "default": DEFAULT_MAX_DEPTH },
                    "show_hidden": { "type": "boolean", "default": false }
                },
                "required": ["path"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let path = params::require_str(args, "path")?;
        let depth = params::optional_uint(args, "max_depth", DEFAULT_MAX_DEPTH)?;
        if depth == 0 {
            return Err(ToolError::invalid_param("max_depth", "must be at least 1"));
        }
        params::optional_bool(args, "show_hidden", false)?;
        self.sandbox.validate(Path::new(&path))?;
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        if let Err(err) = self.validate(&args) {
            return Ok(ToolResult::failure(Self::NAME, args, err));
        }
        let path = params::require_str(&args, "path").expect("validated");
        let max_depth = params::optional_uint(&args, "max_depth", DEFAULT_MAX_DEPTH)
            .expect("validated") as usize;
        let show_hidden = params::optional_bool(&args, "show_hidden", false).expect("validated");

        let root = match self.sandbox.validate(Path::new(&path)) {
            Ok(p) => p,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };
        if !root.is_dir() {
            return Ok(ToolResult::failure(
                Self::NAME,
                args,
                ToolError::NotFound(format!("not a directory: {}", path)),
            ));
        }

        let mut rendered = format!("{}\n", path);
        let mut dirs = 0usize;
        let mut files = 0usize;
        let mut entries = 0usize;
        let mut truncated = false;

        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name();
        for entry in walker.into_iter().filter_map(Result::ok) {
            let name = entry.file_name().to_string_lossy();
            if !show_hidden && name.starts_with('.') {
                continue;
            }
            if entries >= MAX_ENTRIES {
                truncated = true;
                break;
            }
            entries += 1;
            let depth = entry.depth();
            let is_dir = entry.file_type().is_dir();
            if is_dir {
                dirs += 1;
            } else {
                files += 1;
            }
            let _ = writeln!(
                rendered,
                "{}{}{}",
                "  ".repeat(depth),
                name,
                if is_dir { "/" } else { "" }
            );
        }
        if truncated {
            rendered.push_str("  … (truncated)\n");
        }

        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::Tree {
                root: path,
                rendered,
                dirs,
                files,
            },
        ))
    }
}
