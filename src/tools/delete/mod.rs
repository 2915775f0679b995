use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::ToolError;
use crate::policy::PathSandbox;
use crate::tools::base::{Tool, ToolArgs, ToolData, ToolDefinition, ToolResult};
use crate::tools::params;

pub struct DeleteTool {
    sandbox: Arc<PathSandbox>,
    enabled: bool,
}

fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Deepest literal parent of a wildcard pattern. This is what the sandbox
/// checks before any expansion happens, so globbing never reads directories
/// outside the policy.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in std::path::Path::new(pattern).components() {
        if component.as_os_str().to_string_lossy().contains(['*', '?', '[']) {
            break;
        }
        prefix.push(component);
    }
    if prefix.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        prefix
    }
}

impl DeleteTool {
    pub const NAME: &'static str = "delete";

    pub fn new(sandbox: Arc<PathSandbox>, enabled: bool) -> Self {
        Self { sandbox, enabled }
    }

    fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>, ToolError> {
        let paths = glob::glob(pattern)
            .map_err(|e| ToolError::invalid_param("path", &format!("bad pattern: {}", e)))?;
        let mut matches = Vec::new();
        for entry in paths {
            match entry {
                Ok(p) => matches.push(p),
                Err(e) => debug!("glob entry error for '{}': {}", pattern, e),
            }
        }
        matches.sort();
        Ok(matches)
    }
}

#[async_trait]
impl Tool for DeleteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Delete a file, directory, or wildcard pattern (*, ?, [) expanded \
                          relative to the working directory. Directories need recursive=true; \
                          missing paths need force=true."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path or wildcard pattern to delete"
                    },
                    "recursive": { "type": "boolean", "default": false },
                    "force": {
                        "type": "boolean",
                        "default": false,
                        "description": "Skip per-path errors and tolerate missing paths"
                    }
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
        params::optional_bool(args, "recursive", false)?;
        params::optional_bool(args, "force", false)?;
        if is_wildcard(&path) {
            // The literal parent is checked here; each match is checked
            // again after expansion.
            self.sandbox.validate(&literal_prefix(&path))?;
        } else {
            self.sandbox.validate(std::path::Path::new(&path))?;
        }
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        let path = match params::require_str(&args, "path") {
            Ok(p) => p,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };
        let recursive = params::optional_bool(&args, "recursive", false).unwrap_or(false);
        let force = params::optional_bool(&args, "force", false).unwrap_or(false);

        let wildcard_expanded = is_wildcard(&path);
        let targets = if wildcard_expanded {
            // Sandbox gate on the literal parent before expansion.
            if let Err(err) = self.sandbox.validate(&literal_prefix(&path)) {
                return Ok(ToolResult::failure(Self::NAME, args, err));
            }
            match self.expand(&path) {
                Ok(t) => t,
                Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
            }
        } else {
            vec![PathBuf::from(&path)]
        };

        let mut deleted_files = Vec::new();
        let mut deleted_dirs = Vec::new();
        let mut errors = Vec::new();

        for target in targets {
            // Sandbox gate before touching anything.
            let resolved = match self.sandbox.validate(&target) {
                Ok(p) => p,
                Err(err) => {
                    if force {
                        errors.push(err.to_string());
                        continue;
                    }
                    return Ok(ToolResult::failure(Self::NAME, args, err));
                }
            };

            if !resolved.exists() {
                if force {
                    continue;
                }
                return Ok(ToolResult::failure(
                    Self::NAME,
                    args,
                    ToolError::NotFound(format!("path not found: {}", target.display())),
                ));
            }

            if resolved.is_dir() {
                if !recursive {
                    let err = ToolError::Validation(format!(
                        "{} is a directory; set recursive=true to delete it",
                        target.display()
                    ));
                    if force {
                        errors.push(err.to_string());
                        continue;
                    }
                    return Ok(ToolResult::failure(Self::NAME, args, err));
                }
                match std::fs::remove_dir_all(&resolved) {
                    Ok(()) => deleted_dirs.push(resolved.display().to_string()),
                    Err(e) => {
                        let err =
                            ToolError::Internal(format!("cannot delete {}: {}", target.display(), e));
                        if force {
                            errors.push(err.to_string());
                            continue;
                        }
                        return Ok(ToolResult::failure(Self::NAME, args, err));
                    }
                }
            } else {
                match std::fs::remove_file(&resolved) {
                    Ok(()) => deleted_files.push(resolved.display().to_string()),
                    Err(e) => {
                        let err =
                            ToolError::Internal(format!("cannot delete {}: {}", target.display(), e));
                        if force {
                            errors.push(err.to_string());
                            continue;
                        }
                        return Ok(ToolResult::failure(Self::NAME, args, err));
                    }
                }
            }
        }

        let total_files_deleted = deleted_files.len();
        let total_dirs_deleted = deleted_dirs.len();
        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::Delete {
                path,
                deleted_files,
                deleted_dirs,
                total_files_deleted,
                total_dirs_deleted,
                wildcard_expanded,
                errors,
            },
        ))
    }
}
