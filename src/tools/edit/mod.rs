use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::ToolError;
use crate::policy::PathSandbox;
use crate::tools::base::{ReadLedger, Tool, ToolArgs, ToolData, ToolDefinition, ToolResult};
use crate::tools::params;

/// One string replacement inside a multi-edit request.
#[derive(Debug, Clone)]
struct Replacement {
    old_text: String,
    new_text: String,
    replace_all: bool,
}

fn extract_replacement(value: &Value, index: usize) -> Result<Replacement, ToolError> {
    let obj = value.as_object().ok_or_else(|| {
        ToolError::invalid_param("edits", &format!("edit #{} must be an object", index))
    })?;
    let old_text = obj
        .get("old_text")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ToolError::invalid_param("edits", &format!("edit #{} is missing old_text", index))
        })?
        .to_string();
    let new_text = obj
        .get("new_text")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ToolError::invalid_param("edits", &format!("edit #{} is missing new_text", index))
        })?
        .to_string();
    let replace_all = obj
        .get("replace_all")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(Replacement {
        old_text,
        new_text,
        replace_all,
    })
}

/// Apply one replacement to `content`. Errors when the needle is absent or
/// ambiguous without `replace_all`.
fn apply_replacement(
    content: &str,
    edit: &Replacement,
    index: usize,
) -> Result<(String, usize), ToolError> {
    let count = content.matches(&edit.old_text).count();
    if count == 0 {
        return Err(ToolError::Validation(format!(
            "edit #{}: old_text not found in file (it must match exactly)",
            index
        )));
    }
    if count > 1 && !edit.replace_all {
        return Err(ToolError::Validation(format!(
            "edit #{}: old_text appears {} times; add surrounding context or set replace_all",
            index, count
        )));
    }
    if edit.replace_all {
        Ok((content.replace(&edit.old_text, &edit.new_text), count))
    } else {
        Ok((content.replacen(&edit.old_text, &edit.new_text, 1), 1))
    }
}

/// Shared precondition: the file must exist, be inside the sandbox, and have
/// been read earlier this session.
fn load_target(
    sandbox: &PathSandbox,
    ledger: &ReadLedger,
    file_path: &str,
) -> Result<(std::path::PathBuf, String), ToolError> {
    let resolved = sandbox.validate(Path::new(file_path))?;
    if !resolved.exists() {
        return Err(ToolError::NotFound(format!("file not found: {}", file_path)));
    }
    if !ledger.has_read(&resolved) {
        return Err(ToolError::NotFound(format!(
            "file {} has not been read this session; read it before editing",
            file_path
        )));
    }
    let content = std::fs::read_to_string(&resolved)
        .map_err(|e| ToolError::Internal(format!("error reading {}: {}", file_path, e)))?;
    Ok((resolved, content))
}

pub struct EditTool {
    sandbox: Arc<PathSandbox>,
    ledger: ReadLedger,
    enabled: bool,
}

impl EditTool {
    pub const NAME: &'static str = "edit";

    pub fn new(sandbox: Arc<PathSandbox>, ledger: ReadLedger, enabled: bool) -> Self {
        Self {
            sandbox,
            ledger,
            enabled,
        }
    }
}

#[async_trait]
impl Tool for EditTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Replace old_text with new_text in a file previously read this session."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": { "type": "string" },
                    "old_text": { "type": "string", "description": "Exact text to find" },
                    "new_text": { "type": "string", "description": "Replacement text" },
                    "replace_all": { "type": "boolean", "default": false }
                },
                "required": ["file_path", "old_text", "new_text"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let file_path = params::require_str(args, "file_path")?;
        params::require_str(args, "old_text")?;
        if !args.contains_key("new_text") {
            return Err(ToolError::missing_param("new_text"));
        }
        self.sandbox.validate(Path::new(&file_path))?;
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
        let file_path = params::require_str(&args, "file_path").expect("validated");
        let edit = Replacement {
            old_text: params::require_str(&args, "old_text").expect("validated"),
            new_text: args["new_text"].as_str().unwrap_or_default().to_string(),
            replace_all: params::optional_bool(&args, "replace_all", false)
                .unwrap_or(false),
        };

        let (resolved, content) = match load_target(&self.sandbox, &self.ledger, &file_path) {
            Ok(parts) => parts,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        let (updated, replacements) = match apply_replacement(&content, &edit, 0) {
            Ok(parts) => parts,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        if let Err(e) = std::fs::write(&resolved, updated) {
            return Ok(ToolResult::failure(
                Self::NAME,
                args,
                ToolError::Internal(format!("error writing {}: {}", file_path, e)),
            ));
        }

        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::FileEdit {
                file_path,
                replacements,
            },
        ))
    }
}

pub struct MultiEditTool {
    sandbox: Arc<PathSandbox>,
    ledger: ReadLedger,
    enabled: bool,
}

impl MultiEditTool {
    pub const NAME: &'static str = "multi_edit";

    pub fn new(sandbox: Arc<PathSandbox>, ledger: ReadLedger, enabled: bool) -> Self {
        Self {
            sandbox,
            ledger,
            enabled,
        }
    }

    fn extract_edits(args: &ToolArgs) -> Result<Vec<Replacement>, ToolError> {
        let edits = args
            .get("edits")
            .and_then(Value::as_array)
            .ok_or_else(|| ToolError::missing_param("edits"))?;
        if edits.is_empty() {
            return Err(ToolError::invalid_param("edits", "must not be empty"));
        }
        edits
            .iter()
            .enumerate()
            .map(|(i, v)| extract_replacement(v, i))
            .collect()
    }
}

#[async_trait]
impl Tool for MultiEditTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Apply several ordered string replacements to one file atomically: \
                          either every edit applies or the file is untouched."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": { "type": "string" },
                    "edits": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "old_text": { "type": "string" },
                                "new_text": { "type": "string" },
                                "replace_all": { "type": "boolean", "default": false }
                            },
                            "required": ["old_text", "new_text"]
                        }
                    }
                },
                "required": ["file_path", "edits"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let file_path = params::require_str(args, "file_path")?;
        Self::extract_edits(args)?;
        self.sandbox.validate(Path::new(&file_path))?;
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        let file_path = match params::require_str(&args, "file_path") {
            Ok(p) => p,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };
        let edits = match Self::extract_edits(&args) {
            Ok(e) => e,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        let (resolved, mut content) = match load_target(&self.sandbox, &self.ledger, &file_path) {
            Ok(parts) => parts,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        // All edits are applied in memory first; any failure leaves the file
        // untouched.
        let requested = edits.len();
        let mut applied = 0;
        for (i, edit) in edits.iter().enumerate() {
            match apply_replacement(&content, edit, i) {
                Ok((updated, _)) => {
                    content = updated;
                    applied += 1;
                }
                Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
            }
        }

        if let Err(e) = std::fs::write(&resolved, content) {
            return Ok(ToolResult::failure(
                Self::NAME,
                args,
                ToolError::Internal(format!("error writing {}: {}", file_path, e)),
            ));
        }

        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::MultiEdit {
                file_path,
                applied,
                requested,
            },
        ))
    }
}
