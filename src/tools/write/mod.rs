use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::ToolError;
use crate::policy::PathSandbox;
use crate::tools::base::{Tool, ToolArgs, ToolData, ToolDefinition, ToolResult};
use crate::tools::params::{self, ChunkSpec};

/// Staged chunk sessions are evicted after this much idle time.
const CHUNK_SESSION_IDLE_SECS: u64 = 600;

struct ChunkSession {
    file_path: PathBuf,
    chunks: BTreeMap<u64, String>,
    total: Option<u64>,
    last_touched: Instant,
}

pub struct WriteTool {
    sandbox: std::sync::Arc<PathSandbox>,
    sessions: Mutex<HashMap<String, ChunkSession>>,
    enabled: bool,
}

struct WriteRequest {
    file_path: String,
    content: String,
    overwrite: bool,
    backup: bool,
    append: bool,
    chunk: Option<ChunkSpec>,
}

impl WriteTool {
    pub const NAME: &'static str = "write";

    pub fn new(sandbox: std::sync::Arc<PathSandbox>, enabled: bool) -> Self {
        Self {
            sandbox,
            sessions: Mutex::new(HashMap::new()),
            enabled,
        }
    }

    fn extract(args: &ToolArgs) -> Result<WriteRequest, ToolError> {
        let file_path = params::require_str(args, "file_path")?;
        // Empty content is a legitimate write, so require the key but not
        // the usual non-empty constraint.
        let content = match args.get("content") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(ToolError::invalid_param(
                    "content",
                    &format!("expected string, got {}", json_type(other)),
                ));
            }
            None => return Err(ToolError::missing_param("content")),
        };
        let overwrite = params::optional_bool(args, "overwrite", true)?;
        let backup = params::optional_bool(args, "backup", false)?;
        let append = params::optional_bool(args, "append", false)?;
        let chunk = params::chunk_spec(args)?;

        Ok(WriteRequest {
            file_path,
            content,
            overwrite,
            backup,
            append,
            chunk,
        })
    }

    /// Stage a chunk; returns the assembled content when this chunk
    /// finalizes the session.
    fn stage_chunk(
        &self,
        resolved: &PathBuf,
        content: String,
        spec: &ChunkSpec,
    ) -> Result<Option<String>, ToolError> {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions.retain(|_, s| s.last_touched.elapsed().as_secs() < CHUNK_SESSION_IDLE_SECS);

        let session = sessions
            .entry(spec.session_id.clone())
            .or_insert_with(|| ChunkSession {
                file_path: resolved.clone(),
                chunks: BTreeMap::new(),
                total: None,
                last_touched: Instant::now(),
            });

        if session.file_path != *resolved {
            return Err(ToolError::Validation(format!(
                "session '{}' is already writing {}",
                spec.session_id,
                session.file_path.display()
            )));
        }
        if let (Some(known), Some(given)) = (session.total, spec.total_chunks)
            && known != given
        {
            return Err(ToolError::Validation(format!(
                "session '{}' expects {} chunks, got total_chunks={}",
                spec.session_id, known, given
            )));
        }
        if session.total.is_none() {
            session.total = spec.total_chunks;
        }
        session.last_touched = Instant::now();
        session.chunks.insert(spec.chunk_index, content);

        if !spec.finalizes() {
            return Ok(None);
        }

        let expected = session.total.unwrap_or(spec.chunk_index + 1);
        let missing: Vec<u64> = (0..expected)
            .filter(|i| !session.chunks.contains_key(i))
            .collect();
        if !missing.is_empty() {
            return Err(ToolError::Validation(format!(
                "session '{}' is missing chunk(s) {:?}",
                spec.session_id, missing
            )));
        }

        let session = sessions
            .remove(&spec.session_id)
            .expect("session present under lock");
        Ok(Some(session.chunks.into_values().collect::<String>()))
    }

    /// The durable filesystem write, shared by plain and final-chunk paths.
    fn commit(
        resolved: &PathBuf,
        file_path: &str,
        content: &str,
        overwrite: bool,
        backup: bool,
        append: bool,
    ) -> Result<(usize, bool, Option<String>), ToolError> {
        let existed = resolved.exists();

        if existed && !overwrite && !append {
            return Err(ToolError::NotFound(format!(
                "file already exists: {} (set overwrite=true to replace it)",
                file_path
            )));
        }

        let backup_path = if backup && existed {
            let bak = PathBuf::from(format!("{}.bak", resolved.display()));
            std::fs::copy(resolved, &bak)
                .map_err(|e| ToolError::Internal(format!("backup failed: {}", e)))?;
            Some(bak.display().to_string())
        } else {
            None
        };

        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ToolError::Internal(format!("cannot create parent dirs: {}", e)))?;
        }

        if append {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(resolved)
                .map_err(|e| ToolError::Internal(format!("cannot open for append: {}", e)))?;
            file.write_all(content.as_bytes())
                .map_err(|e| ToolError::Internal(format!("append failed: {}", e)))?;
        } else {
            std::fs::write(resolved, content)
                .map_err(|e| ToolError::Internal(format!("write failed: {}", e)))?;
        }

        Ok((content.len(), !existed, backup_path))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl Tool for WriteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Write content to a file. Supports append mode, sibling backups, and \
                          chunked writes via session_id/chunk_index/total_chunks."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": { "type": "string", "description": "Target file path" },
                    "content": { "type": "string", "description": "Content to write" },
                    "overwrite": { "type": "boolean", "default": true },
                    "backup": { "type": "boolean", "default": false },
                    "append": { "type": "boolean", "default": false },
                    "session_id": { "type": "string", "description": "Chunked-write session" },
                    "chunk_index": { "type": "integer", "minimum": 0 },
                    "total_chunks": { "type": "integer", "minimum": 1 },
                    "is_last": { "type": "boolean", "default": false }
                },
                "required": ["file_path", "content"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let request = Self::extract(args)?;
        self.sandbox
            .validate(std::path::Path::new(&request.file_path))?;
        Ok(())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        let request = match Self::extract(&args) {
            Ok(r) => r,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };
        let resolved = match self
            .sandbox
            .validate(std::path::Path::new(&request.file_path))
        {
            Ok(p) => p,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        if let Some(spec) = &request.chunk {
            let staged_len = request.content.len();
            match self.stage_chunk(&resolved, request.content, spec) {
                Ok(None) => {
                    return Ok(ToolResult::success(
                        Self::NAME,
                        args,
                        ToolData::FileWrite {
                            file_path: request.file_path,
                            bytes_written: staged_len,
                            created: false,
                            backup_path: None,
                            chunked: true,
                            durable: false,
                        },
                    ));
                }
                Ok(Some(assembled)) => {
                    return Ok(
                        match Self::commit(
                            &resolved,
                            &request.file_path,
                            &assembled,
                            request.overwrite,
                            request.backup,
                            false,
                        ) {
                            Ok((bytes_written, created, backup_path)) => ToolResult::success(
                                Self::NAME,
                                args,
                                ToolData::FileWrite {
                                    file_path: request.file_path,
                                    bytes_written,
                                    created,
                                    backup_path,
                                    chunked: true,
                                    durable: true,
                                },
                            ),
                            Err(err) => ToolResult::failure(Self::NAME, args, err),
                        },
                    );
                }
                Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
            }
        }

        Ok(
            match Self::commit(
                &resolved,
                &request.file_path,
                &request.content,
                request.overwrite,
                request.backup,
                request.append,
            ) {
                Ok((bytes_written, created, backup_path)) => ToolResult::success(
                    Self::NAME,
                    args,
                    ToolData::FileWrite {
                        file_path: request.file_path,
                        bytes_written,
                        created,
                        backup_path,
                        chunked: false,
                        durable: true,
                    },
                ),
                Err(err) => ToolResult::failure(Self::NAME, args, err),
            },
        )
    }
}
