use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::a2a::types::TaskState;
use crate::errors::ToolError;
use crate::tools::render::{self, FormatMode};

/// Decoded argument map from a model tool call. Values arrive as whatever
/// JSON the model produced; the `params` module coerces them.
pub type ToolArgs = HashMap<String, Value>;

/// Model-facing tool descriptor. `parameters` is a JSON-Schema-like tree
/// passed verbatim to the model's function-calling API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// An ordered image attachment on a tool result (screenshots, fetched media).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub display_name: String,
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(de)?))
    }
}

/// One grep hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrepMatch {
    pub file: String,
    pub line: u64,
    pub text: String,
}

/// Per-file grep match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrepCount {
    pub file: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
}

/// Per-artifact download report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub artifact_id: String,
    pub local_path: String,
    pub size: u64,
    pub downloaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tool-specific result payload. One tagged variant per tool, so consumers
/// never have to guess at a generic blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolData {
    FileRead {
        file_path: String,
        content: String,
        size: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        start_line: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_line: Option<usize>,
    },
    FileWrite {
        file_path: String,
        bytes_written: usize,
        created: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        backup_path: Option<String>,
        chunked: bool,
        /// False while a chunked write is still being staged.
        durable: bool,
    },
    FileEdit {
        file_path: String,
        replacements: usize,
    },
    MultiEdit {
        file_path: String,
        applied: usize,
        requested: usize,
    },
    Delete {
        path: String,
        deleted_files: Vec<String>,
        deleted_dirs: Vec<String>,
        total_files_deleted: usize,
        total_dirs_deleted: usize,
        wildcard_expanded: bool,
        errors: Vec<String>,
    },
    Grep {
        pattern: String,
        output_mode: String,
        files: Vec<String>,
        matches: Vec<GrepMatch>,
        counts: Vec<GrepCount>,
        total: u64,
        truncated: bool,
    },
    Tree {
        root: String,
        rendered: String,
        dirs: usize,
        files: usize,
    },
    Bash {
        command: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        output: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        background_id: Option<String>,
    },
    ShellKill {
        shell_id: String,
        forced: bool,
    },
    Todo {
        items: Vec<TodoItem>,
    },
    WebFetch {
        url: String,
        status: u16,
        content: String,
        content_type: String,
        truncated: bool,
    },
    WebSearch {
        query: String,
        engine: String,
        results: Vec<SearchHit>,
        total: usize,
        time_ms: u64,
    },
    GitHub {
        resource: String,
        content: String,
    },
    Computer {
        action: String,
        detail: String,
    },
    TaskSubmit {
        task_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context_id: Option<String>,
        agent_url: String,
        continuation: bool,
        message: String,
    },
    TaskQuery {
        task_id: String,
        state: TaskState,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_message: Option<String>,
        artifact_count: usize,
    },
    /// Terminal payload composed by a polling worker.
    TaskResult {
        task_id: String,
        agent_url: String,
        state: TaskState,
        message: String,
    },
    ArtifactDownload {
        task_id: String,
        directory: String,
        artifacts: Vec<ArtifactReport>,
    },
    Mcp {
        server_name: String,
        tool_name: String,
        content: String,
    },
}

/// The result of one tool execution. Expected failures are encoded as
/// `success = false` with `error` set; `data` carries the tool-specific
/// payload on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub arguments: ToolArgs,
    pub success: bool,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ToolData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
}

impl ToolResult {
    pub fn success(tool_name: &str, arguments: ToolArgs, data: ToolData) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            arguments,
            success: true,
            duration: Duration::ZERO,
            error: None,
            data: Some(data),
            metadata: None,
            images: Vec::new(),
        }
    }

    pub fn failure(tool_name: &str, arguments: ToolArgs, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            arguments,
            success: false,
            duration: Duration::ZERO,
            error: Some(error),
            data: None,
            metadata: None,
            images: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value);
        self
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.images.push(image);
        self
    }
}

/// Argument keys collapsed in UI rendering: model-supplied prose that would
/// otherwise dominate the terminal.
pub const COLLAPSED_ARGS: &[&str] = &["content", "data", "text", "metadata", "task_description"];

/// The uniform capability set every tool exposes.
///
/// Polymorphism is by this capability set, not inheritance: local, remote,
/// A2A, and MCP-wrapped tools are interchangeable at the registry level.
/// `definition`, `is_enabled`, `validate`, and the formatting hooks are pure;
/// only `execute` may perform I/O.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Descriptor for model-facing discovery. Must be a pure function of the
    /// configuration: stable across runs, no resource allocation.
    fn definition(&self) -> ToolDefinition;

    /// Combines the global tools switch with any per-tool switch.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Reject anything `execute` would reject for structural reasons
    /// (missing keys, wrong types, out-of-range numbers, disallowed paths or
    /// commands). Must not perform I/O.
    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError>;

    /// Run the tool. Expected failures come back as `success = false`
    /// results; only unexpected faults may surface as `Err`.
    async fn execute(&self, cancel: CancellationToken, args: ToolArgs)
    -> anyhow::Result<ToolResult>;

    /// One-line summary of a result for the UI status line.
    fn preview(&self, result: &ToolResult) -> String {
        render::default_preview(result)
    }

    fn should_collapse_arg(&self, key: &str) -> bool {
        COLLAPSED_ARGS.contains(&key)
    }

    fn should_always_expand(&self) -> bool {
        false
    }

    /// Render a result for one of the three consumers.
    fn format_result(&self, result: &ToolResult, mode: FormatMode) -> String {
        match mode {
            FormatMode::Short => self.preview(result),
            FormatMode::Ui => {
                let call = render::call_line(&result.tool_name, &result.arguments, &|key| {
                    !self.should_always_expand() && self.should_collapse_arg(key)
                });
                let icon = if result.success { "✓" } else { "✗" };
                format!("{}\n└─ {} {}", call, icon, self.preview(result))
            }
            FormatMode::Llm => render::llm_block(result),
        }
    }
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.definition().name)
            .finish()
    }
}

/// Tracks which files have been read this session. Handed to the edit tools
/// at construction so they can require a prior read without holding a
/// registry back-pointer.
#[derive(Clone, Default)]
pub struct ReadLedger {
    inner: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ReadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: &Path) {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(path.to_path_buf());
    }

    pub fn has_read(&self, path: &Path) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(path)
    }
}
