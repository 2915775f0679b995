use async_trait::async_trait;
use regex::RegexBuilder;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::ToolError;
use crate::policy::PathSandbox;
use crate::tools::base::{
    GrepCount, GrepMatch, Tool, ToolArgs, ToolData, ToolDefinition, ToolResult,
};
use crate::tools::params;
use crate::utils::subprocess::scrubbed_command;

/// Default cap on returned entries when the caller gives no head_limit.
const DEFAULT_HEAD_LIMIT: u64 = 250;

/// Files larger than this are skipped by the native walker.
const MAX_SEARCH_FILE_BYTES: u64 = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Content,
    FilesWithMatches,
    Count,
}

impl OutputMode {
    fn parse(s: &str) -> Result<Self, ToolError> {
        match s {
            "content" => Ok(Self::Content),
            "files_with_matches" => Ok(Self::FilesWithMatches),
            "count" => Ok(Self::Count),
            other => Err(ToolError::invalid_param(
                "output_mode",
                &format!("'{}' is not one of content, files_with_matches, count", other),
            )),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::FilesWithMatches => "files_with_matches",
            Self::Count => "count",
        }
    }
}

struct GrepRequest {
    pattern: String,
    path: String,
    output_mode: OutputMode,
    glob: Option<String>,
    file_type: Option<String>,
    case_insensitive: bool,
    line_numbers: bool,
    after: Option<u64>,
    before: Option<u64>,
    context: Option<u64>,
    multiline: bool,
    head_limit: u64,
}

/// Extensions for the supported `type` filter names (mirrors the common
/// ripgrep type names).
fn type_extensions(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "rust" => Some(&["rs"]),
        "py" | "python" => Some(&["py"]),
        "js" => Some(&["js", "jsx", "mjs", "cjs"]),
        "ts" => Some(&["ts", "tsx"]),
        "go" => Some(&["go"]),
        "java" => Some(&["java"]),
        "c" => Some(&["c", "h"]),
        "cpp" => Some(&["cc", "cpp", "cxx", "hpp", "hh"]),
        "ruby" => Some(&["rb"]),
        "sh" => Some(&["sh", "bash"]),
        "md" | "markdown" => Some(&["md", "markdown"]),
        "json" => Some(&["json"]),
        "yaml" => Some(&["yaml", "yml"]),
        "toml" => Some(&["toml"]),
        "html" => Some(&["html", "htm"]),
        "css" => Some(&["css", "scss"]),
        _ => None,
    }
}

pub struct GrepTool {
    sandbox: Arc<PathSandbox>,
    enabled: bool,
    /// Resolved ripgrep binary, detected once at construction. `None` makes
    /// the tool fall back to the native walker.
    rg_path: Option<PathBuf>,
}

impl GrepTool {
    pub const NAME: &'static str = "grep";

    pub fn new(sandbox: Arc<PathSandbox>, enabled: bool) -> Self {
        let rg_path = which::which("rg").ok();
        if rg_path.is_none() {
            debug!("ripgrep not found on PATH; grep uses the native walker");
        }
        Self {
            sandbox,
            enabled,
            rg_path,
        }
    }

    #[cfg(test)]
    fn without_ripgrep(sandbox: Arc<PathSandbox>) -> Self {
        Self {
            sandbox,
            enabled: true,
            rg_path: None,
        }
    }

    fn extract(args: &ToolArgs) -> Result<GrepRequest, ToolError> {
        let pattern = params::require_str(args, "pattern")?;
        let output_mode = OutputMode::parse(
            &params::optional_str(args, "output_mode")
                .unwrap_or_else(|| "files_with_matches".to_string()),
        )?;

        // The pattern must compile; multiline turns on dot-matches-newline.
        RegexBuilder::new(&pattern)
            .multi_line(true)
            .dot_matches_new_line(args.get("multiline").is_some())
            .build()
            .map_err(|e| ToolError::invalid_param("pattern", &format!("bad regex: {}", e)))?;

        let read_ctx = |key: &str| -> Result<Option<u64>, ToolError> {
            match args.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(_) => Ok(Some(params::optional_uint(args, key, 0)?)),
            }
        };
        let after = read_ctx("-A")?;
        let before = read_ctx("-B")?;
        let context = read_ctx("-C")?;
        if output_mode != OutputMode::Content && (after.is_some() || before.is_some() || context.is_some()) {
            return Err(ToolError::Validation(
                "-A/-B/-C are only valid when output_mode is content".to_string(),
            ));
        }

        if let Some(t) = params::optional_str(args, "type")
            && type_extensions(&t).is_none()
        {
            return Err(ToolError::invalid_param("type", &format!("unknown type '{}'", t)));
        }

        Ok(GrepRequest {
            pattern,
            path: params::optional_str(args, "path").unwrap_or_else(|| ".".to_string()),
            output_mode,
            glob: params::optional_str(args, "glob"),
            file_type: params::optional_str(args, "type"),
            case_insensitive: params::optional_bool(args, "-i", false)?,
            line_numbers: params::optional_bool(args, "-n", true)?,
            after,
            before,
            context,
            multiline: params::optional_bool(args, "multiline", false)?,
            head_limit: params::optional_uint(args, "head_limit", DEFAULT_HEAD_LIMIT)?,
        })
    }

    async fn run_ripgrep(
        &self,
        rg: &Path,
        request: &GrepRequest,
        root: &Path,
    ) -> Result<(Vec<GrepMatch>, Vec<String>, Vec<GrepCount>), ToolError> {
        let mut cmd = scrubbed_command(&rg.to_string_lossy());
        match request.output_mode {
            OutputMode::Content => {
                cmd.arg("--json");
                if let Some(n) = request.context {
                    cmd.arg("-C").arg(n.to_string());
                } else {
                    if let Some(n) = request.after {
                        cmd.arg("-A").arg(n.to_string());
                    }
                    if let Some(n) = request.before {
                        cmd.arg("-B").arg(n.to_string());
                    }
                }
            }
            OutputMode::FilesWithMatches => {
                cmd.arg("-l");
            }
            OutputMode::Count => {
                cmd.arg("--count");
            }
        }
        if request.case_insensitive {
            cmd.arg("-i");
        }
        if request.multiline {
            cmd.arg("--multiline").arg("--multiline-dotall");
        }
        if let Some(g) = &request.glob {
            cmd.arg("--glob").arg(g);
        }
        if let Some(t) = &request.file_type {
            cmd.arg("--type").arg(t);
        }
        cmd.arg("--").arg(&request.pattern).arg(root);

        let output = cmd
            .output()
            .await
            .map_err(|e| ToolError::Internal(format!("failed to run ripgrep: {}", e)))?;

        // rg exits 1 on "no matches", which is a normal empty result.
        if let Some(code) = output.status.code()
            && code > 1
        {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::Internal(format!(
                "ripgrep failed ({}): {}",
                code,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut matches = Vec::new();
        let mut files = Vec::new();
        let mut counts = Vec::new();

        match request.output_mode {
            OutputMode::Content => {
                for line in stdout.lines() {
                    let Ok(event) = serde_json::from_str::<Value>(line) else {
                        continue;
                    };
                    let kind = event["type"].as_str().unwrap_or("");
                    if kind != "match" && kind != "context" {
                        continue;
                    }
                    let data = &event["data"];
                    let file = data["path"]["text"].as_str().unwrap_or("").to_string();
                    let line_number = data["line_number"].as_u64().unwrap_or(0);
                    let text = data["lines"]["text"]
                        .as_str()
                        .unwrap_or("")
                        .trim_end_matches('\n')
                        .to_string();
                    matches.push(GrepMatch {
                        file,
                        line: line_number,
                        text,
                    });
                }
            }
            OutputMode::FilesWithMatches => {
                files = stdout
                    .lines()
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect();
            }
            OutputMode::Count => {
                for line in stdout.lines() {
                    if let Some((file, count)) = line.rsplit_once(':')
                        && let Ok(count) = count.parse::<u64>()
                    {
                        counts.push(GrepCount {
                            file: file.to_string(),
                            count,
                        });
                    }
                }
            }
        }

        Ok((matches, files, counts))
    }

    /// Built-in walker used when ripgrep is absent. Same public result shape,
    /// no performance promises.
    fn run_native(
        request: &GrepRequest,
        root: &Path,
    ) -> Result<(Vec<GrepMatch>, Vec<String>, Vec<GrepCount>), ToolError> {
        let regex = RegexBuilder::new(&request.pattern)
            .case_insensitive(request.case_insensitive)
            .multi_line(true)
            .dot_matches_new_line(request.multiline)
            .build()
            .map_err(|e| ToolError::invalid_param("pattern", &format!("bad regex: {}", e)))?;

        let glob_pattern = match &request.glob {
            Some(g) => Some(glob::Pattern::new(g).map_err(|e| {
                ToolError::invalid_param("glob", &format!("bad glob: {}", e))
            })?),
            None => None,
        };
        let extensions = request
            .file_type
            .as_deref()
            .and_then(type_extensions);

        let mut matches = Vec::new();
        let mut files = Vec::new();
        let mut counts = Vec::new();

        let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
        for entry in walker.into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            // Skip hidden entries below the search root (.git and friends)
            let rel = path.strip_prefix(root).unwrap_or(path);
            if rel.components().any(|c| {
                c.as_os_str()
                    .to_str()
                    .is_some_and(|s| s.starts_with('.') && s.len() > 1)
            }) {
                continue;
            }
            if let Some(exts) = extensions {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if !exts.contains(&ext) {
                    continue;
                }
            }
            if let Some(gp) = &glob_pattern {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if !gp.matches(name) && !gp.matches(&rel.to_string_lossy()) {
                    continue;
                }
            }
            if entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX) > MAX_SEARCH_FILE_BYTES {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(path) else {
                continue; // non-UTF-8 or unreadable
            };

            let display = path.display().to_string();
            if request.multiline {
                let count = regex.find_iter(&content).count() as u64;
                if count == 0 {
                    continue;
                }
                match request.output_mode {
                    OutputMode::FilesWithMatches => files.push(display),
                    OutputMode::Count => counts.push(GrepCount {
                        file: display,
                        count,
                    }),
                    OutputMode::Content => {
                        for m in regex.find_iter(&content) {
                            let line = content[..m.start()].lines().count().max(1) as u64;
                            let text = m.as_str().lines().next().unwrap_or("").to_string();
                            matches.push(GrepMatch {
                                file: display.clone(),
                                line,
                                text,
                            });
                        }
                    }
                }
                continue;
            }

            let lines: Vec<&str> = content.lines().collect();
            let hit_lines: Vec<usize> = lines
                .iter()
                .enumerate()
                .filter(|(_, l)| regex.is_match(l))
                .map(|(i, _)| i)
                .collect();
            if hit_lines.is_empty() {
                continue;
            }

            match request.output_mode {
                OutputMode::FilesWithMatches => files.push(display),
                OutputMode::Count => counts.push(GrepCount {
                    file: display,
                    count: hit_lines.len() as u64,
                }),
                OutputMode::Content => {
                    let before = request.context.or(request.before).unwrap_or(0) as usize;
                    let after = request.context.or(request.after).unwrap_or(0) as usize;
                    let mut emitted: BTreeSet<usize> = BTreeSet::new();
                    for &hit in &hit_lines {
                        let start = hit.saturating_sub(before);
                        let end = (hit + after).min(lines.len().saturating_sub(1));
                        for i in start..=end {
                            emitted.insert(i);
                        }
                    }
                    for i in emitted {
                        matches.push(GrepMatch {
                            file: display.clone(),
                            line: (i + 1) as u64,
                            text: lines[i].to_string(),
                        });
                    }
                }
            }
        }

        Ok((matches, files, counts))
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search file contents with a regex. Uses ripgrep when available, \
                          otherwise a built-in walker with the same result shape."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "pattern": { "type": "string", "description": "Regex to search for" },
                    "path": { "type": "string", "description": "File or directory to search" },
                    "output_mode": {
                        "type": "string",
                        "enum": ["content", "files_with_matches", "count"],
                        "default": "files_with_matches"
                    },
                    "glob": { "type": "string", "description": "Filter files by glob" },
                    "type": { "type": "string", "description": "Filter files by type (rust, py, js, ...)" },
                    "-i": { "type": "boolean", "default": false, "description": "Case insensitive" },
                    "-n": { "type": "boolean", "default": true, "description": "Line numbers" },
                    "-A": { "type": "integer", "minimum": 0, "description": "Lines after each match" },
                    "-B": { "type": "integer", "minimum": 0, "description": "Lines before each match" },
                    "-C": { "type": "integer", "minimum": 0, "description": "Context lines around each match" },
                    "multiline": { "type": "boolean", "default": false },
                    "head_limit": { "type": "integer", "minimum": 1 }
                },
                "required": ["pattern"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let request = Self::extract(args)?;
        self.sandbox.validate(Path::new(&request.path))?;
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
        let root = match self.sandbox.validate(Path::new(&request.path)) {
            Ok(p) => p,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };
        if !root.exists() {
            return Ok(ToolResult::failure(
                Self::NAME,
                args,
                ToolError::NotFound(format!("search path not found: {}", request.path)),
            ));
        }

        let outcome = match &self.rg_path {
            Some(rg) => self.run_ripgrep(rg, &request, &root).await,
            None => Self::run_native(&request, &root),
        };
        let (mut matches, mut files, mut counts) = match outcome {
            Ok(found) => found,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        let total = match request.output_mode {
            OutputMode::Content => matches.len() as u64,
            OutputMode::FilesWithMatches => files.len() as u64,
            OutputMode::Count => counts.iter().map(|c| c.count).sum(),
        };

        let limit = request.head_limit as usize;
        let truncated = match request.output_mode {
            OutputMode::Content => {
                let t = matches.len() > limit;
                matches.truncate(limit);
                t
            }
            OutputMode::FilesWithMatches => {
                let t = files.len() > limit;
                files.truncate(limit);
                t
            }
            OutputMode::Count => {
                let t = counts.len() > limit;
                counts.truncate(limit);
                t
            }
        };

        if !request.line_numbers {
            for m in &mut matches {
                m.line = 0;
            }
        }

        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::Grep {
                pattern: request.pattern,
                output_mode: request.output_mode.as_str().to_string(),
                files,
                matches,
                counts,
                total,
                truncated,
            },
        ))
    }
}
