use serde_json::Value;

use crate::tools::base::{ToolArgs, ToolData, ToolResult};
use crate::utils::truncate_chars;

/// Rendering target for a tool result.
///
/// - `Ui`: call line plus a one-line status preview for the terminal.
/// - `Llm`: expanded block the model reads on its next turn.
/// - `Short`: the preview only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    Ui,
    Llm,
    Short,
}

const ARG_VALUE_MAX_CHARS: usize = 60;

/// Render the tool-call line: `name(key: value, other: …)`.
///
/// Arguments are sorted by key so the line is stable; collapsed keys render
/// as `<key>: …` with their length elided.
pub fn call_line(name: &str, args: &ToolArgs, collapse: &dyn Fn(&str) -> bool) -> String {
    let mut keys: Vec<&String> = args.keys().collect();
    keys.sort();

    let rendered: Vec<String> = keys
        .into_iter()
        .map(|key| {
            if collapse(key) {
                format!("{}: …", key)
            } else {
                format!("{}: {}", key, compact_value(&args[key]))
            }
        })
        .collect();

    format!("{}({})", name, rendered.join(", "))
}

fn compact_value(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_chars(raw.replace('\n', "\\n").as_str(), ARG_VALUE_MAX_CHARS, "…")
}

/// One-line summary derived from the result payload. Tools override
/// `preview` when they can say something better.
pub fn default_preview(result: &ToolResult) -> String {
    if !result.success {
        let msg = result
            .error
            .as_ref()
            .map_or_else(|| "failed".to_string(), std::string::ToString::to_string);
        return truncate_chars(msg.lines().next().unwrap_or("failed"), 120, "…");
    }

    match &result.data {
        Some(ToolData::FileRead {
            file_path, content, ..
        }) => format!("Read {} ({} lines)", file_path, content.lines().count()),
        Some(ToolData::FileWrite {
            file_path,
            bytes_written,
            durable,
            ..
        }) => {
            if *durable {
                format!("Wrote {} bytes to {}", bytes_written, file_path)
            } else {
                format!("Staged chunk for {}", file_path)
            }
        }
        Some(ToolData::FileEdit {
            file_path,
            replacements,
        }) => format!("Edited {} ({} replacement(s))", file_path, replacements),
        Some(ToolData::MultiEdit {
            file_path, applied, ..
        }) => format!("Applied {} edit(s) to {}", applied, file_path),
        Some(ToolData::Delete {
            total_files_deleted,
            total_dirs_deleted,
            ..
        }) => format!(
            "Deleted {} file(s) and {} director{}",
            total_files_deleted,
            total_dirs_deleted,
            if *total_dirs_deleted == 1 { "y" } else { "ies" }
        ),
        Some(ToolData::Grep { total, truncated, .. }) => {
            if *truncated {
                format!("{} match(es) (truncated)", total)
            } else {
                format!("{} match(es)", total)
            }
        }
        Some(ToolData::Tree { dirs, files, .. }) => {
            format!("{} director(ies), {} file(s)", dirs, files)
        }
        Some(ToolData::Bash {
            exit_code,
            background_id,
            ..
        }) => match background_id {
            Some(id) => format!("Running in background (shell {})", id),
            None => format!("Exited with code {}", exit_code.unwrap_or(-1)),
        },
        Some(ToolData::ShellKill { shell_id, forced }) => {
            if *forced {
                format!("Killed shell {} (forced)", shell_id)
            } else {
                format!("Stopped shell {}", shell_id)
            }
        }
        Some(ToolData::Todo { items }) => format!("{} todo item(s)", items.len()),
        Some(ToolData::WebFetch {
            status, content, ..
        }) => format!("HTTP {} ({} chars)", status, content.len()),
        Some(ToolData::WebSearch { total, engine, .. }) => {
            format!("{} result(s) via {}", total, engine)
        }
        Some(ToolData::GitHub { resource, .. }) => format!("GitHub {}", resource),
        Some(ToolData::Computer { action, .. }) => format!("Computer action: {}", action),
        Some(ToolData::TaskSubmit {
            task_id,
            continuation,
            ..
        }) => {
            if *continuation {
                format!("Resumed task {} (monitoring in background)", task_id)
            } else {
                format!("Submitted task {} (monitoring in background)", task_id)
            }
        }
        Some(ToolData::TaskQuery { task_id, state, .. }) => {
            format!("Task {} is {}", task_id, state)
        }
        Some(ToolData::TaskResult { task_id, state, .. }) => {
            format!("Task {} finished: {}", task_id, state)
        }
        Some(ToolData::ArtifactDownload {
            artifacts,
            directory,
            ..
        }) => {
            let ok = artifacts.iter().filter(|a| a.downloaded).count();
            format!("Downloaded {}/{} artifact(s) to {}", ok, artifacts.len(), directory)
        }
        Some(ToolData::Mcp { content, .. }) => {
            truncate_chars(content.lines().next().unwrap_or("(no output)"), 120, "…")
        }
        None => "ok".to_string(),
    }
}

/// Expanded block for the model: header, data section (the tool payload,
/// never the raw arguments), and a metadata footer.
pub fn llm_block(result: &ToolResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "## {} ({} ms, {})\n",
        result.tool_name,
        result.duration.as_millis(),
        if result.success { "success" } else { "failed" }
    ));

    if let Some(err) = &result.error {
        out.push_str(&format!("error ({}): {}\n", err.kind(), err));
    }

    if let Some(data) = &result.data {
        let rendered =
            serde_json::to_string_pretty(data).unwrap_or_else(|_| "(unrenderable)".to_string());
        out.push_str(&rendered);
        out.push('\n');
    }

    if !result.images.is_empty() {
        out.push_str(&format!("[{} image attachment(s)]\n", result.images.len()));
    }

    if let Some(metadata) = &result.metadata
        && !metadata.is_empty()
    {
        let mut keys: Vec<&String> = metadata.keys().collect();
        keys.sort();
        out.push_str("---\n");
        for key in keys {
            out.push_str(&format!("{}: {}\n", key, compact_value(&metadata[key])));
        }
    }

    out
}

#[cfg(test)]
mod tests;
