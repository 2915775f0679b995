use super::*;
use crate::errors::ToolError;
use crate::tools::base::ToolData;
use serde_json::json;
use std::collections::HashMap;

fn args(pairs: &[(&str, Value)]) -> ToolArgs {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[test]
fn test_call_line_sorts_and_renders() {
    let a = args(&[("path", json!("/tmp/x")), ("force", json!(true))]);
    let line = call_line("delete", &a, &|_| false);
    assert_eq!(line, "delete(force: true, path: /tmp/x)");
}

#[test]
fn test_call_line_collapses_marked_keys() {
    let a = args(&[
        ("file_path", json!("/tmp/x")),
        ("content", json!("a very long body that should not appear")),
    ]);
    let line = call_line("write", &a, &|k| k == "content");
    assert_eq!(line, "write(content: …, file_path: /tmp/x)");
}

#[test]
fn test_call_line_truncates_long_values() {
    let a = args(&[("pattern", json!("x".repeat(200)))]);
    let line = call_line("grep", &a, &|_| false);
    assert!(line.len() < 120);
    assert!(line.contains('…'));
}

#[test]
fn test_default_preview_for_error() {
    let result = ToolResult::failure(
        "read",
        HashMap::new(),
        ToolError::NotFound("file not found: /tmp/missing".into()),
    );
    assert_eq!(default_preview(&result), "file not found: /tmp/missing");
}

#[test]
fn test_default_preview_for_delete() {
    let result = ToolResult::success(
        "delete",
        HashMap::new(),
        ToolData::Delete {
            path: "*.txt".into(),
            deleted_files: vec!["a.txt".into(), "b.txt".into()],
            deleted_dirs: vec![],
            total_files_deleted: 2,
            total_dirs_deleted: 0,
            wildcard_expanded: true,
            errors: vec![],
        },
    );
    assert_eq!(default_preview(&result), "Deleted 2 file(s) and 0 directories");
}

#[test]
fn test_llm_block_contains_header_and_data() {
    let mut result = ToolResult::success(
        "grep",
        HashMap::new(),
        ToolData::Grep {
            pattern: "fn main".into(),
            output_mode: "count".into(),
            files: vec![],
            matches: vec![],
            counts: vec![],
            total: 3,
            truncated: false,
        },
    );
    result.duration = std::time::Duration::from_millis(42);
    let block = llm_block(&result);
    assert!(block.starts_with("## grep (42 ms, success)"));
    assert!(block.contains("\"total\": 3"));
    // Arguments are never echoed in the data section
    assert!(!block.contains("arguments"));
}

#[test]
fn test_llm_block_includes_full_error() {
    let result = ToolResult::failure(
        "bash",
        HashMap::new(),
        ToolError::Policy("command 'rm -rf /' is not whitelisted".into()),
    );
    let block = llm_block(&result);
    assert!(block.contains("error (policy)"));
    assert!(block.contains("not whitelisted"));
}

#[test]
fn test_llm_block_metadata_footer() {
    let result = ToolResult::success(
        "tree",
        HashMap::new(),
        ToolData::Tree {
            root: "/w".into(),
            rendered: String::new(),
            dirs: 1,
            files: 2,
        },
    )
    .with_metadata("elapsed_walk_ms", json!(7));
    let block = llm_block(&result);
    assert!(block.contains("---"));
    assert!(block.contains("elapsed_walk_ms: 7"));
}
