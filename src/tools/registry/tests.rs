use super::*;
use crate::tools::base::ToolData;
use async_trait::async_trait;
use serde_json::json;

struct FakeTool {
    name: &'static str,
    enabled: bool,
}

#[async_trait]
impl Tool for FakeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: "fake".to_string(),
            parameters: json!({
                "type": "object",
                "properties": { "value": { "type": "string" } },
                "required": ["value"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        if args.contains_key("value") {
            Ok(())
        } else {
            Err(ToolError::missing_param("value"))
        }
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        Ok(ToolResult::success(
            self.name,
            args,
            ToolData::Todo { items: vec![] },
        ))
    }
}

fn registry_with(tools: Vec<FakeTool>) -> ToolRegistry {
    let mut registry = ToolRegistry::empty();
    for tool in tools {
        registry.register(Arc::new(tool));
    }
    registry
}

#[test]
fn test_register_rejects_invalid_names() {
    assert!(is_valid_tool_name("read"));
    assert!(is_valid_tool_name("a2a_submit_task"));
    assert!(is_valid_tool_name("MCP_files_read-file"));
    assert!(!is_valid_tool_name(""));
    assert!(!is_valid_tool_name("has space"));
    assert!(!is_valid_tool_name("has.dot"));
    assert!(!is_valid_tool_name(&"x".repeat(65)));
}

#[test]
fn test_get_unknown_tool_error() {
    let registry = ToolRegistry::empty();
    let err = registry.get("nope").unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert_eq!(err.to_string(), "unknown tool: nope");
}

#[test]
fn test_list_available_filters_disabled() {
    let registry = registry_with(vec![
        FakeTool {
            name: "alpha",
            enabled: true,
        },
        FakeTool {
            name: "beta",
            enabled: false,
        },
        FakeTool {
            name: "gamma",
            enabled: true,
        },
    ]);
    assert_eq!(registry.list_available(), vec!["alpha", "gamma"]);
    // get() still reaches disabled tools; dispatch refuses them.
    assert!(registry.get("beta").is_ok());
}

#[test]
fn test_definitions_sorted_and_filtered() {
    let registry = registry_with(vec![
        FakeTool {
            name: "zeta",
            enabled: true,
        },
        FakeTool {
            name: "alpha",
            enabled: true,
        },
        FakeTool {
            name: "off",
            enabled: false,
        },
    ]);
    let defs = registry.definitions();
    let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

#[tokio::test]
async fn test_dispatch_unknown_tool() {
    let registry = ToolRegistry::empty();
    let result = registry
        .dispatch("ghost", ToolArgs::new(), CancellationToken::new())
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind(), "not_found");
}

#[tokio::test]
async fn test_dispatch_disabled_tool_mentions_switch() {
    let registry = registry_with(vec![FakeTool {
        name: "off",
        enabled: false,
    }]);
    let result = registry
        .dispatch("off", ToolArgs::new(), CancellationToken::new())
        .await
        .unwrap();
    let err = result.error.unwrap();
    assert_eq!(err.kind(), "disabled");
    assert!(err.to_string().contains("tools.enabled"));
}

#[tokio::test]
async fn test_dispatch_validation_short_circuit() {
    let registry = registry_with(vec![FakeTool {
        name: "alpha",
        enabled: true,
    }]);
    let result = registry
        .dispatch("alpha", ToolArgs::new(), CancellationToken::new())
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind(), "validation");
}

#[tokio::test]
async fn test_dispatch_stamps_duration() {
    let registry = registry_with(vec![FakeTool {
        name: "alpha",
        enabled: true,
    }]);
    let args: ToolArgs = [("value".to_string(), json!("x"))].into_iter().collect();
    let result = registry
        .dispatch("alpha", args, CancellationToken::new())
        .await
        .unwrap();
    assert!(result.success);
    // Stamped, even if tiny.
    assert!(result.duration <= std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn test_build_from_default_config() {
    let config = Config::default();
    let registry = ToolRegistry::build(&config, None).await.unwrap();
    let available = registry.list_available();

    for name in [
        "read",
        "write",
        "edit",
        "multi_edit",
        "delete",
        "grep",
        "tree",
        "bash",
        "kill_shell",
        "todo_write",
        "web_fetch",
        "web_search",
        "a2a_submit_task",
        "a2a_query_task",
        "a2a_download_artifacts",
    ] {
        assert!(available.contains(&name.to_string()), "missing {}", name);
    }
    // Disabled-by-config tools are built but not listed.
    assert!(!available.contains(&"github".to_string()));
    // No screen driver supplied, so no computer tool at all.
    assert!(registry.get("computer").is_err());
}

#[tokio::test]
async fn test_build_honours_disabled_list() {
    let mut config = Config::default();
    config.tools.disabled.push("delete".to_string());
    let registry = ToolRegistry::build(&config, None).await.unwrap();
    assert!(!registry.list_available().contains(&"delete".to_string()));
    // Still registered, so definitions stay deterministic across toggles.
    assert!(registry.get("delete").is_ok());
}

#[tokio::test]
async fn test_definitions_are_deterministic() {
    let config = Config::default();
    let registry = ToolRegistry::build(&config, None).await.unwrap();
    let a = registry.definitions();
    let b = registry.definitions();
    assert_eq!(a, b);

    let registry2 = ToolRegistry::build(&config, None).await.unwrap();
    assert_eq!(a, registry2.definitions());
}
