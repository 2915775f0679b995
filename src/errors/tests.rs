use super::*;

#[test]
fn test_kind_labels_are_stable() {
    assert_eq!(ToolError::Disabled("x".into()).kind(), "disabled");
    assert_eq!(ToolError::Validation("x".into()).kind(), "validation");
    assert_eq!(ToolError::Policy("x".into()).kind(), "policy");
    assert_eq!(ToolError::NotFound("x".into()).kind(), "not_found");
    assert_eq!(ToolError::Remote("x".into()).kind(), "remote");
    assert_eq!(ToolError::Cancelled("x".into()).kind(), "cancelled");
    assert_eq!(ToolError::Internal("x".into()).kind(), "internal");
}

#[test]
fn test_disabled_mentions_switch() {
    let err = ToolError::disabled("web_fetch", "tools.web.fetch.enabled");
    assert!(err.to_string().contains("web_fetch"));
    assert!(err.to_string().contains("tools.web.fetch.enabled"));
}

#[test]
fn test_missing_param_message() {
    let err = ToolError::missing_param("file_path");
    assert_eq!(err.to_string(), "missing required parameter: file_path");
    assert_eq!(err.kind(), "validation");
}

#[test]
fn test_api_error_shape() {
    let err = ToolError::api_error("GitHub", 404, "Not Found");
    assert_eq!(err.to_string(), "GitHub API error (404): Not Found");
    assert_eq!(err.kind(), "remote");
}

#[test]
fn test_anyhow_converts_to_internal() {
    let err: ToolError = anyhow::anyhow!("boom").into();
    assert!(err.is_internal());
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn test_serializes_with_kind_tag() {
    let err = ToolError::Policy("path is protected".into());
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["kind"], "policy");
    assert_eq!(json["message"], "path is protected");
}
