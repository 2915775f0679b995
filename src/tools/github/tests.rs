use super::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tool_for(server: &MockServer, owner: &str) -> GitHubTool {
    GitHubTool::new(
        GitHubConfig {
            enabled: true,
            owner: owner.to_string(),
            token: "test-token".to_string(),
            base_url: Some(server.uri()),
            timeout: 5,
        },
        true,
    )
}

fn args(pairs: &[(&str, Value)]) -> ToolArgs {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[test]
fn test_issue_number_coercions() {
    assert_eq!(parse_issue_number(&json!(42)).unwrap(), 42);
    assert_eq!(parse_issue_number(&json!(42.0)).unwrap(), 42);
    assert_eq!(parse_issue_number(&json!("42")).unwrap(), 42);
    assert_eq!(parse_issue_number(&json!("#42")).unwrap(), 42);
    assert!(parse_issue_number(&json!("abc")).is_err());
    assert!(parse_issue_number(&json!(4.5)).is_err());
    assert!(parse_issue_number(&json!(true)).is_err());
}

#[tokio::test]
async fn test_owner_mismatch_fails_before_any_request() {
    let server = MockServer::start().await;
    // No mocks mounted: any request would 404 and, more importantly,
    // MockServer verifies that zero requests arrived.
    let tool = tool_for(&server, "alice");

    let a = args(&[
        ("resource", json!("issue")),
        ("repo", json!("project")),
        ("owner", json!("bob")),
        ("issue_number", json!("#42")),
    ]);
    let err = tool.validate(&a).unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert!(err.to_string().contains("does not match the configured owner"));

    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind(), "validation");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_issue() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/project/issues/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 42,
            "title": "Fix the flux capacitor",
            "state": "open",
            "user": { "login": "doc" },
            "body": "It stopped fluxing."
        })))
        .mount(&server)
        .await;

    let tool = tool_for(&server, "alice");
    let a = args(&[
        ("resource", json!("issue")),
        ("repo", json!("project")),
        ("issue_number", json!("#42")),
    ]);
    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    assert!(result.success, "{:?}", result.error);
    match result.data.unwrap() {
        ToolData::GitHub { resource, content } => {
            assert_eq!(resource, "issue");
            assert!(content.contains("#42 Fix the flux capacitor"));
            assert!(content.contains("by doc"));
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_list_issues_excludes_prs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/project/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "number": 1, "title": "real issue", "user": { "login": "a" } },
            { "number": 2, "title": "a PR", "user": { "login": "b" }, "pull_request": {} }
        ])))
        .mount(&server)
        .await;

    let tool = tool_for(&server, "alice");
    let a = args(&[("resource", json!("issues")), ("repo", json!("project"))]);
    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    match result.data.unwrap() {
        ToolData::GitHub { content, .. } => {
            assert!(content.contains("#1 real issue"));
            assert!(!content.contains("a PR"));
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_api_error_shape_and_sanitization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/project/issues/7"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })),
        )
        .mount(&server)
        .await;

    let tool = tool_for(&server, "alice");
    let a = args(&[
        ("resource", json!("issue")),
        ("repo", json!("project")),
        ("issue_number", json!(7)),
    ]);
    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    let err = result.error.unwrap();
    assert_eq!(err.to_string(), "GitHub API error (404): Not Found");
}

#[tokio::test]
async fn test_auth_errors_are_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Bad credential: token ghp_abc123"
        })))
        .mount(&server)
        .await;

    let tool = tool_for(&server, "alice");
    let a = args(&[
        ("resource", json!("issue")),
        ("repo", json!("project")),
        ("issue_number", json!(1)),
    ]);
    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    let msg = result.error.unwrap().to_string();
    assert!(!msg.contains("ghp_abc123"));
    assert!(msg.contains("authentication error"));
}

#[tokio::test]
async fn test_create_comment_posts_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/alice/project/issues/3/comments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "html_url": "https://github.com/alice/project/issues/3#issuecomment-1"
        })))
        .mount(&server)
        .await;

    let tool = tool_for(&server, "alice");
    let a = args(&[
        ("resource", json!("create_comment")),
        ("repo", json!("project")),
        ("issue_number", json!(3)),
        ("body", json!("looks good")),
    ]);
    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    assert!(result.success, "{:?}", result.error);
}

#[test]
fn test_validate_per_resource_requirements() {
    let config = GitHubConfig {
        enabled: true,
        owner: "alice".into(),
        token: String::new(),
        base_url: None,
        timeout: 5,
    };
    let tool = GitHubTool::new(config, true);

    // Unknown resource
    let a = args(&[("resource", json!("stars")), ("repo", json!("r"))]);
    assert!(tool.validate(&a).is_err());

    // issue requires issue_number
    let a = args(&[("resource", json!("issue")), ("repo", json!("r"))]);
    assert_eq!(
        tool.validate(&a).unwrap_err().to_string(),
        "missing required parameter: issue_number"
    );

    // create_pull_request requires title/head/base
    let a = args(&[
        ("resource", json!("create_pull_request")),
        ("repo", json!("r")),
        ("title", json!("t")),
        ("head", json!("feature")),
    ]);
    assert!(tool.validate(&a).is_err());

    // Invalid repo name
    let a = args(&[("resource", json!("issues")), ("repo", json!("bad/name"))]);
    assert!(tool.validate(&a).is_err());
}

#[test]
fn test_disabled_via_config() {
    let tool = GitHubTool::new(GitHubConfig::default(), true);
    assert!(!tool.is_enabled());
}
