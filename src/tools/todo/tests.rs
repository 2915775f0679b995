use super::*;
use serde_json::json;

fn args(todos: Value) -> ToolArgs {
    [("todos".to_string(), todos)].into_iter().collect()
}

#[tokio::test]
async fn test_todo_write_replaces_list() {
    let tool = TodoWriteTool::new(true);
    let a = args(json!([
        { "id": "1", "content": "write tests", "status": "in_progress" },
        { "content": "ship it" }
    ]));
    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    assert!(result.success);

    let items = tool.snapshot();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].status, TodoStatus::InProgress);
    assert_eq!(items[1].status, TodoStatus::Pending);
    assert_eq!(items[1].id, "2");

    // Second call replaces, not appends
    let a = args(json!([{ "content": "done", "status": "completed" }]));
    tool.execute(CancellationToken::new(), a).await.unwrap();
    assert_eq!(tool.snapshot().len(), 1);
}

#[test]
fn test_validate_rejects_bad_shapes() {
    let tool = TodoWriteTool::new(true);
    assert_eq!(
        tool.validate(&ToolArgs::new()).unwrap_err().to_string(),
        "missing required parameter: todos"
    );
    assert!(tool.validate(&args(json!(["nope"]))).is_err());
    assert!(
        tool.validate(&args(json!([{ "content": "x", "status": "unknown" }])))
            .is_err()
    );
    assert!(tool.validate(&args(json!([{ "status": "pending" }]))).is_err());
}
