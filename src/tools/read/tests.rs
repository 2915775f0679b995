use super::*;
use serde_json::json;
use tempfile::TempDir;

fn setup(tmp: &TempDir) -> ReadTool {
    let sandbox = Arc::new(PathSandbox::new(
        vec![tmp.path().to_path_buf()],
        vec![".git/".to_string()],
    ));
    ReadTool::new(sandbox, ReadLedger::new(), true)
}

fn args(pairs: &[(&str, serde_json::Value)]) -> ToolArgs {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_read_whole_file() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("data.txt");
    std::fs::write(&target, "one\ntwo\nthree").unwrap();

    let tool = setup(&tmp);
    let a = args(&[("file_path", json!(target.to_str().unwrap()))]);
    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    assert!(result.success);
    match result.data.unwrap() {
        ToolData::FileRead { content, size, .. } => {
            assert_eq!(content, "one\ntwo\nthree");
            assert_eq!(size, 13);
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_read_line_range_inclusive() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("data.txt");
    std::fs::write(&target, "one\ntwo\nthree\nfour").unwrap();

    let tool = setup(&tmp);
    let a = args(&[
        ("file_path", json!(target.to_str().unwrap())),
        ("start_line", json!(2)),
        ("end_line", json!(3)),
    ]);
    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    match result.data.unwrap() {
        ToolData::FileRead {
            content,
            start_line,
            end_line,
            ..
        } => {
            assert_eq!(content, "two\nthree");
            assert_eq!(start_line, Some(2));
            assert_eq!(end_line, Some(3));
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_read_is_idempotent_for_a_range() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("data.txt");
    std::fs::write(&target, "a\nb\nc\nd\ne").unwrap();
    let tool = setup(&tmp);

    let a = args(&[
        ("file_path", json!(target.to_str().unwrap())),
        ("start_line", json!(2)),
        ("end_line", json!(4)),
    ]);
    let first = tool
        .execute(CancellationToken::new(), a.clone())
        .await
        .unwrap();
    let second = tool.execute(CancellationToken::new(), a).await.unwrap();
    let content = |r: ToolResult| match r.data.unwrap() {
        ToolData::FileRead { content, .. } => content,
        _ => unreachable!(),
    };
    assert_eq!(content(first), content(second));
}

#[test]
fn test_validate_rejects_bad_ranges() {
    let tmp = TempDir::new().unwrap();
    let tool = setup(&tmp);
    let path = tmp.path().join("x.txt");

    let a = args(&[
        ("file_path", json!(path.to_str().unwrap())),
        ("start_line", json!(0)),
    ]);
    assert!(tool.validate(&a).is_err());

    let a = args(&[
        ("file_path", json!(path.to_str().unwrap())),
        ("start_line", json!(5)),
        ("end_line", json!(2)),
    ]);
    let err = tool.validate(&a).unwrap_err();
    assert_eq!(err.kind(), "validation");
}

#[test]
fn test_validate_rejects_out_of_sandbox() {
    let tmp = TempDir::new().unwrap();
    let tool = setup(&tmp);
    let a = args(&[("file_path", json!("/etc/passwd"))]);
    let err = tool.validate(&a).unwrap_err();
    assert_eq!(err.kind(), "policy");
}

#[tokio::test]
async fn test_execute_agrees_with_validate() {
    let tmp = TempDir::new().unwrap();
    let tool = setup(&tmp);
    let a = args(&[("file_path", json!("/etc/passwd"))]);
    let validate_kind = tool.validate(&a).unwrap_err().kind();
    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error.unwrap().kind(), validate_kind);
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let tool = setup(&tmp);
    let a = args(&[(
        "file_path",
        json!(tmp.path().join("missing.txt").to_str().unwrap()),
    )]);
    let result = tool.execute(CancellationToken::new(), a).await.unwrap();
    assert_eq!(result.error.unwrap().kind(), "not_found");
}

#[tokio::test]
async fn test_read_records_in_ledger() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("seen.txt");
    std::fs::write(&target, "content").unwrap();

    let ledger = ReadLedger::new();
    let sandbox = Arc::new(PathSandbox::new(vec![tmp.path().to_path_buf()], vec![]));
    let tool = ReadTool::new(sandbox.clone(), ledger.clone(), true);

    let a = args(&[("file_path", json!(target.to_str().unwrap()))]);
    tool.execute(CancellationToken::new(), a).await.unwrap();
    let resolved = sandbox.validate(&target).unwrap();
    assert!(ledger.has_read(&resolved));
}
