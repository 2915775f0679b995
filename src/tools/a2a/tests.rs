use super::*;
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config(download_dir: &str) -> A2aConfig {
    A2aConfig {
        enabled: true,
        request_timeout: 2,
        poll_strategy: crate::config::PollStrategy::Fixed,
        status_poll_seconds: 1,
        initial_poll_interval: 1,
        backoff_multiplier: 1.5,
        max_poll_interval: 2,
        download_dir: download_dir.to_string(),
        organize_by_artifact: false,
    }
}

struct Fixture {
    tracker: Arc<AgentTaskTracker>,
    submit: SubmitTaskTool,
    query: QueryTaskTool,
    download: DownloadArtifactsTool,
}

fn setup(download_dir: &str) -> Fixture {
    let config = fast_config(download_dir);
    let client = Arc::new(A2aClient::new(Duration::from_secs(2)));
    let tracker = Arc::new(AgentTaskTracker::new());
    Fixture {
        submit: SubmitTaskTool::new(client.clone(), tracker.clone(), &config, true),
        query: QueryTaskTool::new(client.clone(), true),
        download: DownloadArtifactsTool::new(client, &config, true),
        tracker,
    }
}

fn args(pairs: &[(&str, Value)]) -> ToolArgs {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn task_body(id: &str, state: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": "1",
        "result": {
            "id": id,
            "context_id": "ctx-1",
            "status": {
                "state": state,
                "message": {
                    "kind": "message",
                    "role": "agent",
                    "parts": [{ "kind": "text", "text": format!("now {}", state) }]
                }
            },
            "artifacts": []
        }
    })
}

#[tokio::test]
async fn test_submit_rejected_while_existing_task_is_working() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "tasks/get" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("t-prev", "working")))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let fx = setup(tmp.path().to_str().unwrap());
    // Seed history: t-prev was previously registered for this agent.
    fx.tracker
        .register_task(&server.uri(), "ctx-1", "t-prev")
        .await
        .unwrap();
    fx.tracker.remove_task("t-prev").await;

    let result = fx
        .submit
        .execute(
            CancellationToken::new(),
            args(&[
                ("agent_url", json!(server.uri())),
                ("task_description", json!("compile report")),
            ]),
        )
        .await
        .unwrap();
    assert!(!result.success);
    assert!(
        result
            .error
            .unwrap()
            .to_string()
            .contains("still in working state")
    );

    // Only the state probe went out; no message/send was attempted.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["method"], "tasks/get");
}

#[tokio::test]
async fn test_submit_returns_promptly_then_delivers_terminal_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "message/send" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("t-1", "submitted")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "tasks/get" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("t-1", "working")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "tasks/get" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("t-1", "completed")))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let fx = setup(tmp.path().to_str().unwrap());

    let started = std::time::Instant::now();
    let result = fx
        .submit
        .execute(
            CancellationToken::new(),
            args(&[
                ("agent_url", json!(server.uri())),
                ("task_description", json!("compile report")),
            ]),
        )
        .await
        .unwrap();
    // The call must not block until task completion.
    assert!(started.elapsed() < Duration::from_millis(900));
    assert!(result.success, "{:?}", result.error);
    let task_id = match result.data.unwrap() {
        ToolData::TaskSubmit {
            task_id, message, ..
        } => {
            assert!(message.contains("Do not poll"));
            task_id
        }
        other => panic!("unexpected payload: {:?}", other),
    };
    assert_eq!(task_id, "t-1");
    assert!(fx.tracker.is_monitored("t-1").await);

    let mut channels = fx.tracker.take_channels("t-1").await.unwrap();
    let terminal = tokio::time::timeout(Duration::from_secs(10), channels.result_rx.recv())
        .await
        .expect("terminal result should arrive")
        .expect("result channel open");
    assert!(terminal.success);
    match terminal.data.unwrap() {
        ToolData::TaskResult { state, message, .. } => {
            assert_eq!(state, TaskState::Completed);
            assert_eq!(message, "now completed");
        }
        other => panic!("unexpected payload: {:?}", other),
    }

    // At least one status update was published along the way.
    let mut saw_status = false;
    while let Ok(update) = channels.status_rx.try_recv() {
        saw_status = true;
        assert_eq!(update.task_id, "t-1");
    }
    assert!(saw_status);
}

#[tokio::test]
async fn test_submit_continues_input_required_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "tasks/get" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(task_body("t-prev", "input-required")),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // The continuation must carry the previous task and context ids.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "message/send",
            "params": { "message": { "task_id": "t-prev", "context_id": "ctx-1" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("t-prev", "working")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "tasks/get" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("t-prev", "completed")))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let fx = setup(tmp.path().to_str().unwrap());
    fx.tracker
        .register_task(&server.uri(), "ctx-1", "t-prev")
        .await
        .unwrap();
    fx.tracker.remove_task("t-prev").await;

    let result = fx
        .submit
        .execute(
            CancellationToken::new(),
            args(&[
                ("agent_url", json!(server.uri())),
                ("task_description", json!("here is the missing input")),
            ]),
        )
        .await
        .unwrap();
    assert!(result.success, "{:?}", result.error);
    match result.data.unwrap() {
        ToolData::TaskSubmit { continuation, .. } => assert!(continuation),
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_query_task_is_read_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("t-9", "working")))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let fx = setup(tmp.path().to_str().unwrap());
    let result = fx
        .query
        .execute(
            CancellationToken::new(),
            args(&[
                ("agent_url", json!(server.uri())),
                ("task_id", json!("t-9")),
            ]),
        )
        .await
        .unwrap();
    assert!(result.success);
    match result.data.unwrap() {
        ToolData::TaskQuery { state, .. } => assert_eq!(state, TaskState::Working),
        other => panic!("unexpected payload: {:?}", other),
    }
    // Query never registers anything.
    assert_eq!(fx.tracker.monitored_count().await, 0);
}

#[tokio::test]
async fn test_download_requires_completed_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body("t-3", "working")))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let download_dir = tmp.path().join("downloads");
    let fx = setup(download_dir.to_str().unwrap());

    let result = fx
        .download
        .execute(
            CancellationToken::new(),
            args(&[
                ("agent_url", json!(server.uri())),
                ("task_id", json!("t-3")),
            ]),
        )
        .await
        .unwrap();
    assert!(!result.success);
    let err = result.error.unwrap();
    assert_eq!(err.kind(), "not_found");
    assert!(err.to_string().contains("working"));
    // Nothing was created under the download directory.
    assert!(!download_dir.exists());
}

#[tokio::test]
async fn test_download_saves_text_and_binary_parts() {
    let server = MockServer::start().await;
    let payload = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG data");
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {
                "id": "t-4",
                "status": { "state": "completed" },
                "artifacts": [
                    {
                        "artifact_id": "report",
                        "parts": [
                            { "kind": "text", "text": "summary text" },
                            { "kind": "file", "name": "chart.png", "mime_type": "image/png", "bytes": payload }
                        ]
                    },
                    {
                        "artifact_id": "broken",
                        "parts": [
                            { "kind": "file", "bytes": "not base64!!!" }
                        ]
                    }
                ]
            }
        })))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let download_dir = tmp.path().join("downloads");
    let fx = setup(download_dir.to_str().unwrap());

    let result = fx
        .download
        .execute(
            CancellationToken::new(),
            args(&[
                ("agent_url", json!(server.uri())),
                ("task_id", json!("t-4")),
            ]),
        )
        .await
        .unwrap();
    // A single failed artifact does not abort the batch.
    assert!(result.success, "{:?}", result.error);
    match result.data.unwrap() {
        ToolData::ArtifactDownload { artifacts, .. } => {
            assert_eq!(artifacts.len(), 2);
            let ok = &artifacts[0];
            assert!(ok.downloaded);
            assert!(ok.size > 0);
            let failed = &artifacts[1];
            assert!(!failed.downloaded);
            assert!(failed.error.as_ref().unwrap().contains("base64"));
        }
        other => panic!("unexpected payload: {:?}", other),
    }
    assert_eq!(
        std::fs::read_to_string(download_dir.join("report-part0.txt")).unwrap(),
        "summary text"
    );
    assert_eq!(
        std::fs::read(download_dir.join("chart.png")).unwrap(),
        b"\x89PNG data"
    );
}

#[test]
fn test_artifact_file_name_is_a_single_safe_component() {
    assert_eq!(artifact_file_name("report"), "report");
    assert_eq!(artifact_file_name("chart.png"), "chart.png");
    assert_eq!(artifact_file_name("a/b\\c d"), "a-b-c-d");
    assert_eq!(artifact_file_name("../../etc/passwd"), "etc-passwd");
    assert_eq!(artifact_file_name(".hidden"), "hidden");
    assert_eq!(artifact_file_name("..."), "artifact");
}

#[test]
fn test_validate_checks_urls() {
    let tmp = TempDir::new().unwrap();
    let fx = setup(tmp.path().to_str().unwrap());
    let a = args(&[
        ("agent_url", json!("not-a-url")),
        ("task_description", json!("x")),
    ]);
    assert!(fx.submit.validate(&a).is_err());

    let a = args(&[("agent_url", json!("http://agent")), ("task_id", json!("t"))]);
    assert!(fx.query.validate(&a).is_ok());
    assert!(fx.download.validate(&a).is_ok());
}
