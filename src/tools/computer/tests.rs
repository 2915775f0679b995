use super::*;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct RecordingDriver {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ScreenDriver for RecordingDriver {
    async fn screenshot(&self) -> anyhow::Result<ImageAttachment> {
        self.calls.lock().unwrap().push("screenshot".into());
        Ok(ImageAttachment {
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
            mime_type: "image/png".into(),
            display_name: "screen.png".into(),
        })
    }
    async fn click(&self, x: i64, y: i64) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("click {} {}", x, y));
        Ok(())
    }
    async fn type_text(&self, text: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("type {}", text));
        Ok(())
    }
    async fn press_key(&self, key: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("key {}", key));
        Ok(())
    }
    async fn scroll(&self, dx: i64, dy: i64) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("scroll {} {}", dx, dy));
        Ok(())
    }
    async fn move_cursor(&self, x: i64, y: i64) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("move {} {}", x, y));
        Ok(())
    }
}

fn setup(max_actions: usize) -> (Arc<RecordingDriver>, ComputerTool) {
    let driver = Arc::new(RecordingDriver::default());
    let limiter = Arc::new(ActionRateLimiter::new(
        Duration::from_secs(60),
        max_actions,
    ));
    let tool = ComputerTool::new(driver.clone(), limiter, true);
    (driver, tool)
}

fn args(pairs: &[(&str, Value)]) -> ToolArgs {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_screenshot_attaches_image() {
    let (driver, tool) = setup(10);
    let result = tool
        .execute(CancellationToken::new(), args(&[("action", json!("screenshot"))]))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.images.len(), 1);
    assert_eq!(result.images[0].mime_type, "image/png");
    assert_eq!(driver.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_click_forwards_coordinates() {
    let (driver, tool) = setup(10);
    let result = tool
        .execute(
            CancellationToken::new(),
            args(&[("action", json!("click")), ("x", json!(10)), ("y", json!(20))]),
        )
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(driver.calls.lock().unwrap()[0], "click 10 20");
}

#[tokio::test]
async fn test_rate_limit_rejects_before_driver_call() {
    let (driver, tool) = setup(1);
    let a = args(&[("action", json!("screenshot"))]);
    let first = tool
        .execute(CancellationToken::new(), a.clone())
        .await
        .unwrap();
    assert!(first.success);

    let second = tool.execute(CancellationToken::new(), a).await.unwrap();
    assert!(!second.success);
    let msg = second.error.unwrap().to_string();
    assert!(msg.contains("rate limited"));
    assert!(msg.contains("1 of 1"));
    // Driver untouched by the rejected call
    assert_eq!(driver.calls.lock().unwrap().len(), 1);
}

#[test]
fn test_validate_per_action_requirements() {
    let (_, tool) = setup(10);
    assert!(tool.validate(&args(&[("action", json!("screenshot"))])).is_ok());
    assert!(tool.validate(&args(&[("action", json!("warp"))])).is_err());
    assert!(tool.validate(&args(&[("action", json!("click")), ("x", json!(1))])).is_err());
    assert!(tool.validate(&args(&[("action", json!("type"))])).is_err());
    assert!(
        tool.validate(&args(&[("action", json!("scroll")), ("dy", json!(-3))]))
            .is_ok()
    );
}
