use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::ToolError;
use crate::tools::base::{
    ImageAttachment, Tool, ToolArgs, ToolData, ToolDefinition, ToolResult,
};
use crate::tools::params;
use crate::utils::env::{DisplayServer, detect_display_server};
use crate::utils::ratelimit::ActionRateLimiter;

const ACTIONS: &[&str] = &["screenshot", "click", "type", "key", "scroll", "move"];

/// Collaborator interface for screen capture and input injection. The
/// concrete implementation (Wayland/X11 capture, input synthesis) lives
/// outside this crate; the tool only handles parameters, rate limiting, and
/// result shaping.
#[async_trait]
pub trait ScreenDriver: Send + Sync {
    async fn screenshot(&self) -> anyhow::Result<ImageAttachment>;
    async fn click(&self, x: i64, y: i64) -> anyhow::Result<()>;
    async fn type_text(&self, text: &str) -> anyhow::Result<()>;
    async fn press_key(&self, key: &str) -> anyhow::Result<()>;
    async fn scroll(&self, dx: i64, dy: i64) -> anyhow::Result<()>;
    async fn move_cursor(&self, x: i64, y: i64) -> anyhow::Result<()>;
}

pub struct ComputerTool {
    driver: Arc<dyn ScreenDriver>,
    limiter: Arc<ActionRateLimiter>,
    enabled: bool,
}

impl ComputerTool {
    pub const NAME: &'static str = "computer";

    pub fn new(
        driver: Arc<dyn ScreenDriver>,
        limiter: Arc<ActionRateLimiter>,
        enabled: bool,
    ) -> Self {
        Self {
            driver,
            limiter,
            enabled,
        }
    }

    fn extract(args: &ToolArgs) -> Result<String, ToolError> {
        let action = params::require_str(args, "action")?;
        if !ACTIONS.contains(&action.as_str()) {
            return Err(ToolError::invalid_param(
                "action",
                &format!("'{}' is not one of {}", action, ACTIONS.join(", ")),
            ));
        }
        match action.as_str() {
            "click" | "move" => {
                params::require_int(args, "x")?;
                params::require_int(args, "y")?;
            }
            "type" => {
                params::require_str(args, "text")?;
            }
            "key" => {
                params::require_str(args, "key")?;
            }
            "scroll" => {
                params::require_int(args, "dy")?;
            }
            _ => {}
        }
        Ok(action)
    }
}

#[async_trait]
impl Tool for ComputerTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Interact with the screen: capture, click, type, press keys, scroll."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": { "type": "string", "enum": ACTIONS },
                    "x": { "type": "integer" },
                    "y": { "type": "integer" },
                    "dx": { "type": "integer", "default": 0 },
                    "dy": { "type": "integer" },
                    "text": { "type": "string" },
                    "key": { "type": "string", "description": "Key name, e.g. Return or ctrl+c" }
                },
                "required": ["action"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        Self::extract(args).map(|_| ())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        let action = match Self::extract(&args) {
            Ok(a) => a,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        // Bucket admission before any external call.
        if let Err(err) = self.limiter.check_and_record(&action) {
            return Ok(ToolResult::failure(Self::NAME, args, err));
        }

        let outcome: anyhow::Result<(String, Option<ImageAttachment>)> = match action.as_str() {
            "screenshot" => {
                let display = match detect_display_server() {
                    DisplayServer::Wayland => "wayland",
                    DisplayServer::X11 => "x11",
                    DisplayServer::None => "none",
                };
                self.driver
                    .screenshot()
                    .await
                    .map(|img| (format!("captured screen ({})", display), Some(img)))
            }
            "click" => {
                let x = params::require_int(&args, "x").expect("validated");
                let y = params::require_int(&args, "y").expect("validated");
                self.driver
                    .click(x, y)
                    .await
                    .map(|()| (format!("clicked ({}, {})", x, y), None))
            }
            "type" => {
                let text = params::require_str(&args, "text").expect("validated");
                self.driver
                    .type_text(&text)
                    .await
                    .map(|()| (format!("typed {} character(s)", text.chars().count()), None))
            }
            "key" => {
                let key = params::require_str(&args, "key").expect("validated");
                self.driver
                    .press_key(&key)
                    .await
                    .map(|()| (format!("pressed {}", key), None))
            }
            "scroll" => {
                let dx = params::optional_int(&args, "dx", 0).expect("validated");
                let dy = params::require_int(&args, "dy").expect("validated");
                self.driver
                    .scroll(dx, dy)
                    .await
                    .map(|()| (format!("scrolled ({}, {})", dx, dy), None))
            }
            "move" => {
                let x = params::require_int(&args, "x").expect("validated");
                let y = params::require_int(&args, "y").expect("validated");
                self.driver
                    .move_cursor(x, y)
                    .await
                    .map(|()| (format!("moved cursor to ({}, {})", x, y), None))
            }
            _ => unreachable!("action validated"),
        };

        Ok(match outcome {
            Ok((detail, image)) => {
                let mut result = ToolResult::success(
                    Self::NAME,
                    args,
                    ToolData::Computer { action, detail },
                );
                if let Some(img) = image {
                    result = result.with_image(img);
                }
                result
            }
            Err(e) => ToolResult::failure(
                Self::NAME,
                args,
                ToolError::Internal(format!("{} failed: {}", action, e)),
            ),
        })
    }
}

#[cfg(test)]
mod tests;
