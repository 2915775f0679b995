use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::a2a::types::{AgentTask, MessageSendParams, TaskQueryParams};
use crate::errors::ToolError;
use crate::utils::http::http_client_with_timeout;
use crate::utils::truncate_chars;

/// JSON-RPC client for an HTTP+JSON A2A agent.
pub struct A2aClient {
    client: Client,
    timeout: Duration,
}

impl A2aClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http_client_with_timeout(timeout),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Blocking send-task request. The agent replies with its view of the
    /// task once it has accepted (or resumed) it.
    pub async fn send_task(
        &self,
        agent_url: &str,
        params: &MessageSendParams,
    ) -> Result<AgentTask, ToolError> {
        let result = self
            .rpc(agent_url, "message/send", serde_json::to_value(params)?)
            .await?;
        Self::parse_task(result)
    }

    /// Fetch the current snapshot of a task by id. Read-only.
    pub async fn get_task(&self, agent_url: &str, task_id: &str) -> Result<AgentTask, ToolError> {
        let params = TaskQueryParams {
            id: task_id.to_string(),
        };
        let result = self
            .rpc(agent_url, "tasks/get", serde_json::to_value(&params)?)
            .await?;
        Self::parse_task(result)
    }

    async fn rpc(
        &self,
        agent_url: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, ToolError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": Uuid::new_v4().to_string(),
            "method": method,
            "params": params,
        });
        debug!("A2A {} → {}", method, agent_url);

        let resp = self
            .client
            .post(agent_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ToolError::Remote(format!("A2A request to {} failed: {}", agent_url, e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ToolError::Remote(format!("A2A response read failed: {}", e)))?;

        if !status.is_success() {
            return Err(ToolError::api_error(
                "A2A",
                status.as_u16(),
                &truncate_chars(body.trim(), 200, "…"),
            ));
        }

        let envelope: Value = serde_json::from_str(&body).map_err(|e| {
            ToolError::Remote(format!("A2A agent returned unparseable response: {}", e))
        })?;

        if let Some(err) = envelope.get("error")
            && !err.is_null()
        {
            let code = err["code"].as_i64().unwrap_or(0);
            let message = err["message"].as_str().unwrap_or("unknown error");
            return Err(ToolError::Remote(format!(
                "A2A agent error ({}): {}",
                code, message
            )));
        }

        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| ToolError::Remote("A2A response is missing 'result'".to_string()))
    }

    fn parse_task(result: Value) -> Result<AgentTask, ToolError> {
        serde_json::from_value(result)
            .map_err(|e| ToolError::Remote(format!("A2A task payload is malformed: {}", e)))
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
