use reqwest::{Client, Response};
use std::time::Duration;

use crate::errors::ToolError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cap applied to remote bodies when a tool has no configured limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Client for an outbound tool: shared connect timeout, per-tool overall
/// deadline. Falls back to the default client if the builder fails.
pub fn http_client_with_timeout(timeout: Duration) -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// A response body read under a byte cap.
#[derive(Debug)]
pub struct BoundedBody {
    pub bytes: Vec<u8>,
    pub truncated: bool,
}

/// Stream a response body, stopping at `max_bytes`.
///
/// A `Content-Length` header over the cap is rejected up front as a remote
/// error, so oversized downloads never start. Otherwise chunks accumulate
/// until the cap; the cut is byte-exact and unmarked, which keeps binary
/// payloads (artifacts, screenshots) intact.
pub async fn read_body_bounded(
    mut resp: Response,
    max_bytes: usize,
) -> Result<BoundedBody, ToolError> {
    if let Some(declared) = resp.content_length()
        && declared as usize > max_bytes
    {
        return Err(ToolError::Remote(format!(
            "response body of {} bytes exceeds the {} byte limit",
            declared, max_bytes
        )));
    }

    let mut bytes = Vec::new();
    loop {
        let chunk = resp
            .chunk()
            .await
            .map_err(|e| ToolError::Remote(format!("error reading response body: {}", e)))?;
        let Some(chunk) = chunk else {
            return Ok(BoundedBody {
                bytes,
                truncated: false,
            });
        };
        let room = max_bytes - bytes.len();
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            return Ok(BoundedBody {
                bytes,
                truncated: true,
            });
        }
        bytes.extend_from_slice(&chunk);
    }
}

/// Like [`read_body_bounded`] but decodes to text and appends a
/// `[truncated]` marker line when the cap was hit. Returns the text together
/// with the truncation flag so callers don't have to sniff the marker.
pub async fn read_text_bounded(
    resp: Response,
    max_bytes: usize,
) -> Result<(String, bool), ToolError> {
    let body = read_body_bounded(resp, max_bytes).await?;
    let mut text = String::from_utf8_lossy(&body.bytes).into_owned();
    if body.truncated {
        text.push_str("\n[truncated]");
    }
    Ok((text, body.truncated))
}

#[cfg(test)]
mod tests;
