use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::GitHubConfig;
use crate::errors::ToolError;
use crate::tools::base::{Tool, ToolArgs, ToolData, ToolDefinition, ToolResult};
use crate::tools::params;
use crate::utils::env::resolve_env_refs;
use crate::utils::http::http_client_with_timeout;

const GITHUB_API: &str = "https://api.github.com";

const RESOURCES: &[&str] = &[
    "issue",
    "issues",
    "pull_request",
    "comments",
    "create_comment",
    "create_pull_request",
];

/// Validate a GitHub owner or repo name: alphanumeric, hyphens, dots,
/// underscores only.
fn is_valid_github_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 100
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.' || b == b'_')
}

/// Issue numbers arrive as integer, float (JSON), or string with an optional
/// leading `#`.
fn parse_issue_number(value: &Value) -> Result<u64, ToolError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                Ok(i)
            } else if let Some(f) = n.as_f64()
                && f.fract() == 0.0
                && f > 0.0
            {
                Ok(f as u64)
            } else {
                Err(ToolError::invalid_param(
                    "issue_number",
                    "must be a positive integer",
                ))
            }
        }
        Value::String(s) => {
            let trimmed = s.trim().trim_start_matches('#');
            trimmed.parse::<u64>().map_err(|_| {
                ToolError::invalid_param("issue_number", &format!("'{}' is not a number", s))
            })
        }
        _ => Err(ToolError::invalid_param(
            "issue_number",
            "must be a number or string",
        )),
    }
}

pub struct GitHubTool {
    config: GitHubConfig,
    client: Client,
    base_url: String,
    enabled: bool,
}

impl GitHubTool {
    pub const NAME: &'static str = "github";

    pub fn new(config: GitHubConfig, enabled: bool) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| GITHUB_API.to_string());
        let client = http_client_with_timeout(Duration::from_secs(config.timeout));
        Self {
            config,
            client,
            base_url,
            enabled,
        }
    }

    /// Log a warning when the GitHub rate limit is running low.
    fn check_rate_limit(resp: &reqwest::Response) {
        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
        };
        if let (Some(remaining), Some(limit)) =
            (header("x-ratelimit-remaining"), header("x-ratelimit-limit"))
            && remaining < limit / 10
        {
            warn!("GitHub API rate limit low: {}/{} remaining", remaining, limit);
        }
    }

    /// Extract the error message from a GitHub API response, sanitizing to
    /// prevent token leakage if the API echoes back auth details.
    fn sanitize_api_error(body: &Value) -> String {
        let msg = body["message"].as_str().unwrap_or("unknown error");
        let lower = msg.to_lowercase();
        if lower.contains("bearer") || lower.contains("token") || lower.contains("credential") {
            return "authentication error (check token)".to_string();
        }
        msg.to_string()
    }

    fn headers(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header(
            "Authorization",
            format!("Bearer {}", resolve_env_refs(&self.config.token)),
        )
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", "ferrite")
        .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn api_send(&self, req: reqwest::RequestBuilder) -> Result<Value, ToolError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ToolError::Remote(format!("GitHub request failed: {}", e)))?;
        let status = resp.status();
        Self::check_rate_limit(&resp);
        if status.as_u16() == 429 {
            return Err(ToolError::api_error(
                "GitHub",
                429,
                "rate limit exceeded, try again later",
            ));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| ToolError::Remote(format!("GitHub response parse failed: {}", e)))?;
        if !status.is_success() {
            return Err(ToolError::api_error(
                "GitHub",
                status.as_u16(),
                &Self::sanitize_api_error(&body),
            ));
        }
        Ok(body)
    }

    async fn api_get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ToolError> {
        let req = self.headers(
            self.client
                .get(format!("{}{}", self.base_url, path))
                .query(query),
        );
        self.api_send(req).await
    }

    async fn api_post(&self, path: &str, body: &Value) -> Result<Value, ToolError> {
        let req = self.headers(
            self.client
                .post(format!("{}{}", self.base_url, path))
                .json(body),
        );
        self.api_send(req).await
    }

    fn owner(&self) -> String {
        resolve_env_refs(&self.config.owner)
    }

    async fn get_issue(&self, repo: &str, number: u64) -> Result<String, ToolError> {
        let issue = self
            .api_get(
                &format!("/repos/{}/{}/issues/{}", self.owner(), repo, number),
                &[],
            )
            .await?;
        Ok(format!(
            "#{} {} [{}]\nby {}\n\n{}",
            issue["number"].as_u64().unwrap_or(number),
            issue["title"].as_str().unwrap_or(""),
            issue["state"].as_str().unwrap_or("unknown"),
            issue["user"]["login"].as_str().unwrap_or("?"),
            issue["body"].as_str().unwrap_or("(no description)")
        ))
    }

    async fn list_issues(&self, repo: &str, state: &str, page: u64) -> Result<String, ToolError> {
        let owner = self.owner();
        let issues = self
            .api_get(
                &format!("/repos/{}/{}/issues", owner, repo),
                &[
                    ("state", state.to_string()),
                    ("page", page.to_string()),
                    ("per_page", "30".to_string()),
                ],
            )
            .await?;

        let issues = issues.as_array().cloned().unwrap_or_default();
        let lines: Vec<String> = issues
            .iter()
            .filter(|i| i.get("pull_request").is_none())
            .map(|i| {
                format!(
                    "#{} {} (by {})",
                    i["number"].as_u64().unwrap_or(0),
                    i["title"].as_str().unwrap_or(""),
                    i["user"]["login"].as_str().unwrap_or("?")
                )
            })
            .collect();
        if lines.is_empty() {
            return Ok(format!("No {} issues in {}/{}.", state, owner, repo));
        }
        Ok(format!(
            "Issues ({}) in {}/{} (page {}):\n{}",
            state,
            owner,
            repo,
            page,
            lines.join("\n")
        ))
    }

    async fn get_pull_request(&self, repo: &str, number: u64) -> Result<String, ToolError> {
        let pr = self
            .api_get(
                &format!("/repos/{}/{}/pulls/{}", self.owner(), repo, number),
                &[],
            )
            .await?;
        Ok(format!(
            "#{} {} [{}]\n{} → {}\nby {}\n\n{}",
            pr["number"].as_u64().unwrap_or(number),
            pr["title"].as_str().unwrap_or(""),
            pr["state"].as_str().unwrap_or("unknown"),
            pr["head"]["ref"].as_str().unwrap_or("?"),
            pr["base"]["ref"].as_str().unwrap_or("?"),
            pr["user"]["login"].as_str().unwrap_or("?"),
            pr["body"].as_str().unwrap_or("(no description)")
        ))
    }

    async fn list_comments(&self, repo: &str, number: u64) -> Result<String, ToolError> {
        let comments = self
            .api_get(
                &format!(
                    "/repos/{}/{}/issues/{}/comments",
                    self.owner(),
                    repo,
                    number
                ),
                &[],
            )
            .await?;
        let comments = comments.as_array().cloned().unwrap_or_default();
        if comments.is_empty() {
            return Ok(format!("No comments on #{}.", number));
        }
        let lines: Vec<String> = comments
            .iter()
            .map(|c| {
                format!(
                    "{}: {}",
                    c["user"]["login"].as_str().unwrap_or("?"),
                    c["body"].as_str().unwrap_or("")
                )
            })
            .collect();
        Ok(format!("Comments on #{}:\n{}", number, lines.join("\n---\n")))
    }

    async fn create_comment(
        &self,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<String, ToolError> {
        let result = self
            .api_post(
                &format!(
                    "/repos/{}/{}/issues/{}/comments",
                    self.owner(),
                    repo,
                    number
                ),
                &json!({ "body": body }),
            )
            .await?;
        Ok(format!(
            "Commented on #{}: {}",
            number,
            result["html_url"].as_str().unwrap_or("")
        ))
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        title: &str,
        head: &str,
        base: &str,
        body: Option<&str>,
    ) -> Result<String, ToolError> {
        let mut payload = json!({ "title": title, "head": head, "base": base });
        if let Some(b) = body {
            payload["body"] = Value::String(b.to_string());
        }
        let result = self
            .api_post(&format!("/repos/{}/{}/pulls", self.owner(), repo), &payload)
            .await?;
        Ok(format!(
            "Created PR #{}: {}",
            result["number"].as_u64().unwrap_or(0),
            result["html_url"].as_str().unwrap_or("")
        ))
    }

    fn extract(&self, args: &ToolArgs) -> Result<(String, String), ToolError> {
        let resource = params::require_str(args, "resource")?;
        if !RESOURCES.contains(&resource.as_str()) {
            return Err(ToolError::invalid_param(
                "resource",
                &format!("'{}' is not one of {}", resource, RESOURCES.join(", ")),
            ));
        }

        let repo = params::require_str(args, "repo")?;
        if !is_valid_github_name(&repo) {
            return Err(ToolError::invalid_param("repo", "invalid repository name"));
        }

        // Owner pinning: a caller-passed owner must match the configured one.
        if let Some(owner) = params::optional_str(args, "owner")
            && owner != self.owner()
        {
            return Err(ToolError::Validation(format!(
                "owner '{}' does not match the configured owner '{}'",
                owner,
                self.owner()
            )));
        }

        // Per-resource required fields.
        match resource.as_str() {
            "issue" | "pull_request" | "comments" => {
                let value = args
                    .get("issue_number")
                    .ok_or_else(|| ToolError::missing_param("issue_number"))?;
                parse_issue_number(value)?;
            }
            "create_comment" => {
                let value = args
                    .get("issue_number")
                    .ok_or_else(|| ToolError::missing_param("issue_number"))?;
                parse_issue_number(value)?;
                params::require_str(args, "body")?;
            }
            "create_pull_request" => {
                params::require_str(args, "title")?;
                params::require_str(args, "head")?;
                params::require_str(args, "base")?;
            }
            _ => {}
        }

        Ok((resource, repo))
    }
}

#[async_trait]
impl Tool for GitHubTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: format!(
                "Work with GitHub issues and pull requests for the configured owner ({}).",
                self.config.owner
            ),
            parameters: json!({
                "type": "object",
                "properties": {
                    "resource": { "type": "string", "enum": RESOURCES },
                    "repo": { "type": "string", "description": "Repository name" },
                    "owner": { "type": "string", "description": "Must match the configured owner" },
                    "issue_number": {
                        "oneOf": [ { "type": "integer" }, { "type": "string" } ],
                        "description": "Issue or PR number (accepts a leading #)"
                    },
                    "state": { "type": "string", "enum": ["open", "closed", "all"], "default": "open" },
                    "page": { "type": "integer", "minimum": 1, "default": 1 },
                    "body": { "type": "string" },
                    "title": { "type": "string" },
                    "head": { "type": "string" },
                    "base": { "type": "string" }
                },
                "required": ["resource", "repo"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled && self.config.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        self.extract(args).map(|_| ())
    }

    async fn execute(
        &self,
        _cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        let (resource, repo) = match self.extract(&args) {
            Ok(parts) => parts,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        let issue_number = args.get("issue_number").map(parse_issue_number);
        let outcome = match resource.as_str() {
            "issue" => {
                self.get_issue(&repo, issue_number.expect("validated").expect("validated"))
                    .await
            }
            "issues" => {
                let state =
                    params::optional_str(&args, "state").unwrap_or_else(|| "open".to_string());
                let page = params::optional_uint(&args, "page", 1).unwrap_or(1);
                self.list_issues(&repo, &state, page).await
            }
            "pull_request" => {
                self.get_pull_request(&repo, issue_number.expect("validated").expect("validated"))
                    .await
            }
            "comments" => {
                self.list_comments(&repo, issue_number.expect("validated").expect("validated"))
                    .await
            }
            "create_comment" => {
                let body = params::require_str(&args, "body").expect("validated");
                self.create_comment(
                    &repo,
                    issue_number.expect("validated").expect("validated"),
                    &body,
                )
                .await
            }
            "create_pull_request" => {
                let title = params::require_str(&args, "title").expect("validated");
                let head = params::require_str(&args, "head").expect("validated");
                let base = params::require_str(&args, "base").expect("validated");
                let body = params::optional_str(&args, "body");
                self.create_pull_request(&repo, &title, &head, &base, body.as_deref())
                    .await
            }
            _ => unreachable!("resource validated"),
        };

        Ok(match outcome {
            Ok(content) => ToolResult::success(
                Self::NAME,
                args,
                ToolData::GitHub { resource, content },
            ),
            Err(err) => ToolResult::failure(Self::NAME, args, err),
        })
    }
}

#[cfg(test)]
mod tests;
