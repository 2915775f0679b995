use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::{WebFetchConfig, WebSearchConfig};
use crate::errors::ToolError;
use crate::tools::base::{SearchHit, Tool, ToolArgs, ToolData, ToolDefinition, ToolResult};
use crate::tools::params;
use crate::utils::env::resolve_env_refs;
use crate::utils::http::{http_client_with_timeout, read_text_bounded};
use crate::utils::truncate_chars;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

const GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const DUCKDUCKGO_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

fn check_url(url: &str) -> Result<(), ToolError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ToolError::invalid_param(
            "url",
            "must start with http:// or https://",
        ))
    }
}

pub struct WebFetchTool {
    config: WebFetchConfig,
    client: Client,
    enabled: bool,
}

impl WebFetchTool {
    pub const NAME: &'static str = "web_fetch";

    pub fn new(config: WebFetchConfig, enabled: bool) -> Self {
        let client = http_client_with_timeout(Duration::from_secs(config.timeout));
        Self {
            config,
            client,
            enabled,
        }
    }
}

#[async_trait]
impl Tool for WebFetchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Fetch a URL and return its text content, bounded by the configured \
                          maximum size."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "URL to fetch" }
                },
                "required": ["url"]
            }),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled && self.config.enabled
    }

    fn validate(&self, args: &ToolArgs) -> Result<(), ToolError> {
        let url = params::require_str(args, "url")?;
        check_url(&url)
    }

    async fn execute(
        &self,
        cancel: CancellationToken,
        args: ToolArgs,
    ) -> anyhow::Result<ToolResult> {
        if let Err(err) = self.validate(&args) {
            return Ok(ToolResult::failure(Self::NAME, args, err));
        }
        let url = params::require_str(&args, "url").expect("validated");

        let request = self.client.get(&url).header("User-Agent", USER_AGENT);
        let resp = tokio::select! {
            () = cancel.cancelled() => {
                return Ok(ToolResult::failure(
                    Self::NAME,
                    args,
                    ToolError::Cancelled(format!("fetch of {} was cancelled", url)),
                ));
            }
            resp = request.send() => match resp {
                Ok(resp) => resp,
                Err(e) => {
                    return Ok(ToolResult::failure(
                        Self::NAME,
                        args,
                        ToolError::Remote(format!("fetch failed: {}", e)),
                    ));
                }
            },
        };

        let status = resp.status();
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !status.is_success() {
            return Ok(ToolResult::failure(
                Self::NAME,
                args,
                ToolError::api_error(
                    "HTTP",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("request failed"),
                ),
            ));
        }

        let (content, truncated) = match read_text_bounded(resp, self.config.max_size).await {
            Ok(body) => body,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        Ok(ToolResult::success(
            Self::NAME,
            args,
            ToolData::WebFetch {
                url,
                status: status.as_u16(),
                content,
                content_type,
                truncated,
            },
        ))
    }
}

pub struct WebSearchTool {
    config: WebSearchConfig,
    client: Client,
    google_endpoint: String,
    duckduckgo_endpoint: String,
    enabled: bool,
}

impl WebSearchTool {
    pub const NAME: &'static str = "web_search";

    pub fn new(config: WebSearchConfig, enabled: bool) -> Self {
        let client = http_client_with_timeout(Duration::from_secs(config.timeout));
        Self {
            config,
            client,
            google_endpoint: GOOGLE_ENDPOINT.to_string(),
            duckduckgo_endpoint: DUCKDUCKGO_ENDPOINT.to_string(),
            enabled,
        }
    }

    #[cfg(test)]
    fn with_endpoints(config: WebSearchConfig, google: String, duckduckgo: String) -> Self {
        let client = http_client_with_timeout(Duration::from_secs(config.timeout));
        Self {
            config,
            client,
            google_endpoint: google,
            duckduckgo_endpoint: duckduckgo,
            enabled: true,
        }
    }

    async fn search_google(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, ToolError> {
        let api_key = resolve_env_refs(&self.config.google_api_key);
        let engine_id = resolve_env_refs(&self.config.google_engine_id);
        if api_key.is_empty() || engine_id.is_empty() {
            return Err(ToolError::Validation(
                "google search needs googleApiKey and googleEngineId; configure them or use \
                 duckduckgo"
                    .to_string(),
            ));
        }

        let resp = self
            .client
            .get(&self.google_endpoint)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
                ("q", query),
                ("num", &count.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Remote(format!("google search failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body["error"]["message"].as_str().unwrap_or("search failed");
            return Err(ToolError::api_error("Google", status.as_u16(), message));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ToolError::Remote(format!("google response parse failed: {}", e)))?;
        let items = body["items"].as_array().cloned().unwrap_or_default();
        Ok(items
            .iter()
            .take(count)
            .map(|item| SearchHit {
                title: item["title"].as_str().unwrap_or("").to_string(),
                url: item["link"].as_str().unwrap_or("").to_string(),
                snippet: item["snippet"].as_str().unwrap_or("").to_string(),
            })
            .collect())
    }

    /// DuckDuckGo has no API; scrape the HTML endpoint like a browser would.
    async fn search_duckduckgo(
        &self,
        query: &str,
        count: usize,
    ) -> Result<Vec<SearchHit>, ToolError> {
        let resp = self
            .client
            .get(&self.duckduckgo_endpoint)
            .query(&[("q", query)])
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| ToolError::Remote(format!("duckduckgo search failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ToolError::api_error(
                "DuckDuckGo",
                status.as_u16(),
                status.canonical_reason().unwrap_or("search failed"),
            ));
        }

        let (html, _) =
            read_text_bounded(resp, crate::utils::http::DEFAULT_MAX_BODY_BYTES).await?;
        let document = Html::parse_document(&html);

        let parse_sel = |sel: &str| {
            Selector::parse(sel)
                .map_err(|e| ToolError::Internal(format!("selector '{}': {:?}", sel, e)))
        };
        let result_sel = parse_sel(".result")?;
        let title_sel = parse_sel(".result__a")?;
        let snippet_sel = parse_sel(".result__snippet")?;

        let mut hits = Vec::new();
        for result in document.select(&result_sel) {
            if hits.len() >= count {
                break;
            }
            let title = result
                .select(&title_sel)
                .next()
                .map(|e| e.text().collect::<String>())
                .unwrap_or_default();
            let url = result
                .select(&title_sel)
                .next()
                .and_then(|e| e.value().attr("href"))
                .unwrap_or("")
                .to_string();
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|e| e.text().collect::<String>())
                .unwrap_or_default();

            let title = title.trim().to_string();
            if title.is_empty() {
                continue;
            }
            hits.push(SearchHit {
                title,
                url,
                snippet: truncate_chars(snippet.trim(), 300, "…"),
            });
        }
        Ok(hits)
    }

    fn extract(&self, args: &ToolArgs) -> Result<(String, String, usize), ToolError> {
        let query = params::require_str(args, "query")?;
        let engine = params::optional_str(args, "engine")
            .unwrap_or_else(|| self.config.default_provider.clone());
        if !self.config.providers.iter().any(|p| p == &engine) {
            return Err(ToolError::invalid_param(
                "engine",
                &format!(
                    "'{}' is not one of the configured providers ({})",
                    engine,
                    self.config.providers.join(", ")
                ),
            ));
        }
        let count = params::optional_uint(args, "count", self.config.max_results as u64)?
            .clamp(1, 10) as usize;
        Ok((query, engine, count))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: "Search the web. Returns titles, URLs, and snippets.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query" },
                    "engine": {
                        "type": "string",
                        "enum": self.config.providers.clone(),
                        "description": "Search engine to use"
                    },
                    "count": { "type": "integer", "minimum": 1, "maximum": 10 }
                },
                "required": ["query"]
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
        let (query, engine, count) = match self.extract(&args) {
            Ok(parts) => parts,
            Err(err) => return Ok(ToolResult::failure(Self::NAME, args, err)),
        };

        let started = Instant::now();
        let outcome = match engine.as_str() {
            "google" => self.search_google(&query, count).await,
            "duckduckgo" => self.search_duckduckgo(&query, count).await,
            other => Err(ToolError::invalid_param(
                "engine",
                &format!("unsupported engine '{}'", other),
            )),
        };

        Ok(match outcome {
            Ok(results) => {
                let total = results.len();
                ToolResult::success(
                    Self::NAME,
                    args,
                    ToolData::WebSearch {
                        query,
                        engine,
                        results,
                        total,
                        time_ms: started.elapsed().as_millis() as u64,
                    },
                )
            }
            Err(err) => ToolResult::failure(Self::NAME, args, err),
        })
    }
}
