//! Web search tool and the Tavily search backend

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::config::SearchConfig;
use crate::core::{Config, ForgeError, Result, ToolCategory};
use crate::tools::context::ToolContext;
use crate::tools::registry::Tool;
use crate::tools::schema::{ArgSchema, ArgType};

/// Search capability: query in, result text out
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<String>;
}

/// Tavily REST search client
pub struct TavilySearch {
    client: Client,
    endpoint: String,
    api_key: String,
    max_results: u32,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilySearch {
    /// Create a client from config; the key is read from the configured env var
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.search_api_key().ok_or_else(|| {
            ForgeError::config(format!(
                "Search API key not set. Export {}",
                config.search.api_key_env
            ))
        })?;
        Self::new(&config.search, api_key)
    }

    pub fn new(search: &SearchConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(search.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: search.endpoint.clone(),
            api_key: api_key.into(),
            max_results: search.max_results,
        })
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TavilyRequest {
                api_key: &self.api_key,
                query,
                max_results: self.max_results,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ForgeError::search(format!("Tavily API error ({}): {}", status, body)));
        }

        let parsed: TavilyResponse = response.json().await?;
        if parsed.results.is_empty() {
            return Ok(String::new());
        }
        // Same shape the model saw from the original search integration
        Ok(serde_json::to_string(&parsed.results)?)
    }
}

/// `web_search`: informational lookup delegated to a `SearchProvider`
pub struct WebSearchTool {
    provider: Arc<dyn SearchProvider>,
}

impl WebSearchTool {
    pub const NAME: &'static str = "web_search";

    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Searches the web for current information about a given query"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Informational
    }

    fn schema(&self) -> ArgSchema {
        ArgSchema::new().required("query", ArgType::String, "The search query")
    }

    async fn invoke(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let query = args["query"].as_str().unwrap_or_default();
        tracing::debug!(query, "running web search");

        let results = self.provider.search(query).await?;
        if results.trim().is_empty() {
            Ok(format!("No results found for: {}", query))
        } else {
            Ok(results)
        }
    }
}
