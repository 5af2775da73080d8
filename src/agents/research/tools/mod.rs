// Research helper tools

pub mod html;
pub mod scraper;
pub mod search;
pub mod trends;

pub use scraper::WebScraperTool;
pub use search::WebSearchTool;
pub use trends::TrendsTool;

use crate::tool::Tool;
use anyhow::Result;
use reqwest::Client;
use std::env;
use std::sync::Arc;
use std::time::Duration;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Settings shared by the research tools, read from the environment.
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub enabled: bool,
    pub search_html_url: String,
    pub duckduckgo_url: String,
    pub trends_url: String,
    pub request_delay: Duration,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_html_url: "https://html.duckduckgo.com/html/".to_string(),
            duckduckgo_url: "https://duckduckgo.com".to_string(),
            trends_url: "https://trends.google.com".to_string(),
            request_delay: Duration::from_millis(1000),
            timeout_seconds: 10,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl ToolsConfig {
    pub fn new() -> Self {
        let defaults = Self::default();

        let enabled = env::var("RESEARCH_TOOLS_ENABLED")
            .map(|value| !matches!(value.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(defaults.enabled);
        let request_delay = env::var("TOOLS_REQUEST_DELAY_MS")
            .ok()
            .and_then(|value| value.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_delay);
        let timeout_seconds = env::var("TOOLS_TIMEOUT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.timeout_seconds);

        Self {
            enabled,
            search_html_url: env::var("DDG_HTML_URL").unwrap_or(defaults.search_html_url),
            duckduckgo_url: env::var("DDG_URL").unwrap_or(defaults.duckduckgo_url),
            trends_url: env::var("GOOGLE_TRENDS_URL").unwrap_or(defaults.trends_url),
            request_delay,
            timeout_seconds,
            user_agent: env::var("TOOLS_USER_AGENT").unwrap_or(defaults.user_agent),
        }
    }

    /// HTTP client with a browser user agent and a cookie jar.
    pub fn http_client(&self) -> Result<Client> {
        let client = Client::builder()
            .user_agent(&self.user_agent)
            .cookie_store(true)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .build()?;
        Ok(client)
    }
}

/// The three tools the research agent draws on.
pub struct ResearchToolkit {
    pub search: Arc<dyn Tool>,
    pub trends: Arc<dyn Tool>,
    pub scraper: Arc<dyn Tool>,
}

impl ResearchToolkit {
    pub fn new(config: &ToolsConfig) -> Result<Self> {
        Ok(Self {
            search: Arc::new(WebSearchTool::new(config)?),
            trends: Arc::new(TrendsTool::new(config)?),
            scraper: Arc::new(WebScraperTool::new(config)?),
        })
    }

    pub fn tools(&self) -> Vec<&dyn Tool> {
        vec![
            self.search.as_ref(),
            self.trends.as_ref(),
            self.scraper.as_ref(),
        ]
    }
}

/// Look up a research tool by name for direct invocation.
pub fn tool_by_name(name: &str, config: &ToolsConfig) -> Result<Option<Box<dyn Tool>>> {
    let tool: Box<dyn Tool> = match name {
        "web_search" => Box::new(WebSearchTool::new(config)?),
        "trends" => Box::new(TrendsTool::new(config)?),
        "web_scraper" => Box::new(WebScraperTool::new(config)?),
        _ => return Ok(None),
    };
    Ok(Some(tool))
}
