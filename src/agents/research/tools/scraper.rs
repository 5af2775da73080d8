use super::html::{attr, collapse_whitespace, parse_html, text_content, walk_elements};
use super::ToolsConfig;
use crate::tool::Tool;
use crate::utils::truncate_chars;
use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const MAX_HEADINGS: usize = 10;
const MAX_TEXT_CHARS: usize = 5000;
const MAX_LINKS: usize = 20;
const MAX_DELAY_SECONDS: f64 = 60.0;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap());

/// Pause between pages, clamped to `0..=60` seconds.
pub fn scrape_delay(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds.clamp(0.0, MAX_DELAY_SECONDS))
        .map_err(|e| anyhow!("Invalid delay_seconds {}: {}", seconds, e))
}

/// Fetches pages and pulls out the parts useful for market research.
pub struct WebScraperTool {
    client: Client,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLink {
    pub url: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub description: String,
    pub headings: Vec<String>,
    pub text: String,
    pub links: Vec<PageLink>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrapeOutcome {
    Page(ScrapedPage),
    Failed {
        url: String,
        status: String,
        error: String,
    },
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ScraperParams {
    ScrapeUrl {
        url: String,
    },
    ScrapeMultiple {
        urls: Vec<String>,
        #[serde(default = "default_delay")]
        delay_seconds: f64,
    },
    ExtractEmails {
        text: String,
    },
    ExtractPhoneNumbers {
        text: String,
    },
    IsValidUrl {
        url: String,
    },
}

fn default_delay() -> f64 {
    1.0
}

impl WebScraperTool {
    pub fn new(config: &ToolsConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
        })
    }

    pub async fn scrape_url(&self, url: &str) -> Result<ScrapedPage> {
        if !is_valid_url(url) {
            return Err(anyhow!("Invalid URL: {}", url));
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Fetching {} failed with status {}", url, status));
        }

        let body = response.text().await?;
        parse_page(url, &body)
    }

    /// Scrape each URL in turn; a failing URL is reported in place rather than aborting.
    pub async fn scrape_multiple(&self, urls: &[String], delay: Duration) -> Vec<ScrapeOutcome> {
        let mut results = Vec::with_capacity(urls.len());

        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let outcome = match self.scrape_url(url).await {
                Ok(page) => ScrapeOutcome::Page(page),
                Err(e) => {
                    log::warn!("Scraping {} failed: {}", url, e);
                    ScrapeOutcome::Failed {
                        url: url.clone(),
                        status: "error".to_string(),
                        error: e.to_string(),
                    }
                }
            };
            results.push(outcome);
        }

        results
    }
}

pub fn parse_page(url: &str, html: &str) -> Result<ScrapedPage> {
    let dom = parse_html(html)?;

    let mut title = String::new();
    let mut description = String::new();
    let mut headings = Vec::new();
    let mut links = Vec::new();

    walk_elements(&dom.document, &mut |node, name| match name {
        "title" if title.is_empty() => {
            title = collapse_whitespace(&text_content(node));
        }
        "meta" if description.is_empty() => {
            let is_description = attr(node, "name")
                .map(|n| n.eq_ignore_ascii_case("description"))
                .unwrap_or(false);
            if is_description {
                description = attr(node, "content").unwrap_or_default();
            }
        }
        "h1" | "h2" | "h3" if headings.len() < MAX_HEADINGS => {
            let heading = collapse_whitespace(&text_content(node));
            if !heading.is_empty() {
                headings.push(heading);
            }
        }
        "a" if links.len() < MAX_LINKS => {
            if let Some(href) = attr(node, "href").filter(|href| href.starts_with("http")) {
                links.push(PageLink {
                    url: href,
                    text: collapse_whitespace(&text_content(node)),
                });
            }
        }
        _ => {}
    });

    let text = collapse_whitespace(&text_content(&dom.document));

    Ok(ScrapedPage {
        url: url.to_string(),
        title,
        description,
        headings,
        text: truncate_chars(&text, MAX_TEXT_CHARS),
        links,
        status: "success".to_string(),
    })
}

fn unique_matches(pattern: &Regex, text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in pattern.find_iter(text) {
        if !found.iter().any(|existing| existing == m.as_str()) {
            found.push(m.as_str().to_string());
        }
    }
    found
}

pub fn extract_emails(text: &str) -> Vec<String> {
    unique_matches(&EMAIL, text)
}

pub fn extract_phone_numbers(text: &str) -> Vec<String> {
    unique_matches(&PHONE, text)
}

/// A URL is usable when it parses with both a scheme and a host.
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| !parsed.scheme().is_empty() && parsed.host_str().is_some())
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl Tool for WebScraperTool {
    fn name(&self) -> &str {
        "web_scraper"
    }

    fn description(&self) -> &str {
        "Scrape web pages for title, meta description, headings, text and links. Also extracts emails and phone numbers from text."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["scrape_url", "scrape_multiple", "extract_emails", "extract_phone_numbers", "is_valid_url"],
                    "description": "Which operation to run"
                },
                "url": {
                    "type": "string",
                    "description": "Page to scrape or check (scrape_url, is_valid_url)"
                },
                "urls": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Pages to scrape in order (scrape_multiple)"
                },
                "delay_seconds": {
                    "type": "number",
                    "description": "Pause between requests (scrape_multiple)",
                    "default": 1.0
                },
                "text": {
                    "type": "string",
                    "description": "Text to search (extract_emails, extract_phone_numbers)"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, arguments: &str) -> Result<String> {
        let params: ScraperParams = serde_json::from_str(arguments)?;

        let output = match params {
            ScraperParams::ScrapeUrl { url } => serde_json::to_value(self.scrape_url(&url).await?)?,
            ScraperParams::ScrapeMultiple {
                urls,
                delay_seconds,
            } => {
                let delay = scrape_delay(delay_seconds)?;
                serde_json::to_value(self.scrape_multiple(&urls, delay).await)?
            }
            ScraperParams::ExtractEmails { text } => json!(extract_emails(&text)),
            ScraperParams::ExtractPhoneNumbers { text } => json!(extract_phone_numbers(&text)),
            ScraperParams::IsValidUrl { url } => json!({"url": url, "valid": is_valid_url(&url)}),
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }
}
