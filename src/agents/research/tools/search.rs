use super::html::{attr, collapse_whitespace, has_class, parse_html, text_content, walk_elements};
use super::ToolsConfig;
use crate::tool::Tool;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

static VQD_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"vqd=["']?([0-9-]+)["']?"#).unwrap());

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Web and news search over DuckDuckGo. No API key needed.
pub struct WebSearchTool {
    client: Client,
    html_url: String,
    base_url: String,
    delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub description: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsResult {
    pub title: String,
    pub url: String,
    pub description: String,
    pub date: String,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum SearchParams {
    Search {
        query: String,
        #[serde(default = "default_max_results")]
        max_results: usize,
    },
    SearchNews {
        query: String,
        #[serde(default = "default_max_results")]
        max_results: usize,
    },
    SearchCompetitors {
        industry: String,
        product_type: String,
    },
    SearchMarketSize {
        industry: String,
        #[serde(default)]
        year: Option<i32>,
    },
    SearchTrends {
        topic: String,
    },
}

fn default_max_results() -> usize {
    10
}

#[derive(Deserialize)]
struct NewsPayload {
    #[serde(default)]
    results: Vec<NewsItem>,
}

#[derive(Deserialize)]
struct NewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    date: Option<i64>,
}

impl WebSearchTool {
    pub fn new(config: &ToolsConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            html_url: config.search_html_url.clone(),
            base_url: config.duckduckgo_url.trim_end_matches('/').to_string(),
            delay: config.request_delay,
        })
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .get(&self.html_url)
            .query(&[("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Search request failed with status {}",
                response.status()
            ));
        }

        let body = response.text().await?;
        let results = parse_search_results(&body, max_results)?;
        log::debug!("Search '{}' returned {} results", query, results.len());
        Ok(results)
    }

    pub async fn search_news(&self, query: &str, max_results: usize) -> Result<Vec<NewsResult>> {
        let landing = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await?;

        if !landing.status().is_success() {
            return Err(anyhow!(
                "News token request failed with status {}",
                landing.status()
            ));
        }

        let landing = landing.text().await?;

        let vqd = extract_vqd(&landing)
            .ok_or_else(|| anyhow!("Could not obtain search token for news query"))?;

        let response = self
            .client
            .get(format!("{}/news.js", self.base_url))
            .query(&[
                ("l", "us-en"),
                ("o", "json"),
                ("noamp", "1"),
                ("q", query),
                ("vqd", vqd.as_str()),
                ("p", "-1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "News search failed with status {}",
                response.status()
            ));
        }

        let payload: NewsPayload = response.json().await?;
        Ok(news_results(payload, max_results))
    }

    pub async fn search_competitors(
        &self,
        industry: &str,
        product_type: &str,
    ) -> Result<Vec<SearchResult>> {
        let queries = vec![
            format!("{} {} companies", product_type, industry),
            format!("top {} platforms", product_type),
            format!("best {} {} alternatives", industry, product_type),
        ];

        let all_results = self.run_queries(&queries).await;
        Ok(dedupe_by_url(all_results, 15))
    }

    pub async fn search_market_size(&self, industry: &str, year: i32) -> Result<Vec<SearchResult>> {
        let queries = vec![
            format!("{} market size {}", industry, year),
            format!("{} market forecast", industry),
            format!("{} industry analysis", industry),
        ];

        let mut results = self.run_queries(&queries).await;
        results.truncate(10);
        Ok(results)
    }

    pub async fn search_trends(&self, topic: &str) -> Result<Vec<SearchResult>> {
        let queries = vec![
            format!("{} trends {}", topic, Utc::now().year()),
            format!("{} future predictions", topic),
            format!("emerging {} technologies", topic),
        ];

        let mut results = self.run_queries(&queries).await;
        results.truncate(10);
        Ok(results)
    }

    /// Run several queries in sequence, five results each. A failed query is skipped.
    async fn run_queries(&self, queries: &[String]) -> Vec<SearchResult> {
        let mut all_results = Vec::new();

        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.search(query, 5).await {
                Ok(results) => all_results.extend(results),
                Err(e) => log::warn!("Search query '{}' failed: {}", query, e),
            }
        }

        all_results
    }
}

/// Pull organic results out of a DuckDuckGo HTML results page.
pub fn parse_search_results(html: &str, max_results: usize) -> Result<Vec<SearchResult>> {
    let dom = parse_html(html)?;

    let mut containers = Vec::new();
    walk_elements(&dom.document, &mut |node, _| {
        if has_class(node, "result") && !has_class(node, "result--ad") {
            containers.push(node.clone());
        }
    });

    let mut results = Vec::new();
    for container in containers {
        if results.len() >= max_results {
            break;
        }

        let mut title = None;
        let mut href = None;
        let mut snippet = String::new();
        walk_elements(&container, &mut |node, _| {
            if has_class(node, "result__a") && title.is_none() {
                title = Some(collapse_whitespace(&text_content(node)));
                href = attr(node, "href");
            } else if has_class(node, "result__snippet") && snippet.is_empty() {
                snippet = collapse_whitespace(&text_content(node));
            }
        });

        let (Some(title), Some(href)) = (title, href) else {
            continue;
        };
        let Some(url) = decode_result_url(&href) else {
            continue;
        };

        results.push(SearchResult {
            title,
            url,
            description: snippet,
            source: "duckduckgo".to_string(),
        });
    }

    Ok(results)
}

/// Resolve a result link, unwrapping `/l/?uddg=` redirects. Ad links yield `None`.
pub fn decode_result_url(href: &str) -> Option<String> {
    if href.contains("/y.js") {
        return None;
    }

    let base = Url::parse("https://duckduckgo.com").ok()?;
    let url = base.join(href).ok()?;

    if url.host_str().map_or(false, |h| h.ends_with("duckduckgo.com")) && url.path() == "/l/" {
        return url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned());
    }

    Some(url.to_string())
}

fn extract_vqd(html: &str) -> Option<String> {
    VQD_TOKEN
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn news_results(payload: NewsPayload, max_results: usize) -> Vec<NewsResult> {
    payload
        .results
        .into_iter()
        .take(max_results)
        .map(|item| NewsResult {
            title: item.title,
            url: item.url,
            description: TAGS.replace_all(&item.excerpt, "").into_owned(),
            date: item
                .date
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                .map(|date| date.to_rfc3339())
                .unwrap_or_default(),
            source: item.source,
            kind: "news".to_string(),
        })
        .collect()
}

fn dedupe_by_url(results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    let mut seen_urls = HashSet::new();
    results
        .into_iter()
        .filter(|result| seen_urls.insert(result.url.clone()))
        .take(limit)
        .collect()
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Free web search over DuckDuckGo: plain search, news, competitor discovery, market size and trend articles."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["search", "search_news", "search_competitors", "search_market_size", "search_trends"],
                    "description": "Which search to run"
                },
                "query": {
                    "type": "string",
                    "description": "Search query (search, search_news)"
                },
                "max_results": {
                    "type": "number",
                    "description": "Maximum number of results (search, search_news)",
                    "default": 10
                },
                "industry": {
                    "type": "string",
                    "description": "Industry name (search_competitors, search_market_size)"
                },
                "product_type": {
                    "type": "string",
                    "description": "Type of product or service (search_competitors)"
                },
                "year": {
                    "type": "number",
                    "description": "Year for market data, defaults to the current year (search_market_size)"
                },
                "topic": {
                    "type": "string",
                    "description": "Topic to find trend articles for (search_trends)"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, arguments: &str) -> Result<String> {
        let params: SearchParams = serde_json::from_str(arguments)?;

        let output = match params {
            SearchParams::Search { query, max_results } => {
                serde_json::to_value(self.search(&query, max_results).await?)?
            }
            SearchParams::SearchNews { query, max_results } => {
                serde_json::to_value(self.search_news(&query, max_results).await?)?
            }
            SearchParams::SearchCompetitors {
                industry,
                product_type,
            } => serde_json::to_value(self.search_competitors(&industry, &product_type).await?)?,
            SearchParams::SearchMarketSize { industry, year } => {
                let year = year.unwrap_or_else(|| Utc::now().year());
                serde_json::to_value(self.search_market_size(&industry, year).await?)?
            }
            SearchParams::SearchTrends { topic } => {
                serde_json::to_value(self.search_trends(&topic).await?)?
            }
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r##"
<html><body>
<div class="result results_links result--ad">
  <a class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x">Sponsored</a>
  <a class="result__snippet">Buy now</a>
</div>
<div class="result results_links results_links_deep web-result">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rover.com%2F&amp;rut=abc">Rover   Dog Walking</a>
    </h2>
    <a class="result__snippet" href="#">Book trusted <b>dog walkers</b> near you.</a>
  </div>
</div>
<div class="result results_links web-result">
  <a class="result__a" href="https://wagwalking.com/">Wag!</a>
</div>
</body></html>"##;

    #[test]
    fn parses_organic_results_and_skips_ads() {
        let results = parse_search_results(RESULTS_PAGE, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rover Dog Walking");
        assert_eq!(results[0].url, "https://www.rover.com/");
        assert_eq!(results[0].description, "Book trusted dog walkers near you.");
        assert_eq!(results[0].source, "duckduckgo");
        assert_eq!(results[1].url, "https://wagwalking.com/");
        assert_eq!(results[1].description, "");
    }

    #[test]
    fn respects_max_results() {
        assert_eq!(parse_search_results(RESULTS_PAGE, 1).unwrap().len(), 1);
    }

    #[test]
    fn redirect_links_are_decoded() {
        assert_eq!(
            decode_result_url("/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1").as_deref(),
            Some("https://example.com/a?b=1")
        );
        assert_eq!(decode_result_url("//duckduckgo.com/y.js?x=1"), None);
    }

    #[test]
    fn vqd_token_is_found() {
        assert_eq!(
            extract_vqd(r#"<script>nrj('/d.js?q=x&vqd="4-1234567890"&p=1')</script>"#).as_deref(),
            Some("4-1234567890")
        );
        assert_eq!(extract_vqd("no token here"), None);
    }

    #[test]
    fn news_dates_are_rfc3339_and_excerpts_untagged() {
        let payload: NewsPayload = serde_json::from_value(json!({
            "results": [
                {"title": "Pet tech booms", "url": "https://news.example/1", "excerpt": "The <b>pet</b> market", "source": "Example News", "date": 1700000000},
                {"title": "Second", "url": "https://news.example/2"}
            ]
        }))
        .unwrap();

        let news = news_results(payload, 5);
        assert_eq!(news.len(), 2);
        assert_eq!(news[0].date, "2023-11-14T22:13:20+00:00");
        assert_eq!(news[0].description, "The pet market");
        assert_eq!(news[0].kind, "news");
        assert_eq!(news[1].date, "");
    }

    #[test]
    fn duplicates_are_removed_in_order() {
        let make = |url: &str| SearchResult {
            title: url.to_string(),
            url: url.to_string(),
            description: String::new(),
            source: "duckduckgo".to_string(),
        };
        let deduped = dedupe_by_url(vec![make("a"), make("b"), make("a"), make("c")], 2);
        let urls: Vec<&str> = deduped.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn news_token_page_status_is_reported() {
        let app = axum::Router::new().route(
            "/",
            axum::routing::get(|| async { axum::http::StatusCode::TOO_MANY_REQUESTS }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = ToolsConfig {
            duckduckgo_url: format!("http://{}", addr),
            ..ToolsConfig::default()
        };
        let tool = WebSearchTool::new(&config).unwrap();
        let error = tool.search_news("dog walking", 5).await.unwrap_err();
        assert!(error.to_string().contains("429"), "{}", error);
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(serde_json::from_str::<SearchParams>(r#"{"action": "images", "query": "x"}"#).is_err());
        assert!(matches!(
            serde_json::from_str::<SearchParams>(r#"{"action": "search", "query": "x"}"#).unwrap(),
            SearchParams::Search { max_results: 10, .. }
        ));
    }
}
