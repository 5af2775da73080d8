pub mod tools;

use super::{complete_or_fallback, or_unspecified, require_idea, to_prompt_json};
use crate::agent::{Agent, AgentKind};
use crate::error::AgentError;
use crate::llm::{ChatCompletionsClient, ChatModel};
use crate::models::{BusinessIdea, ResearchReport, ResearchRequest, ToolUsage};
use crate::tool::call_json;
use crate::utils::truncate_chars;
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tools::{ResearchToolkit, ToolsConfig};

const MAX_TOKENS: u32 = 2500;
const KEYWORD_CHARS: usize = 50;
const PAGES_TO_SCRAPE: usize = 2;

/// Market research backed by live search, trend and scraping data.
pub struct ResearchAgent {
    model: Arc<dyn ChatModel>,
    tools: Option<ResearchToolkit>,
}

/// Everything the tools turned up for one idea.
#[derive(Debug, Default)]
struct Findings {
    competitors: Vec<Value>,
    trends: Value,
    related: Value,
    market: Vec<Value>,
    news: Vec<Value>,
    pages: Vec<Value>,
    usage: ToolUsage,
}

impl Findings {
    fn record_failure(&mut self, step: &str, error: anyhow::Error) {
        log::warn!("Research step '{}' failed: {}", step, error);
        self.usage.failures.push(format!("{}: {}", step, error));
    }
}

fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

impl ResearchAgent {
    /// `tools` is `None` when research should rely on the LLM alone.
    pub fn new(model: Arc<dyn ChatModel>, tools: Option<ResearchToolkit>) -> Self {
        Self { model, tools }
    }

    pub fn from_env() -> Result<Self> {
        let client = ChatCompletionsClient::from_env(AgentKind::Research)?;
        let config = ToolsConfig::new();

        let tools = if config.enabled {
            Some(ResearchToolkit::new(&config)?)
        } else {
            log::info!("Research tools disabled, using the LLM alone");
            None
        };

        log::info!("Research agent initialized");
        Ok(Self::new(Arc::new(client), tools))
    }

    async fn gather(&self, toolkit: &ResearchToolkit, idea: &BusinessIdea) -> Findings {
        let mut findings = Findings::default();
        let title = idea.title.trim();
        let industry = title.split_whitespace().next().unwrap_or("tech");
        let keyword = if title.is_empty() {
            "technology".to_string()
        } else {
            truncate_chars(title, KEYWORD_CHARS)
        };

        log::info!("Research tool 1: searching for competitors");
        match call_json(
            toolkit.search.as_ref(),
            json!({"action": "search_competitors", "industry": industry, "product_type": title}),
        )
        .await
        {
            Ok(results) => {
                findings.competitors = as_list(results);
                findings.usage.web_search_used = true;
                findings.usage.results_summary.competitors_found = Some(findings.competitors.len());
            }
            Err(e) => findings.record_failure("competitor search", e),
        }

        log::info!("Research tool 2: analyzing search interest");
        match call_json(
            toolkit.trends.as_ref(),
            json!({"action": "interest_over_time", "keywords": [keyword], "timeframe": "today 12-m"}),
        )
        .await
        {
            Ok(trends) => {
                findings.usage.trends_analysis_used = true;
                findings.usage.results_summary.trends_status =
                    trends["status"].as_str().map(str::to_string);
                findings.trends = trends;
            }
            Err(e) => findings.record_failure("trends analysis", e),
        }

        log::info!("Research tool 3: fetching related queries");
        match call_json(
            toolkit.trends.as_ref(),
            json!({"action": "related_queries", "keyword": keyword}),
        )
        .await
        {
            Ok(related) => {
                findings.usage.results_summary.related_queries =
                    Some(related["top"].as_array().map_or(0, Vec::len));
                findings.related = related;
            }
            Err(e) => findings.record_failure("related queries", e),
        }

        log::info!("Research tool 4: researching market size");
        match call_json(
            toolkit.search.as_ref(),
            json!({"action": "search_market_size", "industry": industry}),
        )
        .await
        {
            Ok(results) => {
                findings.market = as_list(results);
                findings.usage.results_summary.market_articles = Some(findings.market.len());
            }
            Err(e) => findings.record_failure("market size search", e),
        }

        log::info!("Research tool 5: searching recent news");
        match call_json(
            toolkit.search.as_ref(),
            json!({"action": "search_news", "query": format!("{} industry news", title), "max_results": 5}),
        )
        .await
        {
            Ok(results) => {
                findings.news = as_list(results);
                findings.usage.news_search_used = true;
                findings.usage.results_summary.news_articles = Some(findings.news.len());
            }
            Err(e) => findings.record_failure("news search", e),
        }

        let urls: Vec<&str> = findings
            .competitors
            .iter()
            .filter_map(|result| result["url"].as_str())
            .take(PAGES_TO_SCRAPE)
            .collect();

        if !urls.is_empty() {
            log::info!("Research tool 6: scraping {} competitor pages", urls.len());
            match call_json(
                toolkit.scraper.as_ref(),
                json!({"action": "scrape_multiple", "urls": urls, "delay_seconds": 1.0}),
            )
            .await
            {
                Ok(results) => {
                    findings.pages = as_list(results)
                        .into_iter()
                        .filter(|page| page["status"] == "success")
                        .collect();
                    findings.usage.scraping_used = !findings.pages.is_empty();
                    findings.usage.results_summary.pages_scraped = Some(findings.pages.len());
                }
                Err(e) => findings.record_failure("competitor scraping", e),
            }
        }

        findings
    }

    fn data_context(findings: &Findings) -> String {
        let competitors: Vec<Value> = findings
            .competitors
            .iter()
            .take(5)
            .map(|r| {
                json!({
                    "title": r["title"],
                    "url": truncate_chars(r["url"].as_str().unwrap_or_default(), 100)
                })
            })
            .collect();
        let related_rising: Vec<&Value> = list_of(&findings.related, "rising").take(5).collect();
        let related_top: Vec<&Value> = list_of(&findings.related, "top").take(5).collect();
        let market_titles: Vec<&Value> = findings.market.iter().take(5).map(|r| &r["title"]).collect();
        let news: Vec<Value> = findings
            .news
            .iter()
            .map(|n| json!({"title": n["title"], "date": n["date"].as_str().unwrap_or("N/A")}))
            .collect();
        let pages: Vec<Value> = findings
            .pages
            .iter()
            .map(|p| json!({"url": p["url"], "title": p["title"], "description": p["description"], "headings": p["headings"]}))
            .collect();

        format!(
            r#"REAL DATA FROM TOOLS:

1. COMPETITOR SEARCH ({} results):
{}

2. SEARCH INTEREST (GOOGLE TRENDS):
Status: {}
Trends: {}

3. RELATED QUERIES:
Rising: {}
Top: {}

4. MARKET SIZE RESEARCH ({} articles):
{}

5. RECENT NEWS ({} articles):
{}

6. COMPETITOR WEBSITES ({} pages):
{}
"#,
            findings.competitors.len(),
            to_prompt_json(&competitors),
            findings.trends["status"].as_str().unwrap_or("N/A"),
            to_prompt_json(&findings.trends.get("trends").cloned().unwrap_or_else(|| json!({}))),
            to_prompt_json(&related_rising),
            to_prompt_json(&related_top),
            findings.market.len(),
            to_prompt_json(&market_titles),
            findings.news.len(),
            to_prompt_json(&news),
            findings.pages.len(),
            to_prompt_json(&pages),
        )
    }

    fn build_prompt(idea: &BusinessIdea, data_context: Option<&str>) -> String {
        let (intro, data) = match data_context {
            Some(context) => (
                "using REAL DATA collected from web searches, search trends, news sources and competitor websites",
                context.to_string(),
            ),
            None => (
                "using your own knowledge of the market",
                "No external data was collected for this request.\n".to_string(),
            ),
        };

        format!(
            r#"As a market research specialist, analyze this business idea {intro}:

BUSINESS IDEA:
Title: {title}
Description: {description}
Revenue Model: {revenue_model}

{data}
Based on this, provide a comprehensive analysis.

Format your response as JSON:
{{
  "competitors": [
    {{
      "name": "Competitor Name",
      "description": "What they do",
      "strengths": "Their advantages",
      "weaknesses": "Their limitations"
    }}
  ],
  "market_analysis": {{
    "market_size": "Estimated market size based on research",
    "growth_potential": "High/Medium/Low with explanation",
    "key_challenges": ["Challenge 1", "Challenge 2"],
    "opportunities": ["Opportunity 1", "Opportunity 2"]
  }},
  "recommendations": {{
    "positioning": "How to position this product",
    "differentiation": "How to stand out from competitors found",
    "target_audience": "Primary target market"
  }}
}}"#,
            title = or_unspecified(&idea.title),
            description = or_unspecified(&idea.description),
            revenue_model = or_unspecified(&idea.revenue_model),
        )
    }
}

fn list_of<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

#[async_trait::async_trait]
impl Agent for ResearchAgent {
    type Request = ResearchRequest;
    type Response = ResearchReport;

    fn kind(&self) -> AgentKind {
        AgentKind::Research
    }

    fn description(&self) -> &str {
        "Market research with real tools (web search, search trends, news and scraping)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "idea": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "description": {"type": "string"},
                        "revenue_model": {"type": "string"}
                    }
                }
            },
            "required": ["idea"]
        })
    }

    fn validate(&self, request: &ResearchRequest) -> Result<(), AgentError> {
        require_idea(&request.idea)
    }

    async fn execute(&self, request: ResearchRequest) -> Result<ResearchReport> {
        let idea = request.idea;
        log::info!("Research request for idea: {}", idea.title_or("Unknown"));

        let findings = match &self.tools {
            Some(toolkit) => Some(self.gather(toolkit, &idea).await),
            None => None,
        };

        let context = findings.as_ref().map(Self::data_context);
        let prompt = Self::build_prompt(&idea, context.as_deref());

        let mut report: ResearchReport = complete_or_fallback(
            self.model.as_ref(),
            AgentKind::Research,
            &prompt,
            MAX_TOKENS,
            ResearchReport::fallback,
        )
        .await;

        report.tools_used = findings.map(|f| f.usage).unwrap_or_default();

        let used = [
            report.tools_used.web_search_used,
            report.tools_used.trends_analysis_used,
            report.tools_used.news_search_used,
            report.tools_used.scraping_used,
        ]
        .iter()
        .filter(|used| **used)
        .count();
        log::info!("Research complete, {} tools contributed", used);

        Ok(report)
    }
}
