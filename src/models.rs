//! Request and reply types exchanged between the agents and the orchestrator.
//!
//! Every field the LLM is expected to fill carries `#[serde(default)]` and a
//! lenient deserializer, so a reply that omits a section or answers with a
//! number or an object where text was asked for still parses. Only text that
//! is not JSON at all sends an agent to its canned data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessIdea {
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(deserialize_with = "lenient::text")]
    pub revenue_model: String,
    #[serde(deserialize_with = "lenient::text")]
    pub success_factors: String,
}

impl BusinessIdea {
    /// The idea the workflow works on when the user supplies their own concept.
    pub fn from_user_input(user_input: &str) -> Self {
        Self {
            title: format!("User Business: {}", user_input),
            description: format!("Business concept provided by user: {}", user_input),
            revenue_model: "To be determined by workflow".to_string(),
            success_factors: "User-driven business development".to_string(),
        }
    }

    pub fn title_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.title.trim().is_empty() {
            default
        } else {
            &self.title
        }
    }
}

// ---------------------------------------------------------------------------
// CEO

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaRequest {
    #[serde(default = "default_idea_count")]
    pub count: usize,
}

pub fn default_idea_count() -> usize {
    3
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdeaSet {
    #[serde(deserialize_with = "lenient::records")]
    pub ideas: Vec<BusinessIdea>,
}

// ---------------------------------------------------------------------------
// Research

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub idea: BusinessIdea,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Competitor {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(deserialize_with = "lenient::text")]
    pub strengths: String,
    #[serde(deserialize_with = "lenient::text")]
    pub weaknesses: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketAnalysis {
    #[serde(deserialize_with = "lenient::text")]
    pub market_size: String,
    #[serde(deserialize_with = "lenient::text")]
    pub growth_potential: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub key_challenges: Vec<String>,
    #[serde(deserialize_with = "lenient::text_list")]
    pub opportunities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendations {
    #[serde(deserialize_with = "lenient::text")]
    pub positioning: String,
    #[serde(deserialize_with = "lenient::text")]
    pub differentiation: String,
    #[serde(deserialize_with = "lenient::text")]
    pub target_audience: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolUsageSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competitors_found: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_queries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_articles: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_articles: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_scraped: Option<usize>,
}

/// Which helper tools contributed to a research report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolUsage {
    pub web_search_used: bool,
    pub trends_analysis_used: bool,
    pub news_search_used: bool,
    pub scraping_used: bool,
    pub results_summary: ToolUsageSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchReport {
    #[serde(deserialize_with = "lenient::records")]
    pub competitors: Vec<Competitor>,
    #[serde(deserialize_with = "lenient::record")]
    pub market_analysis: MarketAnalysis,
    #[serde(deserialize_with = "lenient::record")]
    pub recommendations: Recommendations,
    pub tools_used: ToolUsage,
}

impl ResearchReport {
    pub fn fallback() -> Self {
        Self {
            competitors: vec![
                Competitor {
                    name: "Competitor 1".to_string(),
                    description: "Leading competitor in the market".to_string(),
                    strengths: "Strong market presence".to_string(),
                    weaknesses: "Limited innovation".to_string(),
                },
                Competitor {
                    name: "Competitor 2".to_string(),
                    description: "Emerging competitor".to_string(),
                    strengths: "Innovative approach".to_string(),
                    weaknesses: "Small market share".to_string(),
                },
            ],
            market_analysis: MarketAnalysis {
                market_size: "Large and growing market".to_string(),
                growth_potential: "High".to_string(),
                key_challenges: vec![
                    "Market competition".to_string(),
                    "Regulatory requirements".to_string(),
                ],
                opportunities: vec![
                    "Growing demand".to_string(),
                    "Technology advancement".to_string(),
                ],
            },
            recommendations: Recommendations {
                positioning: "Innovative and user-focused solution".to_string(),
                differentiation: "Unique value proposition".to_string(),
                target_audience: "Primary target market".to_string(),
            },
            tools_used: ToolUsage::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Product

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRequest {
    pub idea: BusinessIdea,
    #[serde(default)]
    pub research: ResearchReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetMarket {
    #[serde(deserialize_with = "lenient::text")]
    pub primary_segment: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub secondary_segments: Vec<String>,
    #[serde(deserialize_with = "lenient::text_list")]
    pub user_personas: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductConcept {
    #[serde(deserialize_with = "lenient::text")]
    pub product_name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub product_description: String,
    #[serde(alias = "features", deserialize_with = "lenient::text_list")]
    pub key_features: Vec<String>,
    #[serde(deserialize_with = "lenient::record")]
    pub target_market: TargetMarket,
    #[serde(deserialize_with = "lenient::text")]
    pub value_proposition: String,
    #[serde(deserialize_with = "lenient::text")]
    pub pricing_strategy: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub mvp_scope: Vec<String>,
    #[serde(deserialize_with = "lenient::text_list")]
    pub success_metrics: Vec<String>,
}

impl ProductConcept {
    pub fn display_name(&self) -> &str {
        if self.product_name.trim().is_empty() {
            "Unknown"
        } else {
            &self.product_name
        }
    }
}

// ---------------------------------------------------------------------------
// Marketing

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingRequest {
    pub idea: BusinessIdea,
    pub product: ProductConcept,
    #[serde(default)]
    pub research: ResearchReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSegment {
    #[serde(deserialize_with = "lenient::text")]
    pub segment: String,
    #[serde(deserialize_with = "lenient::text")]
    pub characteristics: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketingChannel {
    #[serde(deserialize_with = "lenient::text")]
    pub channel: String,
    #[serde(deserialize_with = "lenient::text")]
    pub strategy: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketingStrategy {
    #[serde(deserialize_with = "lenient::text")]
    pub brand_positioning: String,
    #[serde(deserialize_with = "lenient::text")]
    pub tagline: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub key_messages: Vec<String>,
    #[serde(deserialize_with = "lenient::records")]
    pub target_segments: Vec<TargetSegment>,
    #[serde(deserialize_with = "lenient::records")]
    pub marketing_channels: Vec<MarketingChannel>,
    #[serde(deserialize_with = "lenient::text")]
    pub content_strategy: String,
    #[serde(deserialize_with = "lenient::text")]
    pub social_media_strategy: String,
    #[serde(deserialize_with = "lenient::text")]
    pub launch_campaign: String,
    #[serde(deserialize_with = "lenient::text")]
    pub budget_allocation: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub success_metrics: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub post_text_twitter: String,
    #[serde(deserialize_with = "lenient::text")]
    pub post_text_linkedin: String,
}

/// Draft posts produced by the CMO's second LLM pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialDrafts {
    #[serde(deserialize_with = "lenient::text")]
    pub post_text_twitter: String,
    #[serde(deserialize_with = "lenient::text")]
    pub post_text_linkedin: String,
}

// ---------------------------------------------------------------------------
// Technical

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalRequest {
    pub idea: BusinessIdea,
    pub product: ProductConcept,
    #[serde(default)]
    pub research: ResearchReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyStack {
    #[serde(deserialize_with = "lenient::text")]
    pub frontend: String,
    #[serde(deserialize_with = "lenient::text")]
    pub backend: String,
    #[serde(deserialize_with = "lenient::text")]
    pub database: String,
    #[serde(deserialize_with = "lenient::text")]
    pub infrastructure: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Architecture {
    #[serde(deserialize_with = "lenient::text")]
    pub overview: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phase {
    #[serde(deserialize_with = "lenient::text")]
    pub phase: String,
    #[serde(deserialize_with = "lenient::text")]
    pub duration: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub deliverables: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeline {
    #[serde(deserialize_with = "lenient::records")]
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalStrategy {
    #[serde(deserialize_with = "lenient::record")]
    pub technology_stack: TechnologyStack,
    #[serde(deserialize_with = "lenient::record")]
    pub architecture: Architecture,
    #[serde(deserialize_with = "lenient::record")]
    pub timeline: Timeline,
    #[serde(deserialize_with = "lenient::text_list")]
    pub security_considerations: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub scalability_plan: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub team_requirements: Vec<String>,
}

// ---------------------------------------------------------------------------
// Website builder prompt

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoltPromptRequest {
    pub idea: BusinessIdea,
    pub product: ProductConcept,
    #[serde(default)]
    pub research: ResearchReport,
    #[serde(default, alias = "marketingStrategy")]
    pub marketing_strategy: MarketingStrategy,
    #[serde(default, alias = "technicalStrategy")]
    pub technical_strategy: TechnicalStrategy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoltPrompt {
    #[serde(deserialize_with = "lenient::text")]
    pub website_title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub website_description: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub pages_required: Vec<String>,
    #[serde(deserialize_with = "lenient::text_list")]
    pub functional_requirements: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub design_guidelines: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub integration_needs: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub bolt_prompt: String,
}

// ---------------------------------------------------------------------------
// Finance

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueRequest {
    pub idea: BusinessIdea,
    pub product: ProductConcept,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Projection {
    #[serde(deserialize_with = "lenient::text")]
    pub year: String,
    #[serde(deserialize_with = "lenient::text")]
    pub revenue: String,
    #[serde(deserialize_with = "lenient::text")]
    pub costs: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueAnalysis {
    #[serde(deserialize_with = "lenient::text")]
    pub estimated_revenue: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub revenue_streams: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub pricing_model: String,
    #[serde(deserialize_with = "lenient::text_list")]
    pub cost_structure: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub break_even_timeline: String,
    #[serde(deserialize_with = "lenient::records")]
    pub projections: Vec<Projection>,
    #[serde(deserialize_with = "lenient::text")]
    pub funding_requirements: String,
    #[serde(
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub warning: Option<String>,
}

impl RevenueAnalysis {
    /// Placeholder the orchestrator uses when the finance agent cannot be reached.
    pub fn unavailable() -> Self {
        Self {
            estimated_revenue: "To be determined".to_string(),
            warning: Some("Finance agent not available".to_string()),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub user_input: String,
    #[serde(default = "default_idea_count")]
    pub idea_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub run_id: Uuid,
    pub user_input: String,
    pub selected_idea: String,
    pub workflow_status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessPlan {
    pub workflow_summary: WorkflowSummary,
    pub idea: BusinessIdea,
    pub research: ResearchReport,
    pub product: ProductConcept,
    pub marketing: MarketingStrategy,
    pub technical: TechnicalStrategy,
    pub bolt_prompt: BoltPrompt,
    pub finance: RevenueAnalysis,
    pub all_ideas: Vec<BusinessIdea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdr_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_posts: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdr_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BusinessPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowResponse {
    pub fn completed(plan: BusinessPlan) -> Self {
        Self {
            success: true,
            message: "Complete workflow executed successfully".to_string(),
            data: Some(plan),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: "Workflow execution failed".to_string(),
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Deserializers that accept whatever JSON shape the LLM chose for a field.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Render any JSON value as prose: arrays joined by `, `, objects as `key: value` pairs.
    fn value_to_text(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            Value::Bool(_) | Value::Number(_) => value.to_string(),
            Value::Array(items) => items
                .iter()
                .map(value_to_text)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| format!("{}: {}", key, value_to_text(value)))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value_to_text(&value))
    }

    pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = text(deserializer)?;
        Ok(if text.is_empty() { None } else { Some(text) })
    }

    /// A list of strings; a lone scalar or object becomes a one-item list.
    pub fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = match Value::deserialize(deserializer)? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        Ok(items
            .iter()
            .map(value_to_text)
            .filter(|text| !text.is_empty())
            .collect())
    }

    /// A nested section; one of the wrong shape is treated as missing.
    pub fn record<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Ok(T::default());
        }
        Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed section in LLM reply: {}", e);
            T::default()
        }))
    }

    /// A list of records; a lone object becomes a one-item list and entries
    /// that are not records are dropped.
    pub fn records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let items = match Value::deserialize(deserializer)? {
            Value::Array(items) => items,
            value @ Value::Object(_) => vec![value],
            _ => Vec::new(),
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Dropping malformed entry in LLM reply: {}", e);
                    None
                }
            })
            .collect())
    }
}
