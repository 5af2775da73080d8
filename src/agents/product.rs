use super::{complete_or_fallback, or_unspecified, require_idea, to_prompt_json};
use crate::agent::{Agent, AgentKind};
use crate::error::AgentError;
use crate::llm::{ChatCompletionsClient, ChatModel};
use crate::models::{BusinessIdea, ProductConcept, ProductRequest, TargetMarket};
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;

const MAX_TOKENS: u32 = 2000;

pub struct ProductAgent {
    model: Arc<dyn ChatModel>,
}

impl ProductAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn from_env() -> Result<Self> {
        let client = ChatCompletionsClient::from_env(AgentKind::Product)?;
        log::info!("Product agent initialized");
        Ok(Self::new(Arc::new(client)))
    }

    fn build_prompt(request: &ProductRequest) -> String {
        let idea = &request.idea;
        let research = &request.research;

        format!(
            r#"As a Head of Product, turn this business idea into a concrete product concept:

BUSINESS IDEA:
Title: {title}
Description: {description}
Revenue Model: {revenue_model}

MARKET RESEARCH:
Market Size: {market_size}
Competitors: {competitors}
Opportunities: {opportunities}
Recommended Positioning: {positioning}
Target Audience: {audience}

Format your response as JSON:
{{
  "product_name": "Short memorable product name",
  "product_description": "What the product is and does",
  "key_features": ["Feature 1", "Feature 2"],
  "target_market": {{
    "primary_segment": "Main customer segment",
    "secondary_segments": ["Segment 1"],
    "user_personas": ["Persona 1"]
  }},
  "value_proposition": "Why customers choose this product",
  "pricing_strategy": "How the product is priced",
  "mvp_scope": ["Must-have for launch 1"],
  "success_metrics": ["Metric 1"]
}}"#,
            title = or_unspecified(&idea.title),
            description = or_unspecified(&idea.description),
            revenue_model = or_unspecified(&idea.revenue_model),
            market_size = or_unspecified(&research.market_analysis.market_size),
            competitors = to_prompt_json(&research.competitors),
            opportunities = to_prompt_json(&research.market_analysis.opportunities),
            positioning = or_unspecified(&research.recommendations.positioning),
            audience = or_unspecified(&research.recommendations.target_audience),
        )
    }
}

/// Concept derived from the idea alone, used when the LLM gives nothing usable.
pub fn fallback_product(idea: &BusinessIdea) -> ProductConcept {
    let name = idea.title_or("New Product").to_string();

    ProductConcept {
        product_description: if idea.description.trim().is_empty() {
            format!("{} delivered as a simple, modern digital product", name)
        } else {
            idea.description.clone()
        },
        key_features: vec![
            "Core functionality".to_string(),
            "User-friendly interface".to_string(),
            "Mobile-responsive design".to_string(),
        ],
        target_market: TargetMarket {
            primary_segment: "Early adopters".to_string(),
            secondary_segments: vec!["Small businesses".to_string()],
            user_personas: vec!["Tech-savvy professional".to_string()],
        },
        value_proposition: format!("{} makes the job simpler, faster and cheaper", name),
        pricing_strategy: if idea.revenue_model.trim().is_empty() {
            "To be determined".to_string()
        } else {
            idea.revenue_model.clone()
        },
        mvp_scope: vec![
            "Core feature set".to_string(),
            "Basic user onboarding".to_string(),
        ],
        success_metrics: vec![
            "User acquisition".to_string(),
            "Retention rate".to_string(),
        ],
        product_name: name,
    }
}

#[async_trait::async_trait]
impl Agent for ProductAgent {
    type Request = ProductRequest;
    type Response = ProductConcept;

    fn kind(&self) -> AgentKind {
        AgentKind::Product
    }

    fn description(&self) -> &str {
        "Product concept development and feature planning"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "idea": {"type": "object", "description": "Business idea"},
                "research": {"type": "object", "description": "Research report for the idea"}
            },
            "required": ["idea"]
        })
    }

    fn validate(&self, request: &ProductRequest) -> Result<(), AgentError> {
        require_idea(&request.idea)
    }

    async fn execute(&self, request: ProductRequest) -> Result<ProductConcept> {
        log::info!("Product developing concept for: {}", request.idea.title_or("Unknown"));

        let prompt = Self::build_prompt(&request);
        let mut product: ProductConcept = complete_or_fallback(
            self.model.as_ref(),
            AgentKind::Product,
            &prompt,
            MAX_TOKENS,
            || fallback_product(&request.idea),
        )
        .await;

        if product.product_name.trim().is_empty() {
            product.product_name = request.idea.title_or("New Product").to_string();
        }

        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResearchReport;
    use crate::test_support::MockChatModel;

    fn request() -> ProductRequest {
        ProductRequest {
            idea: BusinessIdea {
                title: "Dog Walking Marketplace".into(),
                description: "On-demand dog walks".into(),
                revenue_model: "Commission".into(),
                success_factors: String::new(),
            },
            research: ResearchReport::fallback(),
        }
    }

    #[tokio::test]
    async fn concept_comes_from_llm() {
        let model = Arc::new(MockChatModel::always(
            r#"{"product_name": "Walkr", "key_features": ["Booking", "GPS"], "target_market": {"primary_segment": "Urban pet owners"}}"#,
        ));
        let agent = ProductAgent::new(model.clone());

        let product = agent.execute(request()).await.unwrap();
        assert_eq!(product.product_name, "Walkr");
        assert_eq!(product.key_features, vec!["Booking", "GPS"]);
        assert_eq!(product.target_market.primary_segment, "Urban pet owners");

        let prompt = &model.prompts()[0].0;
        assert!(prompt.contains("Title: Dog Walking Marketplace"));
        assert!(prompt.contains("Large and growing market"));
    }

    #[tokio::test]
    async fn missing_name_is_filled_from_idea() {
        let agent = ProductAgent::new(Arc::new(MockChatModel::always(r#"{"value_proposition": "Happy dogs"}"#)));
        let product = agent.execute(request()).await.unwrap();
        assert_eq!(product.product_name, "Dog Walking Marketplace");
        assert_eq!(product.value_proposition, "Happy dogs");
    }

    #[tokio::test]
    async fn llm_outage_uses_idea_based_fallback() {
        let agent = ProductAgent::new(Arc::new(MockChatModel::failing()));
        let product = agent.execute(request()).await.unwrap();
        assert_eq!(product, fallback_product(&request().idea));
        assert_eq!(product.pricing_strategy, "Commission");
        assert_eq!(product.product_description, "On-demand dog walks");
    }
}
