use super::{complete_or_fallback, or_unspecified, require_idea, to_prompt_json};
use crate::agent::{Agent, AgentKind};
use crate::error::AgentError;
use crate::llm::{ChatCompletionsClient, ChatModel};
use crate::models::{RevenueAnalysis, RevenueRequest};
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;

const MAX_TOKENS: u32 = 2000;

pub struct FinanceAgent {
    model: Arc<dyn ChatModel>,
}

impl FinanceAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn from_env() -> Result<Self> {
        let client = ChatCompletionsClient::from_env(AgentKind::Finance)?;
        log::info!("Finance agent initialized");
        Ok(Self::new(Arc::new(client)))
    }

    fn build_prompt(request: &RevenueRequest) -> String {
        let idea = &request.idea;
        let product = &request.product;

        format!(
            r#"As a CFO, estimate the revenue potential of this business:

BUSINESS IDEA:
Title: {title}
Revenue Model: {revenue_model}

PRODUCT:
Name: {name}
Pricing Strategy: {pricing}
Target Market: {target_market}

Format your response as JSON:
{{
  "estimated_revenue": "Estimated first-year revenue",
  "revenue_streams": ["Stream 1"],
  "pricing_model": "Pricing model",
  "cost_structure": ["Cost 1"],
  "break_even_timeline": "When the business breaks even",
  "projections": [{{"year": "Year 1", "revenue": "$...", "costs": "$..."}}],
  "funding_requirements": "Funding needed to reach break-even"
}}"#,
            title = idea.title_or("Not specified"),
            revenue_model = or_unspecified(&idea.revenue_model),
            name = product.display_name(),
            pricing = or_unspecified(&product.pricing_strategy),
            target_market = to_prompt_json(&product.target_market),
        )
    }
}

fn fallback_analysis() -> RevenueAnalysis {
    RevenueAnalysis {
        estimated_revenue: "To be determined".to_string(),
        revenue_streams: vec!["Primary product sales".to_string()],
        pricing_model: "To be determined".to_string(),
        break_even_timeline: "To be determined".to_string(),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl Agent for FinanceAgent {
    type Request = RevenueRequest;
    type Response = RevenueAnalysis;

    fn kind(&self) -> AgentKind {
        AgentKind::Finance
    }

    fn description(&self) -> &str {
        "Revenue estimation and financial projections"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "idea": {"type": "object", "description": "Business idea"},
                "product": {"type": "object", "description": "Product concept"}
            },
            "required": ["idea", "product"]
        })
    }

    fn validate(&self, request: &RevenueRequest) -> Result<(), AgentError> {
        require_idea(&request.idea)
    }

    async fn execute(&self, request: RevenueRequest) -> Result<RevenueAnalysis> {
        log::info!("Finance estimating revenue for: {}", request.product.display_name());

        let prompt = Self::build_prompt(&request);
        let mut analysis: RevenueAnalysis = complete_or_fallback(
            self.model.as_ref(),
            AgentKind::Finance,
            &prompt,
            MAX_TOKENS,
            fallback_analysis,
        )
        .await;

        // only the orchestrator sets the availability warning
        analysis.warning = None;
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusinessIdea, ProductConcept};
    use crate::test_support::MockChatModel;

    fn request() -> RevenueRequest {
        RevenueRequest {
            idea: BusinessIdea {
                title: "Tea subscriptions".into(),
                revenue_model: "Monthly subscription".into(),
                ..Default::default()
            },
            product: ProductConcept {
                product_name: "Steep".into(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn analysis_comes_from_llm() {
        let model = Arc::new(MockChatModel::always(
            r#"{"estimated_revenue": "$250k", "projections": [{"year": "Year 1", "revenue": "$250k", "costs": "$180k"}], "warning": "ignore me"}"#,
        ));
        let analysis = FinanceAgent::new(model.clone()).execute(request()).await.unwrap();
        assert_eq!(analysis.estimated_revenue, "$250k");
        assert_eq!(analysis.projections[0].costs, "$180k");
        assert_eq!(analysis.warning, None);

        let (prompt, max_tokens) = &model.prompts()[0];
        assert_eq!(*max_tokens, 2000);
        assert!(prompt.contains("Revenue Model: Monthly subscription"));
        assert!(prompt.contains("Pricing Strategy: Not specified"));
    }

    #[tokio::test]
    async fn numeric_projections_are_kept() {
        let model = Arc::new(MockChatModel::always(
            r#"{"estimated_revenue": "$1.2M", "projections": [{"year": 1, "revenue": 1200000, "costs": 800000}]}"#,
        ));
        let analysis = FinanceAgent::new(model).execute(request()).await.unwrap();
        assert_eq!(analysis.estimated_revenue, "$1.2M");
        assert!(analysis.revenue_streams.is_empty());
        assert_eq!(analysis.projections[0].year, "1");
        assert_eq!(analysis.projections[0].revenue, "1200000");
    }

    #[tokio::test]
    async fn llm_outage_uses_fallback() {
        let analysis = FinanceAgent::new(Arc::new(MockChatModel::failing()))
            .execute(request())
            .await
            .unwrap();
        assert_eq!(analysis.estimated_revenue, "To be determined");
        assert!(analysis.warning.is_none());
    }
}
