use super::{complete_or_fallback, or_unspecified, require_idea, to_prompt_json};
use crate::agent::{Agent, AgentKind};
use crate::error::AgentError;
use crate::llm::{ChatCompletionsClient, ChatModel};
use crate::models::{BoltPrompt, BoltPromptRequest, ProductConcept};
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;

const MAX_TOKENS: u32 = 3000;

/// Turns the plan so far into a prompt for an AI website builder.
pub struct HeadEngineeringAgent {
    model: Arc<dyn ChatModel>,
}

impl HeadEngineeringAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn from_env() -> Result<Self> {
        let client = ChatCompletionsClient::from_env(AgentKind::HeadEngineering)?;
        log::info!("Head of Engineering agent initialized");
        Ok(Self::new(Arc::new(client)))
    }

    fn build_prompt(request: &BoltPromptRequest) -> String {
        let product = &request.product;
        let marketing = &request.marketing_strategy;
        let technical = &request.technical_strategy;

        format!(
            r#"As Head of Engineering, write a detailed prompt for an AI website builder (bolt.new) that will produce the launch website for this product.

PRODUCT:
Name: {name}
Description: {description}
Key Features: {features}
Value Proposition: {value_proposition}

MARKETING:
Brand Positioning: {positioning}
Tagline: {tagline}
Key Messages: {messages}

TECHNICAL:
Frontend: {frontend}
Backend: {backend}

MARKET:
Target Audience: {audience}

Format your response as JSON:
{{
  "website_title": "Website title",
  "website_description": "What the website is for",
  "pages_required": ["Page 1"],
  "functional_requirements": ["Requirement 1"],
  "design_guidelines": "Colours, typography and tone",
  "integration_needs": ["Integration 1"],
  "bolt_prompt": "The complete prompt to paste into bolt.new"
}}"#,
            name = product.display_name(),
            description = or_unspecified(&product.product_description),
            features = to_prompt_json(&product.key_features),
            value_proposition = or_unspecified(&product.value_proposition),
            positioning = or_unspecified(&marketing.brand_positioning),
            tagline = or_unspecified(&marketing.tagline),
            messages = to_prompt_json(&marketing.key_messages),
            frontend = or_unspecified(&technical.technology_stack.frontend),
            backend = or_unspecified(&technical.technology_stack.backend),
            audience = or_unspecified(&request.research.recommendations.target_audience),
        )
    }
}

pub fn fallback_prompt(product: &ProductConcept) -> BoltPrompt {
    let name = product.display_name();

    BoltPrompt {
        website_title: format!("{} - Website", name),
        website_description: format!("Official website for {}", name),
        pages_required: ["Home", "About", "Services", "Contact"]
            .iter()
            .map(|page| page.to_string())
            .collect(),
        functional_requirements: ["Responsive design", "Contact form", "SEO optimization"]
            .iter()
            .map(|requirement| requirement.to_string())
            .collect(),
        design_guidelines: "Modern, clean and professional".to_string(),
        integration_needs: Vec::new(),
        bolt_prompt: format!(
            "Create a website for {} with modern design and user-friendly interface",
            name
        ),
    }
}

#[async_trait::async_trait]
impl Agent for HeadEngineeringAgent {
    type Request = BoltPromptRequest;
    type Response = BoltPrompt;

    fn kind(&self) -> AgentKind {
        AgentKind::HeadEngineering
    }

    fn description(&self) -> &str {
        "Website builder prompt generation from the business plan"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "idea": {"type": "object"},
                "product": {"type": "object"},
                "research": {"type": "object"},
                "marketing_strategy": {"type": "object"},
                "technical_strategy": {"type": "object"}
            },
            "required": ["idea", "product"]
        })
    }

    fn validate(&self, request: &BoltPromptRequest) -> Result<(), AgentError> {
        require_idea(&request.idea)
    }

    async fn execute(&self, request: BoltPromptRequest) -> Result<BoltPrompt> {
        log::info!("Head of Engineering writing website prompt for: {}", request.product.display_name());

        let prompt = Self::build_prompt(&request);
        let mut bolt: BoltPrompt = complete_or_fallback(
            self.model.as_ref(),
            AgentKind::HeadEngineering,
            &prompt,
            MAX_TOKENS,
            || fallback_prompt(&request.product),
        )
        .await;

        // an empty builder prompt is useless downstream
        if bolt.bolt_prompt.trim().is_empty() {
            bolt.bolt_prompt = fallback_prompt(&request.product).bolt_prompt;
        }

        Ok(bolt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusinessIdea, MarketingStrategy, ResearchReport, TechnicalStrategy};
    use crate::test_support::MockChatModel;

    fn request() -> BoltPromptRequest {
        BoltPromptRequest {
            idea: BusinessIdea::from_user_input("plant care"),
            product: ProductConcept {
                product_name: "Leafy".into(),
                ..Default::default()
            },
            research: ResearchReport::fallback(),
            marketing_strategy: MarketingStrategy {
                tagline: "Never lose a plant".into(),
                ..Default::default()
            },
            technical_strategy: TechnicalStrategy::default(),
        }
    }

    #[test]
    fn camel_case_request_fields_are_accepted() {
        let request: BoltPromptRequest = serde_json::from_value(json!({
            "idea": {"title": "Plant care"},
            "product": {"product_name": "Leafy"},
            "marketingStrategy": {"tagline": "Green"},
            "technicalStrategy": {"technology_stack": {"frontend": "Vue"}}
        }))
        .unwrap();
        assert_eq!(request.marketing_strategy.tagline, "Green");
        assert_eq!(request.technical_strategy.technology_stack.frontend, "Vue");
    }

    #[tokio::test]
    async fn prompt_comes_from_llm() {
        let model = Arc::new(MockChatModel::always(
            r#"{"website_title": "Leafy", "pages_required": ["Home", "Pricing"], "bolt_prompt": "Build a plant care site"}"#,
        ));
        let bolt = HeadEngineeringAgent::new(model.clone()).execute(request()).await.unwrap();
        assert_eq!(bolt.pages_required, vec!["Home", "Pricing"]);
        assert_eq!(bolt.bolt_prompt, "Build a plant care site");

        let (prompt, max_tokens) = &model.prompts()[0];
        assert_eq!(*max_tokens, 3000);
        assert!(prompt.contains("Tagline: Never lose a plant"));
        assert!(prompt.contains("Frontend: Not specified"));
    }

    #[tokio::test]
    async fn blank_builder_prompt_is_filled() {
        let model = Arc::new(MockChatModel::always(r#"{"website_title": "Leafy"}"#));
        let bolt = HeadEngineeringAgent::new(model).execute(request()).await.unwrap();
        assert_eq!(bolt.website_title, "Leafy");
        assert_eq!(
            bolt.bolt_prompt,
            "Create a website for Leafy with modern design and user-friendly interface"
        );
    }

    #[tokio::test]
    async fn llm_outage_uses_fallback() {
        let bolt = HeadEngineeringAgent::new(Arc::new(MockChatModel::failing()))
            .execute(request())
            .await
            .unwrap();
        assert_eq!(bolt, fallback_prompt(&request().product));
        assert_eq!(bolt.website_title, "Leafy - Website");
        assert_eq!(bolt.pages_required, vec!["Home", "About", "Services", "Contact"]);
    }
}
