use super::{complete_or_fallback, or_unspecified, require_idea, to_prompt_json};
use crate::agent::{Agent, AgentKind};
use crate::error::AgentError;
use crate::llm::{ChatCompletionsClient, ChatModel};
use crate::models::{Architecture, Phase, TechnicalRequest, TechnicalStrategy, Timeline, TechnologyStack};
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;

const MAX_TOKENS: u32 = 2500;

pub struct CtoAgent {
    model: Arc<dyn ChatModel>,
}

impl CtoAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn from_env() -> Result<Self> {
        let client = ChatCompletionsClient::from_env(AgentKind::Cto)?;
        log::info!("CTO agent initialized");
        Ok(Self::new(Arc::new(client)))
    }

    fn build_prompt(request: &TechnicalRequest) -> String {
        let product = &request.product;

        format!(
            r#"As a Chief Technology Officer, design the technical strategy for this product:

PRODUCT:
Name: {name}
Description: {description}
Key Features: {features}
MVP Scope: {mvp}

BUSINESS CONTEXT:
Idea: {idea}
Market Size: {market_size}
Key Challenges: {challenges}

Format your response as JSON:
{{
  "technology_stack": {{
    "frontend": "Frontend technology",
    "backend": "Backend technology",
    "database": "Database",
    "infrastructure": "Hosting and deployment"
  }},
  "architecture": {{
    "overview": "System architecture summary",
    "components": ["Component 1"]
  }},
  "timeline": {{
    "phases": [{{"phase": "Phase name", "duration": "Duration", "deliverables": ["Deliverable 1"]}}]
  }},
  "security_considerations": ["Consideration 1"],
  "scalability_plan": "How the system scales",
  "team_requirements": ["Role 1"]
}}"#,
            name = product.display_name(),
            description = or_unspecified(&product.product_description),
            features = to_prompt_json(&product.key_features),
            mvp = to_prompt_json(&product.mvp_scope),
            idea = request.idea.title_or("Not specified"),
            market_size = or_unspecified(&request.research.market_analysis.market_size),
            challenges = to_prompt_json(&request.research.market_analysis.key_challenges),
        )
    }
}

pub fn fallback_strategy() -> TechnicalStrategy {
    TechnicalStrategy {
        technology_stack: TechnologyStack {
            frontend: "React".to_string(),
            backend: "Node.js".to_string(),
            database: "PostgreSQL".to_string(),
            infrastructure: "Cloud hosting".to_string(),
        },
        architecture: Architecture {
            overview: "Modern web architecture".to_string(),
            components: vec!["Web client".to_string(), "REST API".to_string(), "Database".to_string()],
        },
        timeline: Timeline {
            phases: vec![Phase {
                phase: "MVP development".to_string(),
                duration: "3 months".to_string(),
                deliverables: vec!["Working MVP".to_string()],
            }],
        },
        security_considerations: vec!["Authentication".to_string(), "Data encryption".to_string()],
        scalability_plan: "Scale horizontally as usage grows".to_string(),
        team_requirements: vec!["Full-stack developer".to_string()],
    }
}

#[async_trait::async_trait]
impl Agent for CtoAgent {
    type Request = TechnicalRequest;
    type Response = TechnicalStrategy;

    fn kind(&self) -> AgentKind {
        AgentKind::Cto
    }

    fn description(&self) -> &str {
        "Technology stack, architecture and delivery timeline"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "idea": {"type": "object", "description": "Business idea"},
                "product": {"type": "object", "description": "Product concept"},
                "research": {"type": "object", "description": "Research report"}
            },
            "required": ["idea", "product"]
        })
    }

    fn validate(&self, request: &TechnicalRequest) -> Result<(), AgentError> {
        require_idea(&request.idea)
    }

    async fn execute(&self, request: TechnicalRequest) -> Result<TechnicalStrategy> {
        log::info!("CTO planning technology for: {}", request.product.display_name());

        let prompt = Self::build_prompt(&request);
        let strategy = complete_or_fallback(
            self.model.as_ref(),
            AgentKind::Cto,
            &prompt,
            MAX_TOKENS,
            fallback_strategy,
        )
        .await;

        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusinessIdea, ProductConcept, ResearchReport};
    use crate::test_support::MockChatModel;

    fn request() -> TechnicalRequest {
        TechnicalRequest {
            idea: BusinessIdea::from_user_input("tea subscriptions"),
            product: ProductConcept {
                product_name: "Steep".into(),
                key_features: vec!["Monthly box".into()],
                ..Default::default()
            },
            research: ResearchReport::fallback(),
        }
    }

    #[tokio::test]
    async fn strategy_comes_from_llm() {
        let model = Arc::new(MockChatModel::always(
            r#"{"technology_stack": {"frontend": "SvelteKit", "backend": "Rust"}, "timeline": {"phases": [{"phase": "Beta", "duration": "6 weeks"}]}}"#,
        ));
        let strategy = CtoAgent::new(model.clone()).execute(request()).await.unwrap();

        assert_eq!(strategy.technology_stack.backend, "Rust");
        assert_eq!(strategy.timeline.phases[0].duration, "6 weeks");
        assert!(strategy.security_considerations.is_empty());

        let (prompt, max_tokens) = &model.prompts()[0];
        assert_eq!(*max_tokens, 2500);
        assert!(prompt.contains("Monthly box"));
        assert!(prompt.contains("Regulatory requirements"));
    }

    #[tokio::test]
    async fn unparseable_reply_falls_back() {
        let strategy = CtoAgent::new(Arc::new(MockChatModel::always("Use whatever you like.")))
            .execute(request())
            .await
            .unwrap();
        assert_eq!(strategy.technology_stack.frontend, "React");
        assert_eq!(strategy.technology_stack.backend, "Node.js");
        assert_eq!(strategy.architecture.overview, "Modern web architecture");
        assert_eq!(strategy.timeline.phases[0].duration, "3 months");
    }
}
