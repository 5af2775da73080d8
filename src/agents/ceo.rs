use super::complete_or_fallback;
use crate::agent::{Agent, AgentKind};
use crate::llm::{ChatCompletionsClient, ChatModel};
use crate::models::{BusinessIdea, IdeaRequest, IdeaSet};
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;

const MAX_TOKENS: u32 = 2000;
const MAX_IDEAS: usize = 10;

/// Generates fresh business ideas.
pub struct CeoAgent {
    model: Arc<dyn ChatModel>,
}

impl CeoAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn from_env() -> Result<Self> {
        let client = ChatCompletionsClient::from_env(AgentKind::Ceo)?;
        log::info!("CEO agent initialized");
        Ok(Self::new(Arc::new(client)))
    }

    fn build_prompt(count: usize) -> String {
        format!(
            r#"As a visionary CEO, generate {count} innovative, practical business ideas that could be launched by a small team within a year.

For each idea give a short title, a description of the problem and solution, the revenue model, and the key success factors.

Format your response as JSON:
{{
  "ideas": [
    {{
      "title": "Idea title",
      "description": "What the business does and for whom",
      "revenue_model": "How it makes money",
      "success_factors": "What has to go right"
    }}
  ]
}}"#
        )
    }
}

/// Requested idea count clamped to `1..=10`.
pub fn clamp_count(count: usize) -> usize {
    count.clamp(1, MAX_IDEAS)
}

fn fallback_ideas(count: usize) -> IdeaSet {
    let templates = [
        (
            "AI-Powered Personal Finance Coach",
            "A mobile app that analyzes spending and gives personalized saving advice",
            "Freemium subscription",
            "Trustworthy advice, bank integrations, habit-forming design",
        ),
        (
            "Local Services Marketplace",
            "A platform connecting neighbourhood service providers with nearby customers",
            "Commission on bookings",
            "Supply density, reviews, fast matching",
        ),
        (
            "Sustainable Packaging Subscription",
            "Compostable shipping supplies delivered monthly to small online shops",
            "Monthly subscription",
            "Cost parity with plastic, reliable delivery, brand partnerships",
        ),
    ];

    let ideas = (0..count)
        .map(|i| {
            let (title, description, revenue_model, success_factors) = templates[i % templates.len()];
            let title = if i < templates.len() {
                title.to_string()
            } else {
                format!("{} #{}", title, i / templates.len() + 1)
            };
            BusinessIdea {
                title,
                description: description.to_string(),
                revenue_model: revenue_model.to_string(),
                success_factors: success_factors.to_string(),
            }
        })
        .collect();

    IdeaSet { ideas }
}

#[async_trait::async_trait]
impl Agent for CeoAgent {
    type Request = IdeaRequest;
    type Response = IdeaSet;

    fn kind(&self) -> AgentKind {
        AgentKind::Ceo
    }

    fn description(&self) -> &str {
        "Strategic leadership and business idea generation"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "count": {
                    "type": "integer",
                    "description": "How many ideas to generate (1-10)",
                    "default": 3
                }
            }
        })
    }

    async fn execute(&self, request: IdeaRequest) -> Result<IdeaSet> {
        let count = clamp_count(request.count);
        log::info!("CEO generating {} business ideas", count);

        let prompt = Self::build_prompt(count);
        let mut ideas: IdeaSet = complete_or_fallback(
            self.model.as_ref(),
            AgentKind::Ceo,
            &prompt,
            MAX_TOKENS,
            || fallback_ideas(count),
        )
        .await;

        ideas.ideas.retain(|idea| !idea.title.trim().is_empty());
        if ideas.ideas.is_empty() {
            log::warn!("CEO reply contained no usable ideas, using fallback");
            ideas = fallback_ideas(count);
        }
        ideas.ideas.truncate(count);

        Ok(ideas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockChatModel;

    #[test]
    fn count_is_clamped() {
        assert_eq!(clamp_count(0), 1);
        assert_eq!(clamp_count(3), 3);
        assert_eq!(clamp_count(50), 10);
    }

    #[test]
    fn fallback_fills_requested_count() {
        let ideas = fallback_ideas(5).ideas;
        assert_eq!(ideas.len(), 5);
        assert_eq!(ideas[0].title, "AI-Powered Personal Finance Coach");
        assert_eq!(ideas[3].title, "AI-Powered Personal Finance Coach #2");
        assert_eq!(fallback_ideas(1).ideas.len(), 1);
    }

    #[tokio::test]
    async fn parses_llm_ideas_and_trims_extras() {
        let model = Arc::new(MockChatModel::always(
            r#"{"ideas": [
                {"title": "Dog walking app", "description": "On-demand walks", "revenue_model": "Commission", "success_factors": "Trust"},
                {"title": "Meal kits for students", "description": "Cheap kits", "revenue_model": "Subscription", "success_factors": "Price"},
                {"title": "Extra", "description": "", "revenue_model": "", "success_factors": ""}
            ]}"#,
        ));
        let agent = CeoAgent::new(model.clone());

        let ideas = agent.execute(IdeaRequest { count: 2 }).await.unwrap();
        assert_eq!(ideas.ideas.len(), 2);
        assert_eq!(ideas.ideas[1].title, "Meal kits for students");

        let (prompt, max_tokens) = &model.prompts()[0];
        assert!(prompt.contains("generate 2 innovative"));
        assert_eq!(*max_tokens, 2000);
    }

    #[tokio::test]
    async fn garbage_reply_falls_back() {
        let agent = CeoAgent::new(Arc::new(MockChatModel::always("I have no ideas today.")));
        let ideas = agent.execute(IdeaRequest { count: 3 }).await.unwrap();
        assert_eq!(ideas, fallback_ideas(3));
    }
}
