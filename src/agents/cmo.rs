use super::{complete_or_fallback, or_unspecified, require_idea, to_prompt_json};
use crate::agent::{Agent, AgentKind};
use crate::error::AgentError;
use crate::llm::{ChatCompletionsClient, ChatModel};
use crate::models::{MarketingRequest, MarketingStrategy, ProductConcept, SocialDrafts};
use crate::parser::parse_llm_json;
use crate::utils::truncate_chars;
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;

const STRATEGY_MAX_TOKENS: u32 = 3000;
const DRAFTS_MAX_TOKENS: u32 = 800;
const TWITTER_MAX_CHARS: usize = 280;
const LINKEDIN_MAX_CHARS: usize = 700;

/// Marketing strategy plus ready-to-post social drafts.
pub struct CmoAgent {
    model: Arc<dyn ChatModel>,
}

impl CmoAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn from_env() -> Result<Self> {
        let client = ChatCompletionsClient::from_env(AgentKind::Cmo)?;
        log::info!("CMO agent initialized");
        Ok(Self::new(Arc::new(client)))
    }

    fn build_strategy_prompt(request: &MarketingRequest) -> String {
        let product = &request.product;
        let research = &request.research;

        format!(
            r#"As a Chief Marketing Officer, create a comprehensive marketing strategy for this product:

PRODUCT:
Name: {name}
Description: {description}
Target Market: {target_market}
Value Proposition: {value_proposition}

MARKET RESEARCH:
Market Size: {market_size}
Competitors: {competitors}
Target Audience: {audience}

Cover brand positioning, key messages, target segments, marketing channels, content strategy, social media strategy, launch campaign and budget allocation.
Also write one Twitter post (at most 280 characters) and one LinkedIn post (at most 700 characters) announcing the product.

Format your response as JSON:
{{
  "brand_positioning": "How the brand is positioned",
  "tagline": "Short tagline",
  "key_messages": ["Message 1", "Message 2"],
  "target_segments": [{{"segment": "Segment name", "characteristics": "Who they are"}}],
  "marketing_channels": [{{"channel": "Channel name", "strategy": "How it is used"}}],
  "content_strategy": "Content plan",
  "social_media_strategy": "Social media plan",
  "launch_campaign": "Launch campaign plan",
  "budget_allocation": "How the budget is split",
  "success_metrics": ["Metric 1"],
  "post_text_twitter": "Twitter post",
  "post_text_linkedin": "LinkedIn post"
}}"#,
            name = product.display_name(),
            description = or_unspecified(&product.product_description),
            target_market = to_prompt_json(&product.target_market),
            value_proposition = or_unspecified(&product.value_proposition),
            market_size = or_unspecified(&research.market_analysis.market_size),
            competitors = to_prompt_json(&research.competitors),
            audience = or_unspecified(&research.recommendations.target_audience),
        )
    }

    fn build_drafts_prompt(product: &ProductConcept, strategy: &MarketingStrategy) -> String {
        format!(
            r#"Write launch posts for the product "{name}".

Positioning: {positioning}
Tagline: {tagline}
Key messages: {messages}

Twitter post: at most 280 characters, punchy, up to two hashtags.
LinkedIn post: at most 700 characters, professional tone.

Format your response as JSON:
{{
  "post_text_twitter": "Twitter post",
  "post_text_linkedin": "LinkedIn post"
}}"#,
            name = product.display_name(),
            positioning = or_unspecified(&strategy.brand_positioning),
            tagline = or_unspecified(&strategy.tagline),
            messages = to_prompt_json(&strategy.key_messages),
        )
    }

    /// Fill whichever post the strategy reply left empty.
    async fn fill_social_drafts(&self, product: &ProductConcept, strategy: &mut MarketingStrategy) {
        let prompt = Self::build_drafts_prompt(product, strategy);
        let drafts = match self.model.complete(&prompt, DRAFTS_MAX_TOKENS).await {
            Ok(text) => parse_llm_json::<SocialDrafts>(&text),
            Err(e) => Err(e),
        };

        match drafts {
            Ok(drafts) => {
                if strategy.post_text_twitter.trim().is_empty() {
                    strategy.post_text_twitter = drafts.post_text_twitter;
                }
                if strategy.post_text_linkedin.trim().is_empty() {
                    strategy.post_text_linkedin = drafts.post_text_linkedin;
                }
            }
            Err(e) => log::warn!("CMO social draft generation failed: {}", e),
        }
    }
}

pub fn fallback_strategy(product: &ProductConcept) -> MarketingStrategy {
    let name = product.display_name();

    MarketingStrategy {
        brand_positioning: "Fallback positioning".to_string(),
        key_messages: vec!["Fallback message".to_string()],
        post_text_twitter: format!("{} — coming soon!", name),
        post_text_linkedin: format!("Launching {} — details coming soon.", name),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl Agent for CmoAgent {
    type Request = MarketingRequest;
    type Response = MarketingStrategy;

    fn kind(&self) -> AgentKind {
        AgentKind::Cmo
    }

    fn description(&self) -> &str {
        "Marketing strategy, brand positioning and launch posts"
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

    fn validate(&self, request: &MarketingRequest) -> Result<(), AgentError> {
        require_idea(&request.idea)
    }

    async fn execute(&self, request: MarketingRequest) -> Result<MarketingStrategy> {
        log::info!("CMO creating marketing strategy for: {}", request.product.display_name());

        let prompt = Self::build_strategy_prompt(&request);
        let mut strategy: MarketingStrategy = complete_or_fallback(
            self.model.as_ref(),
            AgentKind::Cmo,
            &prompt,
            STRATEGY_MAX_TOKENS,
            || fallback_strategy(&request.product),
        )
        .await;

        if strategy.post_text_twitter.trim().is_empty() || strategy.post_text_linkedin.trim().is_empty() {
            self.fill_social_drafts(&request.product, &mut strategy).await;
        }

        strategy.post_text_twitter = truncate_chars(strategy.post_text_twitter.trim(), TWITTER_MAX_CHARS);
        strategy.post_text_linkedin = truncate_chars(strategy.post_text_linkedin.trim(), LINKEDIN_MAX_CHARS);

        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusinessIdea, ResearchReport};
    use crate::test_support::MockChatModel;

    fn request() -> MarketingRequest {
        MarketingRequest {
            idea: BusinessIdea::from_user_input("dog walking"),
            product: ProductConcept {
                product_name: "Walkr".into(),
                value_proposition: "Walks on demand".into(),
                ..Default::default()
            },
            research: ResearchReport::fallback(),
        }
    }

    #[tokio::test]
    async fn complete_strategy_needs_one_call() {
        let model = Arc::new(MockChatModel::always(
            r#"{"brand_positioning": "Trusted walkers", "tagline": "Happy dogs", "post_text_twitter": "Meet Walkr", "post_text_linkedin": "Walkr launches today"}"#,
        ));
        let agent = CmoAgent::new(model.clone());

        let strategy = agent.execute(request()).await.unwrap();
        assert_eq!(strategy.brand_positioning, "Trusted walkers");
        assert_eq!(strategy.post_text_twitter, "Meet Walkr");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, 3000);
        assert!(prompts[0].0.contains("Name: Walkr"));
        assert!(prompts[0].0.contains("Market Size: Large and growing market"));
    }

    #[tokio::test]
    async fn structured_budget_is_kept() {
        let model = Arc::new(MockChatModel::always(
            r#"{"brand_positioning": "Trusted walkers", "budget_allocation": {"social": "40%", "search": "60%"}, "key_messages": "Walks you can trust", "post_text_twitter": "Meet Walkr", "post_text_linkedin": "Walkr launches today"}"#,
        ));
        let strategy = CmoAgent::new(model).execute(request()).await.unwrap();
        assert_eq!(strategy.brand_positioning, "Trusted walkers");
        assert_eq!(strategy.budget_allocation, "search: 60%; social: 40%");
        assert_eq!(strategy.key_messages, vec!["Walks you can trust"]);
    }

    #[tokio::test]
    async fn missing_posts_come_from_second_call() {
        let model = Arc::new(
            MockChatModel::new()
                .then_reply(r#"{"tagline": "Happy dogs", "post_text_linkedin": "Kept as is"}"#)
                .then_reply(r#"{"post_text_twitter": "Drafted tweet", "post_text_linkedin": "Replacement"}"#),
        );
        let agent = CmoAgent::new(model.clone());

        let strategy = agent.execute(request()).await.unwrap();
        assert_eq!(strategy.post_text_twitter, "Drafted tweet");
        assert_eq!(strategy.post_text_linkedin, "Kept as is");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[1].1, 800);
        assert!(prompts[1].0.contains("Tagline: Happy dogs"));
    }

    #[tokio::test]
    async fn draft_failure_keeps_strategy() {
        let model = Arc::new(
            MockChatModel::new()
                .then_reply(r#"{"tagline": "Happy dogs"}"#)
                .then_fail("rate limited"),
        );
        let strategy = CmoAgent::new(model).execute(request()).await.unwrap();
        assert_eq!(strategy.tagline, "Happy dogs");
        assert!(strategy.post_text_twitter.is_empty());
    }

    #[tokio::test]
    async fn posts_are_clipped() {
        let long_tweet = "x".repeat(400);
        let long_post = "y".repeat(900);
        let reply = json!({"post_text_twitter": long_tweet, "post_text_linkedin": long_post}).to_string();
        let strategy = CmoAgent::new(Arc::new(MockChatModel::always(reply)))
            .execute(request())
            .await
            .unwrap();
        assert_eq!(strategy.post_text_twitter.chars().count(), 280);
        assert_eq!(strategy.post_text_linkedin.chars().count(), 700);
    }

    #[tokio::test]
    async fn llm_outage_uses_fallback_posts() {
        let strategy = CmoAgent::new(Arc::new(MockChatModel::failing()))
            .execute(request())
            .await
            .unwrap();
        assert_eq!(strategy.brand_positioning, "Fallback positioning");
        assert_eq!(strategy.key_messages, vec!["Fallback message"]);
        assert_eq!(strategy.post_text_twitter, "Walkr — coming soon!");
        assert_eq!(strategy.post_text_linkedin, "Launching Walkr — details coming soon.");
    }
}
