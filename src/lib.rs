use anyhow::Result;
use reqwest::Client;
use std::env;

pub mod agent;
pub mod agents;
pub mod error;
pub mod llm;
pub mod models;
pub mod parser;
pub mod server;
pub mod tool;
pub mod utils;

pub mod test_support;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub timeout_seconds: u64,
    pub client: Client,
}

impl LlmConfig {
    pub fn new() -> Result<Self> {
        let api_key = env::var("ASI_ONE_API_KEY")
            .map_err(|_| anyhow::anyhow!("ASI_ONE_API_KEY environment variable not set"))?;
        let api_url = env::var("ASI_ONE_API_URL")
            .unwrap_or_else(|_| "https://api.asi1.ai/v1/chat/completions".to_string());
        let model = env::var("ASI_ONE_MODEL").unwrap_or_else(|_| "asi1-mini".to_string());
        let temperature = env::var("ASI_ONE_TEMPERATURE")
            .ok()
            .and_then(|value| value.parse().ok());
        let timeout_seconds = env::var("ASI_ONE_TIMEOUT")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .unwrap_or(120);

        Self::with_api_key(api_key, api_url, model, temperature, timeout_seconds)
    }

    pub fn with_api_key(
        api_key: String,
        api_url: String,
        model: String,
        temperature: Option<f32>,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            api_key,
            api_url,
            model,
            temperature,
            timeout_seconds,
            client,
        })
    }
}

pub use agent::{Agent, AgentKind};
pub use agents::orchestrator::WorkflowOrchestrator;
pub use error::AgentError;
pub use models::{BusinessPlan, WorkflowRequest, WorkflowResponse};

/// Run the whole business-plan workflow against the configured agent services.
pub async fn process_business_idea(user_input: &str) -> Result<WorkflowResponse> {
    if let Err(e) = utils::clear_message_directory() {
        log::warn!("Failed to clear message directory: {}", e);
    }

    let orchestrator = WorkflowOrchestrator::from_env()?;
    let request = WorkflowRequest {
        user_input: user_input.to_string(),
        idea_count: models::default_idea_count(),
    };

    orchestrator.validate(&request)?;
    let response = orchestrator.call(request).await?;

    if response.success {
        log::info!("Workflow completed successfully");
    } else {
        log::error!(
            "Workflow failed: {}",
            response.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(response)
}
