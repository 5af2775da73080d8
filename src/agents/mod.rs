// Agent implementation modules
pub mod ceo;
pub mod cmo;
pub mod cto;
pub mod finance;
pub mod head_engineering;
pub mod orchestrator;
pub mod product;
pub mod research;

// Re-export main agents
pub use ceo::CeoAgent;
pub use cmo::CmoAgent;
pub use cto::CtoAgent;
pub use finance::FinanceAgent;
pub use head_engineering::HeadEngineeringAgent;
pub use orchestrator::WorkflowOrchestrator;
pub use product::ProductAgent;
pub use research::ResearchAgent;

use crate::agent::{agent_info, AgentKind};
use crate::error::AgentError;
use crate::llm::ChatModel;
use crate::models::BusinessIdea;
use crate::parser::parse_or_fallback;
use crate::server;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Ask the model for JSON and parse it into `T`.
///
/// A failed LLM call and an unparseable reply both end in `fallback()`, so an
/// agent always has something to answer with.
pub async fn complete_or_fallback<T, F>(
    model: &dyn ChatModel,
    agent: AgentKind,
    prompt: &str,
    max_tokens: u32,
    fallback: F,
) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match model.complete(prompt, max_tokens).await {
        Ok(text) => parse_or_fallback(agent.display_name(), &text, fallback).0,
        Err(e) => {
            log::error!("[{}] LLM call failed, using fallback data: {}", agent, e);
            fallback()
        }
    }
}

/// Pretty JSON for embedding in prompts.
pub(crate) fn to_prompt_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// `text` or a placeholder when it is blank.
pub(crate) fn or_unspecified(text: &str) -> &str {
    if text.trim().is_empty() {
        "Not specified"
    } else {
        text
    }
}

/// Reject an idea with neither a title nor a description.
pub(crate) fn require_idea(idea: &BusinessIdea) -> Result<(), AgentError> {
    if idea.title.trim().is_empty() && idea.description.trim().is_empty() {
        return Err(AgentError::InvalidRequest(
            "idea must have a title or a description".to_string(),
        ));
    }
    Ok(())
}

/// Build an agent of the given kind from the environment and serve it until Ctrl-C.
pub async fn serve_agent(kind: AgentKind, ip: IpAddr, port: u16) -> Result<()> {
    let addr = SocketAddr::new(ip, port);
    match kind {
        AgentKind::Ceo => server::serve(Arc::new(CeoAgent::from_env()?), addr).await,
        AgentKind::Research => server::serve(Arc::new(ResearchAgent::from_env()?), addr).await,
        AgentKind::Product => server::serve(Arc::new(ProductAgent::from_env()?), addr).await,
        AgentKind::Cmo => server::serve(Arc::new(CmoAgent::from_env()?), addr).await,
        AgentKind::Cto => server::serve(Arc::new(CtoAgent::from_env()?), addr).await,
        AgentKind::HeadEngineering => {
            server::serve(Arc::new(HeadEngineeringAgent::from_env()?), addr).await
        }
        AgentKind::Finance => server::serve(Arc::new(FinanceAgent::from_env()?), addr).await,
        AgentKind::Orchestrator => {
            server::serve(Arc::new(WorkflowOrchestrator::from_env()?), addr).await
        }
    }
}

/// Serve every agent on its default port from one process.
pub async fn serve_all(ip: IpAddr) -> Result<()> {
    let services = AgentKind::ALL
        .iter()
        .map(|kind| serve_agent(*kind, ip, kind.default_port()));
    futures::future::try_join_all(services).await?;
    Ok(())
}

/// Discovery records for every agent, as served on `/info`.
///
/// LLM-backed agents are described without contacting the LLM, so no API key is needed.
pub fn describe_agents() -> Result<Vec<Value>> {
    let model: Arc<dyn ChatModel> = Arc::new(NoModel);
    let describe = |kind: AgentKind| -> Result<Value> {
        let port = kind.default_port();
        Ok(match kind {
            AgentKind::Ceo => agent_info(&CeoAgent::new(model.clone()), port),
            AgentKind::Research => agent_info(&ResearchAgent::new(model.clone(), None), port),
            AgentKind::Product => agent_info(&ProductAgent::new(model.clone()), port),
            AgentKind::Cmo => agent_info(&CmoAgent::new(model.clone()), port),
            AgentKind::Cto => agent_info(&CtoAgent::new(model.clone()), port),
            AgentKind::HeadEngineering => {
                agent_info(&HeadEngineeringAgent::new(model.clone()), port)
            }
            AgentKind::Finance => agent_info(&FinanceAgent::new(model.clone()), port),
            AgentKind::Orchestrator => agent_info(&WorkflowOrchestrator::from_env()?, port),
        })
    };

    AgentKind::ALL.iter().map(|kind| describe(*kind)).collect()
}

struct NoModel;

#[async_trait::async_trait]
impl ChatModel for NoModel {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        anyhow::bail!("no LLM configured")
    }
}
