use crate::error::AgentError;
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The fixed roster of agent services that make up the business-plan pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Ceo,
    Research,
    Product,
    Cmo,
    Cto,
    HeadEngineering,
    Finance,
    Orchestrator,
}

impl AgentKind {
    pub const ALL: [AgentKind; 8] = [
        AgentKind::Ceo,
        AgentKind::Research,
        AgentKind::Product,
        AgentKind::Cmo,
        AgentKind::Cto,
        AgentKind::HeadEngineering,
        AgentKind::Finance,
        AgentKind::Orchestrator,
    ];

    /// Human readable name used in logs and `/info`.
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Ceo => "CEO Agent",
            AgentKind::Research => "Research Agent",
            AgentKind::Product => "Product Agent",
            AgentKind::Cmo => "CMO Agent",
            AgentKind::Cto => "CTO Agent",
            AgentKind::HeadEngineering => "Head of Engineering Agent",
            AgentKind::Finance => "Finance Agent",
            AgentKind::Orchestrator => "Workflow Orchestrator",
        }
    }

    /// Stable identifier used for env var prefixes and transcript directories.
    pub fn slug(&self) -> &'static str {
        match self {
            AgentKind::Ceo => "ceo",
            AgentKind::Research => "research",
            AgentKind::Product => "product",
            AgentKind::Cmo => "cmo",
            AgentKind::Cto => "cto",
            AgentKind::HeadEngineering => "head_engineering",
            AgentKind::Finance => "finance",
            AgentKind::Orchestrator => "orchestrator",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            AgentKind::Ceo => 8001,
            AgentKind::Research => 8002,
            AgentKind::Product => 8003,
            AgentKind::Cmo => 8004,
            AgentKind::Cto => 8005,
            AgentKind::HeadEngineering => 8006,
            AgentKind::Finance => 8007,
            AgentKind::Orchestrator => 8008,
        }
    }

    /// The POST route the agent's service answers on.
    pub fn route(&self) -> &'static str {
        match self {
            AgentKind::Ceo => "/generate-ideas",
            AgentKind::Research => "/research-idea",
            AgentKind::Product => "/develop-product",
            AgentKind::Cmo => "/develop-marketing",
            AgentKind::Cto => "/develop-technical",
            AgentKind::HeadEngineering => "/create-bolt-prompt",
            AgentKind::Finance => "/analyze-revenue",
            AgentKind::Orchestrator => "/process-business-idea",
        }
    }

    /// Whether the agent needs an LLM key to run.
    pub fn uses_llm(&self) -> bool {
        !matches!(self, AgentKind::Orchestrator)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Core trait that all agents implement.
///
/// An agent receives one typed request, does its work (usually a single LLM
/// round trip) and answers with one typed reply. The HTTP layer in
/// [`crate::server`] is generic over this trait.
#[async_trait::async_trait]
pub trait Agent: Send + Sync {
    type Request: DeserializeOwned + Serialize + Send + Sync + 'static;
    type Response: Serialize + Send + 'static;

    fn kind(&self) -> AgentKind;

    /// Get the name of the agent
    fn name(&self) -> &str {
        self.kind().display_name()
    }

    /// Get the description of what this agent handles
    fn description(&self) -> &str;

    /// Get the input schema for this agent (like tools have parameters)
    fn input_schema(&self) -> Value;

    /// Reject requests that cannot be worked on before any external call is made.
    fn validate(&self, _request: &Self::Request) -> Result<(), AgentError> {
        Ok(())
    }

    /// Entry point for agent execution with logging
    async fn call(&self, request: Self::Request) -> Result<Self::Response> {
        log::info!(
            "Agent call start: {} - request: {}",
            self.name(),
            serde_json::to_string(&request).unwrap_or_default()
        );

        let result = self.execute(request).await;

        match &result {
            Ok(response) => log::info!(
                "Agent call success: {} - response: {}",
                self.name(),
                serde_json::to_string(response).unwrap_or_default()
            ),
            Err(e) => log::error!("Agent call error: {} - error: {}", self.name(), e),
        }

        result
    }

    /// Actual implementation of the agent execution
    async fn execute(&self, request: Self::Request) -> Result<Self::Response>;
}

/// Describe an agent for discovery endpoints.
pub fn agent_info<A: Agent + ?Sized>(agent: &A, port: u16) -> Value {
    let kind = agent.kind();
    serde_json::json!({
        "name": agent.name(),
        "role": agent.description(),
        "port": port,
        "route": kind.route(),
        "status": "active",
        "input_schema": agent.input_schema()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ports_and_routes_are_unique() {
        let ports: HashSet<u16> = AgentKind::ALL.iter().map(|k| k.default_port()).collect();
        let routes: HashSet<&str> = AgentKind::ALL.iter().map(|k| k.route()).collect();
        assert_eq!(ports.len(), AgentKind::ALL.len());
        assert_eq!(routes.len(), AgentKind::ALL.len());
    }

    #[test]
    fn only_orchestrator_skips_llm() {
        let without_llm: Vec<_> = AgentKind::ALL.iter().filter(|k| !k.uses_llm()).collect();
        assert_eq!(without_llm, vec![&AgentKind::Orchestrator]);
    }

    #[test]
    fn slug_round_trips_through_serde() {
        let json = serde_json::to_string(&AgentKind::HeadEngineering).unwrap();
        assert_eq!(json, "\"head_engineering\"");
        assert_eq!(AgentKind::HeadEngineering.slug(), "head_engineering");
    }
}
