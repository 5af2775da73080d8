use crate::agent::AgentKind;
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Base URLs of the agent services the orchestrator talks to.
#[derive(Debug, Clone)]
pub struct AgentEndpoints {
    urls: HashMap<AgentKind, String>,
}

impl AgentEndpoints {
    /// Every agent on `host` at its default port.
    pub fn local(host: &str) -> Self {
        let host = host.trim_end_matches('/');
        let urls = AgentKind::ALL
            .iter()
            .map(|kind| (*kind, format!("{}:{}", host, kind.default_port())))
            .collect();
        Self { urls }
    }

    /// `AGENT_HOST` (default `http://localhost`), overridden per agent by `<AGENT>_AGENT_URL`.
    pub fn from_env() -> Self {
        let host = env::var("AGENT_HOST").unwrap_or_else(|_| "http://localhost".to_string());
        let mut endpoints = Self::local(&host);

        for kind in AgentKind::ALL {
            let key = format!("{}_AGENT_URL", kind.slug().to_uppercase());
            if let Ok(url) = env::var(&key) {
                endpoints.set(kind, url);
            }
        }

        endpoints
    }

    pub fn set(&mut self, kind: AgentKind, base_url: impl Into<String>) {
        let base_url: String = base_url.into();
        self.urls
            .insert(kind, base_url.trim_end_matches('/').to_string());
    }

    pub fn with(mut self, kind: AgentKind, base_url: impl Into<String>) -> Self {
        self.set(kind, base_url);
        self
    }

    pub fn base_url(&self, kind: AgentKind) -> Option<&str> {
        self.urls.get(&kind).map(String::as_str)
    }

    /// Full URL of the agent's POST route.
    pub fn endpoint(&self, kind: AgentKind) -> Option<String> {
        self.base_url(kind)
            .map(|base| format!("{}{}", base, kind.route()))
    }
}

/// How long the orchestrator waits for each agent.
pub fn step_timeout(kind: AgentKind) -> Duration {
    let seconds = match kind {
        AgentKind::Research | AgentKind::Cto | AgentKind::HeadEngineering => 120,
        AgentKind::Ceo | AgentKind::Product | AgentKind::Cmo | AgentKind::Finance => 90,
        AgentKind::Orchestrator => 900,
    };
    Duration::from_secs(seconds)
}

/// Sends one JSON request to an agent and returns its JSON reply.
#[async_trait::async_trait]
pub trait AgentTransport: Send + Sync {
    async fn post(&self, agent: AgentKind, body: Value, timeout: Duration) -> Result<Value>;
}

pub struct HttpAgentTransport {
    endpoints: AgentEndpoints,
    client: Client,
}

impl HttpAgentTransport {
    pub fn new(endpoints: AgentEndpoints) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { endpoints, client })
    }
}

#[async_trait::async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn post(&self, agent: AgentKind, body: Value, timeout: Duration) -> Result<Value> {
        let url = self
            .endpoints
            .endpoint(agent)
            .ok_or_else(|| anyhow!("No endpoint configured for {}", agent))?;

        log::debug!("POST {} (timeout {}s)", url, timeout.as_secs());

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("HTTP {} from {}: {}", status.as_u16(), url, text));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_endpoints_use_default_ports() {
        let endpoints = AgentEndpoints::local("http://localhost/");
        assert_eq!(
            endpoints.endpoint(AgentKind::Research).as_deref(),
            Some("http://localhost:8002/research-idea")
        );
        assert_eq!(
            endpoints.endpoint(AgentKind::HeadEngineering).as_deref(),
            Some("http://localhost:8006/create-bolt-prompt")
        );
    }

    #[test]
    fn override_replaces_one_agent() {
        let endpoints = AgentEndpoints::local("http://agents.internal")
            .with(AgentKind::Finance, "http://finance:9000/");
        assert_eq!(
            endpoints.endpoint(AgentKind::Finance).as_deref(),
            Some("http://finance:9000/analyze-revenue")
        );
        assert_eq!(
            endpoints.base_url(AgentKind::Cmo),
            Some("http://agents.internal:8004")
        );
    }

    #[test]
    fn timeouts_per_step() {
        assert_eq!(step_timeout(AgentKind::Research), Duration::from_secs(120));
        assert_eq!(step_timeout(AgentKind::Product), Duration::from_secs(90));
        assert_eq!(step_timeout(AgentKind::Finance), Duration::from_secs(90));
        assert_eq!(step_timeout(AgentKind::HeadEngineering), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn unreachable_agent_is_an_error() {
        let endpoints = AgentEndpoints::local("http://127.0.0.1").with(AgentKind::Cto, "http://127.0.0.1:1");
        let transport = HttpAgentTransport::new(endpoints).unwrap();
        let result = transport
            .post(AgentKind::Cto, serde_json::json!({}), Duration::from_secs(2))
            .await;
        assert!(result.is_err());
    }
}
