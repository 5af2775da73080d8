use crate::models::{BusinessIdea, ProductConcept};
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const CREATE_TIMEOUT: Duration = Duration::from_secs(30);
const APPROVE_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone)]
pub struct ApprovalConfig {
    pub api_url: String,
}

impl ApprovalConfig {
    /// `None` unless `APPROVAL_API_URL` is set.
    pub fn from_env() -> Option<Self> {
        env::var("APPROVAL_API_URL")
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .map(|api_url| Self { api_url })
    }
}

/// What the approval API returned for a finished plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalOutcome {
    pub pdr_id: Value,
    pub marketing_posts: Value,
}

/// Files a product decision record and approves it.
#[async_trait::async_trait]
pub trait PlanApproval: Send + Sync {
    async fn submit(&self, idea: &BusinessIdea, product: &ProductConcept) -> Result<ApprovalOutcome>;
}

pub struct HttpPlanApproval {
    config: ApprovalConfig,
    client: Client,
}

#[derive(Deserialize)]
struct CreatedPdr {
    #[serde(rename = "pdrId", default)]
    pdr_id: Value,
}

#[derive(Deserialize)]
struct ApprovedPdr {
    #[serde(rename = "postResp", default)]
    post_resp: Value,
}

impl HttpPlanApproval {
    pub fn new(config: ApprovalConfig) -> Result<Self> {
        Ok(Self {
            config,
            client: Client::builder().build()?,
        })
    }
}

#[async_trait::async_trait]
impl PlanApproval for HttpPlanApproval {
    async fn submit(&self, idea: &BusinessIdea, product: &ProductConcept) -> Result<ApprovalOutcome> {
        log::info!("Creating PDR for product: {}", product.display_name());

        let create_response = self
            .client
            .post(format!("{}/api/agents/pdrs", self.config.api_url))
            .timeout(CREATE_TIMEOUT)
            .json(&json!({"idea": idea, "product": product}))
            .send()
            .await?
            .error_for_status()?;
        let created: CreatedPdr = create_response.json().await?;

        let pdr_id = match created.pdr_id {
            Value::String(ref id) if !id.is_empty() => id.clone(),
            Value::Number(ref id) => id.to_string(),
            _ => return Err(anyhow!("Approval API did not return a pdrId")),
        };

        log::info!("PDR {} created, approving", pdr_id);

        let approve_response = self
            .client
            .post(format!("{}/api/agents/pdrs/{}/approve", self.config.api_url, pdr_id))
            .timeout(APPROVE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let approved: ApprovedPdr = approve_response.json().await?;

        Ok(ApprovalOutcome {
            pdr_id: created.pdr_id,
            marketing_posts: if approved.post_resp.is_null() {
                json!({})
            } else {
                approved.post_resp
            },
        })
    }
}
