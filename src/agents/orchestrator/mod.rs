use crate::agent::{Agent, AgentKind};
use crate::error::AgentError;
use crate::models::{
    BoltPrompt, BoltPromptRequest, BusinessIdea, BusinessPlan, MarketingRequest,
    MarketingStrategy, ProductConcept, ProductRequest, ResearchReport, ResearchRequest,
    RevenueAnalysis, RevenueRequest, TechnicalRequest, TechnicalStrategy, WorkflowRequest,
    WorkflowResponse, WorkflowSummary,
};
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

mod approval;
mod transport;

pub use approval::{ApprovalConfig, ApprovalOutcome, HttpPlanApproval, PlanApproval};
pub use transport::{step_timeout, AgentEndpoints, AgentTransport, HttpAgentTransport};

/// Runs the fixed business-plan pipeline against the agent services.
pub struct WorkflowOrchestrator {
    transport: Arc<dyn AgentTransport>,
    approval: Option<Arc<dyn PlanApproval>>,
}

impl WorkflowOrchestrator {
    pub fn new(transport: Arc<dyn AgentTransport>, approval: Option<Arc<dyn PlanApproval>>) -> Self {
        Self {
            transport,
            approval,
        }
    }

    pub fn from_env() -> Result<Self> {
        let endpoints = AgentEndpoints::from_env();
        let transport = HttpAgentTransport::new(endpoints)?;

        let approval: Option<Arc<dyn PlanApproval>> = match ApprovalConfig::from_env() {
            Some(config) => Some(Arc::new(HttpPlanApproval::new(config)?)),
            None => None,
        };

        log::info!(
            "Workflow orchestrator initialized (approval {})",
            if approval.is_some() { "enabled" } else { "disabled" }
        );
        Ok(Self::new(Arc::new(transport), approval))
    }

    async fn call_step<Req, Resp>(&self, agent: AgentKind, request: &Req) -> Result<Resp, AgentError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_value(request).map_err(anyhow::Error::from)?;

        let reply = self
            .transport
            .post(agent, body, step_timeout(agent))
            .await
            .map_err(|e| AgentError::Step {
                agent,
                message: e.to_string(),
            })?;

        serde_json::from_value(reply).map_err(|e| AgentError::Step {
            agent,
            message: format!("unexpected reply: {}", e),
        })
    }

    /// Run every step and assemble the plan. Any required step failing aborts the run.
    pub async fn run(&self, request: &WorkflowRequest) -> Result<BusinessPlan, AgentError> {
        let user_input = request.user_input.trim();
        let idea = BusinessIdea::from_user_input(user_input);
        log::info!("Step 1: using user business concept: {}", idea.title);

        log::info!("Step 2: research analyzing market");
        let research: ResearchReport = self
            .call_step(
                AgentKind::Research,
                &ResearchRequest { idea: idea.clone() },
            )
            .await?;

        log::info!("Step 3: product developing concept");
        let product: ProductConcept = self
            .call_step(
                AgentKind::Product,
                &ProductRequest {
                    idea: idea.clone(),
                    research: research.clone(),
                },
            )
            .await?;

        log::info!("Step 4: CMO creating marketing strategy");
        let marketing: MarketingStrategy = self
            .call_step(
                AgentKind::Cmo,
                &MarketingRequest {
                    idea: idea.clone(),
                    product: product.clone(),
                    research: research.clone(),
                },
            )
            .await?;

        log::info!("Step 5: CTO creating technical strategy");
        let technical: TechnicalStrategy = self
            .call_step(
                AgentKind::Cto,
                &TechnicalRequest {
                    idea: idea.clone(),
                    product: product.clone(),
                    research: research.clone(),
                },
            )
            .await?;

        log::info!("Step 6: head of engineering creating website prompt");
        let bolt_prompt: BoltPrompt = self
            .call_step(
                AgentKind::HeadEngineering,
                &BoltPromptRequest {
                    idea: idea.clone(),
                    product: product.clone(),
                    research: research.clone(),
                    marketing_strategy: marketing.clone(),
                    technical_strategy: technical.clone(),
                },
            )
            .await?;

        log::info!("Step 7: finance analyzing revenue");
        let finance: RevenueAnalysis = match self
            .call_step(
                AgentKind::Finance,
                &RevenueRequest {
                    idea: idea.clone(),
                    product: product.clone(),
                },
            )
            .await
        {
            Ok(finance) => finance,
            Err(e) => {
                log::warn!("{}; continuing without financial analysis", e);
                RevenueAnalysis::unavailable()
            }
        };

        let mut plan = BusinessPlan {
            workflow_summary: WorkflowSummary {
                run_id: Uuid::new_v4(),
                user_input: user_input.to_string(),
                selected_idea: idea.title_or("Unknown").to_string(),
                workflow_status: "completed".to_string(),
                timestamp: chrono::Utc::now(),
            },
            idea: idea.clone(),
            research,
            product,
            marketing,
            technical,
            bolt_prompt,
            finance,
            all_ideas: vec![idea],
            pdr_id: None,
            marketing_posts: None,
            pdr_warning: None,
        };

        if let Some(approval) = &self.approval {
            log::info!("Step 8: creating and approving PDR");
            match approval.submit(&plan.idea, &plan.product).await {
                Ok(outcome) => {
                    log::info!("PDR approved: {}", outcome.pdr_id);
                    plan.pdr_id = Some(outcome.pdr_id);
                    plan.marketing_posts = Some(outcome.marketing_posts);
                }
                Err(e) => {
                    log::warn!("PDR creation/approval failed (workflow still succeeded): {}", e);
                    plan.pdr_warning = Some(e.to_string());
                }
            }
        }

        log::info!("Workflow {} complete", plan.workflow_summary.run_id);
        Ok(plan)
    }
}

#[async_trait::async_trait]
impl Agent for WorkflowOrchestrator {
    type Request = WorkflowRequest;
    type Response = WorkflowResponse;

    fn kind(&self) -> AgentKind {
        AgentKind::Orchestrator
    }

    fn description(&self) -> &str {
        "Coordinates the complete business workflow across all agents"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "user_input": {
                    "type": "string",
                    "description": "Description of the business to plan"
                },
                "idea_count": {
                    "type": "integer",
                    "description": "Number of ideas requested",
                    "default": 3
                }
            },
            "required": ["user_input"]
        })
    }

    fn validate(&self, request: &WorkflowRequest) -> Result<(), AgentError> {
        if request.user_input.trim().is_empty() {
            return Err(AgentError::InvalidRequest(
                "user_input must not be empty".to_string(),
            ));
        }
        if request.idea_count == 0 {
            return Err(AgentError::InvalidRequest(
                "idea_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    async fn execute(&self, request: WorkflowRequest) -> Result<WorkflowResponse> {
        match self.run(&request).await {
            Ok(plan) => Ok(WorkflowResponse::completed(plan)),
            Err(e) => {
                log::error!("Workflow failed: {}", e);
                Ok(WorkflowResponse::failed(e.to_string()))
            }
        }
    }
}
