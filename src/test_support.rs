//! Scripted stand-ins for the external seams (LLM, agent HTTP calls, approval
//! API and research tools), shared by unit and integration tests.

use crate::agent::AgentKind;
use crate::agents::orchestrator::{AgentTransport, ApprovalOutcome, PlanApproval};
use crate::llm::ChatModel;
use crate::models::{BusinessIdea, ProductConcept};
use crate::tool::Tool;
use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// A chat model that answers from a queue of scripted replies.
///
/// Once the queue is empty every further call gets `default_reply`, or an
/// error when no default is set.
pub struct MockChatModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    default_reply: Option<String>,
    prompts: Mutex<Vec<(String, u32)>>,
}

impl MockChatModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `reply`.
    pub fn always(reply: impl Into<String>) -> Self {
        let mut model = Self::new();
        model.default_reply = Some(reply.into());
        model
    }

    /// Every call fails as if the LLM API were unreachable.
    pub fn failing() -> Self {
        Self::new()
    }

    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.lock_replies().push_back(Ok(reply.into()));
        self
    }

    pub fn then_fail(self, error: impl Into<String>) -> Self {
        self.lock_replies().push_back(Err(error.into()));
        self
    }

    /// Prompts received so far, with the token budget of each call.
    pub fn prompts(&self) -> Vec<(String, u32)> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        match self.replies.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ChatModel for MockChatModel {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((prompt.to_string(), max_tokens));
        }

        let scripted = self.lock_replies().pop_front();
        match scripted {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(error)) => Err(anyhow!(error)),
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| anyhow!("mock LLM unavailable")),
        }
    }
}

/// Agent transport that answers each agent from a fixed table.
pub struct MockTransport {
    replies: HashMap<AgentKind, Result<Value, String>>,
    calls: Mutex<Vec<(AgentKind, Value, Duration)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, agent: AgentKind, body: Value) -> Self {
        self.replies.insert(agent, Ok(body));
        self
    }

    pub fn fail(mut self, agent: AgentKind, error: impl Into<String>) -> Self {
        self.replies.insert(agent, Err(error.into()));
        self
    }

    /// Agents called so far, in order.
    pub fn calls(&self) -> Vec<AgentKind> {
        self.calls
            .lock()
            .map(|calls| calls.iter().map(|(agent, _, _)| *agent).collect())
            .unwrap_or_default()
    }

    /// Request body of the most recent call to `agent`.
    pub fn body_for(&self, agent: AgentKind) -> Option<Value> {
        self.calls.lock().ok().and_then(|calls| {
            calls
                .iter()
                .rev()
                .find(|(called, _, _)| *called == agent)
                .map(|(_, body, _)| body.clone())
        })
    }

    pub fn timeout_for(&self, agent: AgentKind) -> Option<Duration> {
        self.calls.lock().ok().and_then(|calls| {
            calls
                .iter()
                .find(|(called, _, _)| *called == agent)
                .map(|(_, _, timeout)| *timeout)
        })
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AgentTransport for MockTransport {
    async fn post(&self, agent: AgentKind, body: Value, timeout: Duration) -> Result<Value> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((agent, body, timeout));
        }

        match self.replies.get(&agent) {
            Some(Ok(reply)) => Ok(reply.clone()),
            Some(Err(error)) => Err(anyhow!(error.clone())),
            None => Err(anyhow!("no scripted reply for {}", agent)),
        }
    }
}

/// Approval API stand-in.
pub struct MockApproval {
    outcome: Result<ApprovalOutcome, String>,
    submitted: Mutex<Vec<String>>,
}

impl MockApproval {
    pub fn succeeding(pdr_id: Value, marketing_posts: Value) -> Self {
        Self {
            outcome: Ok(ApprovalOutcome {
                pdr_id,
                marketing_posts,
            }),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            outcome: Err(error.into()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Product names submitted for approval.
    pub fn submitted_products(&self) -> Vec<String> {
        self.submitted
            .lock()
            .map(|submitted| submitted.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PlanApproval for MockApproval {
    async fn submit(&self, _idea: &BusinessIdea, product: &ProductConcept) -> Result<ApprovalOutcome> {
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(product.product_name.clone());
        }
        self.outcome.clone().map_err(|error| anyhow!(error))
    }
}

/// A tool that answers each `action` from a table and records its arguments.
pub struct MockTool {
    name: String,
    replies: HashMap<String, Result<Value, String>>,
    calls: Mutex<Vec<Value>>,
}

impl MockTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, action: &str, body: Value) -> Self {
        self.replies.insert(action.to_string(), Ok(body));
        self
    }

    pub fn fail(mut self, action: &str, error: impl Into<String>) -> Self {
        self.replies.insert(action.to_string(), Err(error.into()));
        self
    }

    /// Actions invoked so far, in order.
    pub fn actions(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| {
                calls
                    .iter()
                    .map(|args| args["action"].as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn arguments(&self) -> Vec<Value> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Scripted tool for tests"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {"action": {"type": "string"}}, "required": ["action"]})
    }

    async fn execute(&self, arguments: &str) -> Result<String> {
        let args: Value = serde_json::from_str(arguments)?;
        let action = args["action"].as_str().unwrap_or_default().to_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(args);
        }

        match self.replies.get(&action) {
            Some(Ok(reply)) => Ok(reply.to_string()),
            Some(Err(error)) => Err(anyhow!(error.clone())),
            None => Err(anyhow!("{} has no scripted reply for action '{}'", self.name, action)),
        }
    }
}
