use crate::agent::AgentKind;
use crate::error::AgentError;
use crate::utils;
use crate::LlmConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;

/// Anything that can turn a prompt into completion text.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if the model produced any.
    pub fn into_text(self) -> Result<String, AgentError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(AgentError::EmptyCompletion)
    }
}

/// OpenAI-compatible chat completions client (ASI:One by default).
pub struct ChatCompletionsClient {
    config: LlmConfig,
    agent: AgentKind,
    transcripts: Option<PathBuf>,
}

impl ChatCompletionsClient {
    /// Exchanges are recorded under `MESSAGE_LOG_DIR` when it is set.
    pub fn new(config: LlmConfig, agent: AgentKind) -> Self {
        Self {
            config,
            agent,
            transcripts: utils::message_directory(),
        }
    }

    pub fn with_transcripts(mut self, root: Option<PathBuf>) -> Self {
        self.transcripts = root;
        self
    }

    pub fn from_env(agent: AgentKind) -> Result<Self> {
        Ok(Self::new(LlmConfig::new()?, agent))
    }
}

#[async_trait::async_trait]
impl ChatModel for ChatCompletionsClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request_payload = ChatRequest {
            model: &self.config.model,
            max_tokens,
            temperature: self.config.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        log::debug!(
            "{} calling LLM API ({} prompt chars, max_tokens {})",
            self.agent,
            prompt.len(),
            max_tokens
        );

        let response = self
            .config
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .header("content-type", "application/json")
            .json(&request_payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Llm {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let raw: serde_json::Value = response.json().await?;

        if let Some(root) = &self.transcripts {
            let exchange = json!({
                "prompt": prompt,
                "max_tokens": max_tokens,
                "response": raw,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            });
            if let Err(e) = utils::store_message_in(root, self.agent.slug(), &exchange) {
                log::warn!("{} failed to record LLM exchange: {}", self.agent, e);
            }
        }

        let parsed: ChatResponse = serde_json::from_value(raw)?;
        let text = parsed.into_text()?;
        log::info!("{} LLM response received ({} chars)", self.agent, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1/chat/completions", addr)
    }

    fn client(api_url: String) -> ChatCompletionsClient {
        let config = LlmConfig::with_api_key(
            "test-key".to_string(),
            api_url,
            "asi1-mini".to_string(),
            Some(0.2),
            5,
        )
        .unwrap();
        ChatCompletionsClient::new(config, AgentKind::Cto).with_transcripts(None)
    }

    /// Completion endpoint that records each request's auth header and body.
    async fn completion_stub(seen: Arc<Mutex<Vec<(String, Value)>>>) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    seen.lock().unwrap().push((auth, body));
                    Json(json!({"choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}]}))
                }
            }),
        );
        spawn_stub(app).await
    }

    #[tokio::test]
    async fn posts_prompt_with_bearer_auth() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let model = client(completion_stub(seen.clone()).await);

        let text = model.complete("Plan the stack", 2500).await.unwrap();
        assert_eq!(text, "{\"ok\": true}");

        let seen = seen.lock().unwrap();
        let (auth, body) = &seen[0];
        assert_eq!(auth, "Bearer test-key");
        assert_eq!(body["model"], "asi1-mini");
        assert_eq!(body["max_tokens"], 2500);
        assert_eq!(body["messages"][0]["content"], "Plan the stack");
        assert!(body["temperature"].is_number());
    }

    #[tokio::test]
    async fn error_status_keeps_status_and_body() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
        );
        let model = client(spawn_stub(app).await);

        let error = model.complete("hi", 10).await.unwrap_err();
        match error.downcast_ref::<AgentError>() {
            Some(AgentError::Llm { status, body }) => {
                assert_eq!(*status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn exchanges_are_recorded_when_enabled() {
        let root = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let model = client(completion_stub(seen).await)
            .with_transcripts(Some(root.path().to_path_buf()));

        model.complete("hi", 10).await.unwrap();
        let recorded = std::fs::read_dir(root.path().join("messages").join("cto"))
            .unwrap()
            .count();
        assert_eq!(recorded, 1);
    }

    #[tokio::test]
    async fn unwritable_transcript_dir_does_not_fail_completion() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let model = client(completion_stub(seen).await)
            .with_transcripts(Some(blocker.path().to_path_buf()));

        assert_eq!(model.complete("hi", 10).await.unwrap(), "{\"ok\": true}");
    }

    #[test]
    fn completion_text_comes_from_first_choice() {
        let raw = json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"ok\": true}"}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ]
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.into_text().unwrap(), "{\"ok\": true}");
    }

    #[test]
    fn empty_completion_is_an_error() {
        let parsed: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(parsed.into_text(), Err(AgentError::EmptyCompletion)));

        let blank: ChatResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": "  "}}]})).unwrap();
        assert!(blank.into_text().is_err());
    }

    #[test]
    fn request_omits_unset_temperature() {
        let request = ChatRequest {
            model: "asi1-mini",
            max_tokens: 1000,
            temperature: None,
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("temperature").is_none());
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 1000);
    }
}
