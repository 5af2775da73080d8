use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::agent::AgentKind;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("LLM API error ({status}): {body}")]
    Llm { status: u16, body: String },

    #[error("LLM returned an empty completion")]
    EmptyCompletion,

    #[error("{agent} call failed: {message}")]
    Step { agent: AgentKind, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AgentError {
    /// Recover a typed error from an `anyhow` chain, treating anything else as internal.
    pub fn from_anyhow(error: anyhow::Error) -> Self {
        match error.downcast::<AgentError>() {
            Ok(agent_error) => agent_error,
            Err(other) => AgentError::Internal(other),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AgentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AgentError::Llm { .. } | AgentError::EmptyCompletion | AgentError::Step { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AgentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            AgentError::InvalidRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AgentError::Step {
                agent: AgentKind::Research,
                message: "timeout".into()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AgentError::from(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn typed_errors_survive_anyhow() {
        let wrapped: anyhow::Error = AgentError::InvalidRequest("empty".into()).into();
        assert!(matches!(
            AgentError::from_anyhow(wrapped),
            AgentError::InvalidRequest(_)
        ));
        assert!(matches!(
            AgentError::from_anyhow(anyhow::anyhow!("disk full")),
            AgentError::Internal(_)
        ));
    }

    #[test]
    fn step_error_names_the_agent() {
        let err = AgentError::Step {
            agent: AgentKind::Cto,
            message: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "CTO Agent call failed: connection refused");
    }
}
