//! HTTP front end shared by every agent service.

use crate::agent::{agent_info, Agent};
use crate::error::AgentError;
use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Clone, Copy)]
struct ServicePort(u16);

/// Routes for one agent: its POST endpoint plus `/health` and `/info`.
pub fn routes<A: Agent + 'static>(agent: Arc<A>, port: u16) -> Router {
    let route = agent.kind().route();

    Router::new()
        .route(route, post(handle_request::<A>))
        .route("/health", get(handle_health::<A>))
        .route("/info", get(handle_info::<A>))
        .layer(Extension(agent))
        .layer(Extension(ServicePort(port)))
}

async fn handle_request<A: Agent + 'static>(
    Extension(agent): Extension<Arc<A>>,
    payload: Result<Json<A::Request>, JsonRejection>,
) -> Result<Json<A::Response>, AgentError> {
    let Json(request) =
        payload.map_err(|rejection| AgentError::InvalidRequest(rejection.body_text()))?;

    agent.validate(&request)?;
    let response = agent.call(request).await.map_err(AgentError::from_anyhow)?;
    Ok(Json(response))
}

async fn handle_health<A: Agent + 'static>(Extension(agent): Extension<Arc<A>>) -> Json<Value> {
    Json(json!({"status": "ok", "agent": agent.name()}))
}

async fn handle_info<A: Agent + 'static>(
    Extension(agent): Extension<Arc<A>>,
    Extension(ServicePort(port)): Extension<ServicePort>,
) -> Json<Value> {
    Json(agent_info(agent.as_ref(), port))
}

/// Serve an agent until Ctrl-C.
pub async fn serve<A: Agent + 'static>(agent: Arc<A>, addr: SocketAddr) -> Result<()> {
    let kind = agent.kind();
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    log::info!("{} listening on http://{}{}", kind, local_addr, kind.route());

    axum::serve(listener, routes(agent, local_addr.port()))
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for interrupt signal: {}", e);
                return;
            }
            log::info!("{} received interrupt signal", kind);
        })
        .await?;

    Ok(())
}

/// Bind an agent and serve it in the background, returning the bound address.
pub async fn spawn<A: Agent + 'static>(
    agent: Arc<A>,
    addr: SocketAddr,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let kind = agent.kind();
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let app = routes(agent, local_addr.port());

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("{} server stopped: {}", kind, e);
        }
    });

    log::debug!("{} spawned on {}", kind, local_addr);
    Ok((local_addr, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde::{Deserialize, Serialize};
    use tower::ServiceExt;

    #[derive(Debug, Serialize, Deserialize)]
    struct EchoRequest {
        text: String,
    }

    struct EchoAgent;

    #[async_trait::async_trait]
    impl Agent for EchoAgent {
        type Request = EchoRequest;
        type Response = Value;

        fn kind(&self) -> AgentKind {
            AgentKind::Product
        }

        fn description(&self) -> &str {
            "Echoes text back"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object", "required": ["text"]})
        }

        fn validate(&self, request: &EchoRequest) -> Result<(), AgentError> {
            if request.text.is_empty() {
                return Err(AgentError::InvalidRequest("text must not be empty".into()));
            }
            Ok(())
        }

        async fn execute(&self, request: EchoRequest) -> Result<Value> {
            if request.text == "boom" {
                anyhow::bail!("exploded");
            }
            Ok(json!({"echo": request.text}))
        }
    }

    async fn post_json(body: &str) -> (StatusCode, Value) {
        let app = routes(Arc::new(EchoAgent), 8003);
        let response = app
            .oneshot(
                Request::post("/develop-product")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn valid_request_is_answered() {
        let (status, body) = post_json(r#"{"text": "hi"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"echo": "hi"}));
    }

    #[tokio::test]
    async fn validation_failure_is_bad_request() {
        let (status, body) = post_json(r#"{"text": ""}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("text must not be empty"));
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (status, body) = post_json(r#"{"wrong": 1}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn execution_failure_is_internal_error() {
        let (status, body) = post_json(r#"{"text": "boom"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "exploded");
    }

    #[tokio::test]
    async fn health_and_info() {
        let app = routes(Arc::new(EchoAgent), 8003);
        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health, json!({"status": "ok", "agent": "Product Agent"}));

        let response = app
            .oneshot(Request::get("/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let info: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(info["port"], 8003);
        assert_eq!(info["route"], "/develop-product");
        assert_eq!(info["status"], "active");
        assert_eq!(info["role"], "Echoes text back");
    }
}
