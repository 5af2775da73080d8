use anyhow::Result;
use serde_json::Value;

/// Core Tool trait that all tools must implement
/// Tools take a JSON argument object with an `action` field and answer with JSON text.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the name of the tool
    fn name(&self) -> &str;

    /// Get the description of the tool
    fn description(&self) -> &str;

    /// Get the parameters schema for the tool
    fn parameters(&self) -> Value;

    /// Entry point for tool execution with logging
    async fn call(&self, arguments: &str) -> Result<String> {
        log::info!("Tool call start: {} - args: {}", self.name(), arguments);

        let result = self.execute(arguments).await;

        match &result {
            Ok(response) => log::info!(
                "Tool call success: {} - {} bytes",
                self.name(),
                response.len()
            ),
            Err(e) => log::error!("Tool call error: {} - error: {}", self.name(), e),
        }

        result
    }

    /// Actual implementation of the tool execution
    async fn execute(&self, arguments: &str) -> Result<String>;
}

/// Call a tool with a JSON argument object and parse its JSON reply.
pub async fn call_json(tool: &dyn Tool, arguments: Value) -> Result<Value> {
    let raw = tool.call(&arguments.to_string()).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Helper function to describe tools for discovery output
pub fn tools_to_json(tools: &[&dyn Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            serde_json::json!({
                "name": tool.name(),
                "description": tool.description(),
                "input_schema": tool.parameters()
            })
        })
        .collect()
}
