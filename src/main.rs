use anyhow::{Context, Result};
use bizplan_agents::agents::research::tools::{tool_by_name, ResearchToolkit, ToolsConfig};
use bizplan_agents::agents::{describe_agents, serve_agent, serve_all};
use bizplan_agents::tool::{tools_to_json, Tool};
use bizplan_agents::AgentKind;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::net::IpAddr;

#[derive(Parser, Debug)]
#[command(name = "bizplan", about = "Business plan generation agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve one agent, or every agent on its default port when none is given
    Serve {
        agent: Option<AgentKind>,

        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,

        /// Override the agent's default port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the full workflow for a business idea and print the plan as JSON
    Run {
        description: String,

        #[arg(long)]
        pretty: bool,
    },

    /// Invoke a research tool directly with JSON arguments
    Tool { name: String, arguments: String },

    /// List agents and research tools
    Agents,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { agent, host, port } => match agent {
            Some(kind) => serve_agent(kind, host, port.unwrap_or(kind.default_port())).await?,
            None => {
                if port.is_some() {
                    log::warn!("--port is ignored when serving every agent");
                }
                serve_all(host).await?
            }
        },

        Command::Run { description, pretty } => {
            let response = bizplan_agents::process_business_idea(&description).await?;
            let output = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{output}");
        }

        Command::Tool { name, arguments } => {
            let config = ToolsConfig::new();
            let tool = tool_by_name(&name, &config)?
                .with_context(|| format!("Unknown tool: {name}"))?;
            let output = tool.call(&arguments).await?;
            println!("{output}");
        }

        Command::Agents => {
            let toolkit = ResearchToolkit::new(&ToolsConfig::default())?;
            let listing = json!({
                "agents": describe_agents()?,
                "tools": tools_to_json(&toolkit.tools()),
            });
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
    }

    Ok(())
}
