mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::RwLock;
use tracing::info;

use whiteboard_agent::RunDriver;
use whiteboard_assistant::OpenAiAssistants;
use whiteboard_core::ShapeStore;
use whiteboard_gateway::{GatewayState, Session};
use whiteboard_tools::ToolRegistry;

use config::Config;

#[derive(Parser)]
#[command(name = "whiteboard")]
#[command(about = "Collaborative whiteboard server with an AI drawing assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the whiteboard server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Print the tool schemas offered to the assistant
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    whiteboard_logging::init_logger(config.log_dir.as_deref(), &config.log_level);

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, bind } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                bind_address: bind.unwrap_or(config.bind_address),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Tools => {
            let schemas = ToolRegistry::new().describe_tools();
            println!("{}", serde_json::to_string_pretty(&schemas)?);
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        model = %config.model,
        "Starting whiteboard server"
    );

    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY must be set to serve")?;
    let service = Arc::new(OpenAiAssistants::new(api_key).with_base_url(&config.openai_base_url));

    let store = Arc::new(RwLock::new(ShapeStore::new()));
    let driver = RunDriver::connect(
        service,
        ToolRegistry::new(),
        store.clone(),
        &config.model_config(),
        config.driver_config(),
    )
    .await
    .context("Failed to set up the assistant session")?;

    let state = GatewayState {
        session: Session::new(store, driver),
    };

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("Invalid bind address")?;
    whiteboard_gateway::start_server(addr, state).await
}
