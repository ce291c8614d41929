//! CLI entry point for voice-assistant

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use voice_assistant_agent::{AgentSettings, ChatGenerator, ConversationAgent, TextGenerator};
use voice_assistant_core::config::{Config, ConfigLoader};
use voice_assistant_core::logging::init_logging;
use voice_assistant_core::session::{FileStateStore, MemoryStateStore, StateStore};
use voice_assistant_core::utils::expand_tilde;
use voice_assistant_manager::{run_server, AgentFactory, AgentNamespace, AppState};
use voice_assistant_providers::{build_provider, AiGateway, LLMProvider};
use voice_assistant_tools::{McpClientManager, ToolSource};

mod client;

use client::ApiClient;

const MCP_CLIENT_NAME: &str = "siri-assistant";

#[derive(Parser)]
#[command(name = "voice-assistant")]
#[command(about = "Conversational HTTP endpoint backed by a hosted chat model and MCP tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Keep the transcript in memory only
        #[arg(long)]
        ephemeral: bool,
    },
    /// Send a message to a running server
    Say {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Server URL
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Show configuration and session status
    Status {
        /// Server URL
        #[arg(short, long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Serve { port, ephemeral } => {
            run_serve(&config_loader, port, ephemeral).await?;
        }
        Commands::Init { force } => {
            tracing_subscriber::fmt::init();
            run_init(&config_loader, force)?;
        }
        Commands::Say { message, url } => {
            tracing_subscriber::fmt::init();
            run_say(&config_loader, &message, url).await?;
        }
        Commands::Status { url } => {
            tracing_subscriber::fmt::init();
            run_status(&config_loader, url).await?;
        }
    }

    Ok(())
}

/// Server URL given on the command line, or the local configured one
fn server_url(loader: &ConfigLoader, url: Option<String>) -> Result<String> {
    if let Some(url) = url {
        return Ok(url);
    }
    let config = loader.load()?;
    Ok(format!("http://127.0.0.1:{}", config.server.port))
}

fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let path = loader.config_path();
    if path.exists() && !force {
        println!(
            "{} {} (use --force to overwrite)",
            style("Configuration already exists:").yellow(),
            path.display()
        );
        return Ok(());
    }

    loader.save(&Config::default())?;
    println!(
        "{} {}",
        style("Wrote configuration to").green(),
        path.display()
    );
    Ok(())
}

async fn run_serve(loader: &ConfigLoader, port: Option<u16>, ephemeral: bool) -> Result<()> {
    let mut config = loader.load()?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let _log_guard = init_logging(&config.logging);

    if config.provider.api_key.trim().is_empty() && AiGateway::from_config(&config.gateway).is_none()
    {
        warn!("No API key or AI gateway configured; model calls will likely fail");
    }

    let provider: Arc<dyn LLMProvider> = Arc::new(build_provider(&config));
    let generator: Arc<dyn TextGenerator> =
        Arc::new(ChatGenerator::from_config(provider, &config.agent));

    let store: Arc<dyn StateStore> = if ephemeral {
        Arc::new(MemoryStateStore::new())
    } else {
        Arc::new(FileStateStore::new(expand_tilde(&config.session.state_dir)))
    };

    let settings = AgentSettings::from_config(&config);
    let factory: AgentFactory = Arc::new(move |id: &str| {
        let tools: Arc<dyn ToolSource> = Arc::new(McpClientManager::new(
            MCP_CLIENT_NAME,
            env!("CARGO_PKG_VERSION"),
        ));
        Ok(ConversationAgent::new(
            id,
            settings.clone(),
            generator.clone(),
            tools,
            store.clone(),
        ))
    });

    let namespace = Arc::new(AgentNamespace::new(factory));
    let state = AppState::new(namespace, config.session.agent_id.clone());

    let addr: SocketAddr = tokio::net::lookup_host((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("failed to resolve {}", config.server.host))?
        .next()
        .with_context(|| format!("no address for {}", config.server.host))?;

    println!("{}", style("Starting voice-assistant...").bold().cyan());
    println!("Model: {}", config.agent.model);
    println!("Session: {}", config.session.agent_id);
    println!(
        "State: {}",
        if ephemeral {
            "in-memory".to_string()
        } else {
            config.session.state_dir.clone()
        }
    );
    info!("Serving session {} on {}", config.session.agent_id, addr);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut server = tokio::spawn(run_server(state, addr, shutdown_rx));

    println!(
        "\n{}",
        style("Server is running. Press Ctrl+C to stop.").green()
    );

    tokio::select! {
        result = &mut server => {
            return result?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
        }
    }

    println!("\n{}", style("Shutting down...").yellow());
    let _ = shutdown_tx.send(());
    server.await??;

    println!("{}", style("Server stopped.").green());
    Ok(())
}

async fn run_say(loader: &ConfigLoader, message: &str, url: Option<String>) -> Result<()> {
    let client = ApiClient::new(server_url(loader, url)?);
    let reply = client.say(message).await?;
    println!("{}", reply);
    Ok(())
}

async fn run_status(loader: &ConfigLoader, url: Option<String>) -> Result<()> {
    let config = loader.load()?;

    println!("{}", style("voice-assistant status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  Model: {}", config.agent.model);
    println!("  Max steps: {}", config.agent.max_steps);
    let endpoint = AiGateway::from_config(&config.gateway)
        .map(|gw| format!("{} (AI gateway)", gw.base_url()))
        .unwrap_or_else(|| build_provider(&config).api_base().to_string());
    println!("  Endpoint: {}", endpoint);
    let key_status = if config.provider.api_key.is_empty() {
        style("not configured").red()
    } else {
        style("configured").green()
    };
    println!("  API key: {}", key_status);
    println!("  Session: {}", config.session.agent_id);
    println!();

    println!("{}", style("Tool servers:").bold());
    let mut servers: Vec<_> = config.tools.mcp_servers.iter().collect();
    servers.sort_by(|a, b| a.0.cmp(b.0));
    for (name, server) in servers {
        let status = if server.enabled {
            style("enabled").green()
        } else {
            style("disabled").dim()
        };
        println!("  {}: {} ({})", name, status, server.url);
    }
    println!();

    let url = url.unwrap_or_else(|| format!("http://127.0.0.1:{}", config.server.port));
    let client = ApiClient::new(url);
    println!("{}", style("Session:").bold());
    match client.status().await {
        Ok(status) => {
            println!("  Server: {}", client.base_url());
            println!("  Active: {}", status.session_active);
            println!("  Messages: {}", status.message_count);
            println!("  Duration: {}s", status.session_duration / 1000);
        }
        Err(e) => {
            println!(
                "  Server {}: {}",
                client.base_url(),
                style(format!("not reachable ({})", e)).red()
            );
        }
    }

    Ok(())
}
