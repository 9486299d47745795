use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promptcode::config::{Config, ServerConfig};
use promptcode::transport;

#[derive(Parser)]
#[command(name = "promptcode")]
#[command(author, version, about = "promptcode - chat with an LLM code assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the generation API server (reads GEMINI_API_KEY, PORT, DEFAULT_MODEL)
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides HOST)
        #[arg(long)]
        host: Option<String>,
    },

    /// Interactive chat against a running generation server
    Chat {
        /// Initial message to send
        message: Option<String>,

        /// Base URL of the generation server
        #[arg(short, long)]
        backend_url: Option<String>,

        /// Model to request (e.g., gemini-2.5-flash)
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "promptcode=debug,tower_http=debug"
    } else {
        "promptcode=info,tower_http=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { port, host } => {
            if let Ok(path) = dotenvy::dotenv() {
                tracing::debug!("Loaded environment from {}", path.display());
            }
            let mut config = ServerConfig::from_env()?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            tracing::info!("Starting HTTP server on {}:{}", config.host, config.port);
            transport::http::run_http_server(config).await?;
        }
        Commands::Chat {
            message,
            backend_url,
            model,
        } => {
            let mut config = Config::load().unwrap_or_else(|e| {
                tracing::warn!("Using default client config: {}", e);
                Config::default()
            });
            if let Some(url) = backend_url {
                config.client.backend_url = url;
            }
            if model.is_some() {
                config.client.model = model;
            }
            transport::cli::run_chat(config.client, message).await?;
        }
    }

    Ok(())
}
