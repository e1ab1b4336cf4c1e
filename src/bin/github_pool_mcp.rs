use anyhow::Result;
use clap::{Parser, Subcommand};
use github_pool_mcp::config::{GithubArgs, load_dotenv};
use github_pool_mcp::github::RepositoryManager;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{self, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    github: GithubArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server in stdin/stdout mode
    Stdio {
        /// Enable debug logging
        #[arg(short, long)]
        debug: bool,
    },
    /// Run the server with HTTP/SSE interface
    Http {
        /// Address to bind the HTTP server to
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        address: String,

        /// Enable debug logging
        #[arg(short, long)]
        debug: bool,
    },
}

fn main() -> Result<()> {
    // Environment variables must be set before the runtime starts its worker threads
    let dotenv_path = load_dotenv();
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli, dotenv_path))
}

async fn run(cli: Cli, dotenv_path: Option<PathBuf>) -> Result<()> {
    match cli.command {
        Commands::Stdio { debug } => run_stdio_server(debug, &cli.github, dotenv_path).await,
        Commands::Http { address, debug } => {
            run_http_server(address, debug, &cli.github, dotenv_path).await
        }
    }
}

async fn build_manager(github: &GithubArgs, dotenv_path: Option<PathBuf>) -> Result<RepositoryManager> {
    if let Some(path) = dotenv_path {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let manager = github
        .build_manager()
        .map_err(|e| anyhow::anyhow!("Failed to configure GitHub access: {}", e))?;

    let count = manager.credential_count().await;
    if count == 0 {
        tracing::warn!("No GitHub tokens configured, using unauthenticated access (60 requests/hour)");
    } else {
        tracing::info!("Using {} GitHub token(s) against {}", count, github.api_url);
    }

    Ok(manager)
}

async fn run_stdio_server(debug: bool, github: &GithubArgs, dotenv_path: Option<PathBuf>) -> Result<()> {
    // Initialize the tracing subscriber with stderr logging
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr) // stdout carries the protocol
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .init();

    tracing::info!("Starting GitHub pool MCP server in STDIN/STDOUT mode");
    let manager = build_manager(github, dotenv_path).await?;

    github_pool_mcp::transport::stdio::run_stdio_server(manager)
        .await
        .map_err(|e| anyhow::anyhow!("Error running STDIO server: {}", e))
}

async fn run_http_server(
    address: String,
    debug: bool,
    github: &GithubArgs,
    dotenv_path: Option<PathBuf>,
) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},{}", level, env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .init();

    let addr: SocketAddr = address.parse()?;
    let manager = build_manager(github, dotenv_path).await?;

    tracing::info!("Access the GitHub pool MCP server at http://{}/sse", addr);

    let app = github_pool_mcp::transport::sse_server::SseServerApp::new(addr, manager);
    app.serve().await?;

    Ok(())
}
