use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{self, EnvFilter};

use github_pool_mcp::config::{GithubArgs, load_dotenv};
use github_pool_mcp::github::RepositoryType;

#[derive(Parser)]
#[command(author, version, about = "GitHub CLI backed by a rate-limited token pool", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    github: GithubArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the latest release of a repository
    LatestRelease {
        /// Repository owner (user or organization)
        owner: String,

        /// Repository name
        repo: String,
    },
    /// Show a file or directory of a repository
    Content {
        /// Repository owner (user or organization)
        owner: String,

        /// Repository name
        repo: String,

        /// Path inside the repository (default is the repository root)
        path: Option<String>,

        /// Branch, tag or commit (default is 'main')
        #[arg(short, long = "ref")]
        ref_name: Option<String>,
    },
    /// List repositories of an organization or user
    ListRepos {
        /// Organization or user name
        owner: String,

        /// Which repositories to list
        #[arg(long = "type", value_enum, default_value = "all")]
        repo_type: RepositoryTypeArg,
    },
    /// Show the quota of every configured token
    Status,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum RepositoryTypeArg {
    All,
    Owner,
    Member,
}

impl From<RepositoryTypeArg> for RepositoryType {
    fn from(value: RepositoryTypeArg) -> Self {
        match value {
            RepositoryTypeArg::All => RepositoryType::All,
            RepositoryTypeArg::Owner => RepositoryType::Owner,
            RepositoryTypeArg::Member => RepositoryType::Member,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let dotenv_path = load_dotenv();
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr) // Use stderr for logging
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    if let Some(path) = &dotenv_path {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let manager = cli
        .github
        .build_manager()
        .map_err(|e| anyhow::anyhow!("Failed to configure GitHub access: {}", e))?;

    tracing::debug!("Using {} GitHub token(s)", manager.credential_count().await);

    match cli.command {
        Commands::LatestRelease { owner, repo } => {
            let release = manager
                .get_latest_release(&owner, &repo, None)
                .await
                .map_err(|e| anyhow::anyhow!("Error: {}", e))?;
            print_json(&release)
        }
        Commands::Content {
            owner,
            repo,
            path,
            ref_name,
        } => {
            let content = manager
                .get_repository_content(&owner, &repo, path.as_deref(), ref_name.as_deref(), None)
                .await
                .map_err(|e| anyhow::anyhow!("Error: {}", e))?;
            print_json(&content)
        }
        Commands::ListRepos { owner, repo_type } => {
            let repositories = manager
                .list_repositories(&owner, repo_type.into(), None)
                .await
                .map_err(|e| anyhow::anyhow!("Error: {}", e))?;
            print_json(&repositories)
        }
        Commands::Status => print_json(&manager.rate_limit_status().await),
    }
}
