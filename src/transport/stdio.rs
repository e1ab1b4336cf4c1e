use crate::github::RepositoryManager;
use crate::tools::GithubPoolTools;
use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::stdio;

/// Serves the GitHub tools over stdin/stdout until the client disconnects
pub async fn run_stdio_server(manager: RepositoryManager) -> Result<()> {
    let service = GithubPoolTools::new(manager);

    let server = service.serve(stdio()).await?;

    server.waiting().await?;
    Ok(())
}
