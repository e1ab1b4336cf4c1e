use crate::github::RepositoryManager;
use crate::tools::GithubPoolTools;
use anyhow::Result;
use rmcp::transport::sse_server::SseServer;
use std::net::SocketAddr;

/// HTTP/SSE front end; every session gets a clone of the same tools (one shared pool)
pub struct SseServerApp {
    bind_addr: SocketAddr,
    tools: GithubPoolTools,
}

impl SseServerApp {
    pub fn new(bind_addr: SocketAddr, manager: RepositoryManager) -> Self {
        Self {
            bind_addr,
            tools: GithubPoolTools::new(manager),
        }
    }

    pub async fn serve(self) -> Result<()> {
        let sse_server = SseServer::serve(self.bind_addr).await?;
        let tools = self.tools;
        let cancellation_token = sse_server.with_service(move || tools.clone());

        // Wait for Ctrl+C signal to gracefully shutdown
        tokio::signal::ctrl_c().await?;

        cancellation_token.cancel();

        Ok(())
    }
}
