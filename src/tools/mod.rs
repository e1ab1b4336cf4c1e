pub mod params;

use rmcp::{ServerHandler, model::*, schemars, tool};
use serde::Serialize;

use crate::github::{GithubPoolError, RepositoryManager};

pub use params::{ListRepositoriesParams, RepositoryContentParams};

/// GitHub tools exposed through the MCP protocol
///
/// A thin wrapper around [`RepositoryManager`]. Clones share the same
/// credential pool, so every MCP session served by one process draws from
/// one set of tokens.
#[derive(Clone, Debug)]
pub struct GithubPoolTools {
    manager: RepositoryManager,
}

impl GithubPoolTools {
    pub fn new(manager: RepositoryManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &RepositoryManager {
        &self.manager
    }
}

/// Renders a tool result as pretty JSON
fn to_json_text<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Error: {}", e))
}

fn to_tool_error(err: GithubPoolError) -> String {
    tracing::error!("Tool call failed: {}", err);
    format!("Error: {}", err)
}

#[tool(tool_box)]
impl ServerHandler for GithubPoolTools {
    /// Provides information about this MCP server
    ///
    /// Returns server capabilities, protocol version, and usage instructions
    fn get_info(&self) -> ServerInfo {
        let auth_status = match self.manager.try_credential_count() {
            Some(0) => "No GitHub tokens configured (unauthenticated, 60 requests/hour)".to_string(),
            Some(count) => format!("{} GitHub token(s) in the pool", count),
            None => "Token pool busy".to_string(),
        };

        let instructions = format!(
            "# GitHub Token Pool MCP Server

## Authentication Status
{}

## Available Tools
- `get_latest_release`: Latest release of a repository
- `get_repository_content`: File content or directory listing of a repository
- `list_repositories`: Repositories of an organization or user
- `get_rate_limit_status`: Remaining quota of every pooled token

## Authentication
Tokens are rotated automatically: the current token is kept until it has 10 or fewer
requests left, then the next one with quota is used. When every token is exhausted the
call waits for the earliest reset instead of failing.

### Option 1: Command Line Argument (highest priority)
```
github-pool-mcp stdio --github-tokens=token1,token2
github-pool-mcp http --github-tokens=token1,token2
```

### Option 2: Environment Variable or .env file
```
export GITHUB_TOKENS=token1,token2
```

### Option 3: Per call
Pass `tokens` to any tool. This replaces the pool for all later calls.
",
            auth_status
        );

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(instructions),
        }
    }
}

#[tool(tool_box)]
impl GithubPoolTools {
    #[tool(
        description = "Get the latest release of a GitHub repository: tag, name, release notes, publish date, URL and assets with download counts. Example usage: `{\"name\": \"get_latest_release\", \"arguments\": {\"owner\": \"tokio-rs\", \"repo\": \"tokio\"}}`"
    )]
    async fn get_latest_release(
        &self,
        #[tool(param)]
        #[schemars(description = "Repository owner (user or organization), e.g. 'tokio-rs' (required)")]
        owner: String,

        #[tool(param)]
        #[schemars(description = "Repository name, e.g. 'tokio' (required)")]
        repo: String,

        #[tool(param)]
        #[schemars(
            description = "Comma-separated GitHub tokens (optional). When given, they replace the server's token pool for this and all later calls."
        )]
        tokens: Option<String>,
    ) -> Result<String, String> {
        let release = self
            .manager
            .get_latest_release(&owner, &repo, tokens.as_deref())
            .await
            .map_err(to_tool_error)?;

        to_json_text(&release)
    }

    #[tool(
        description = "Get a file or directory from a GitHub repository. Files are returned with their base64 content decoded to text; directories return a list of entries (name, path, type, size, sha, urls). Example usage: `{\"name\": \"get_repository_content\", \"arguments\": {\"owner\": \"tokio-rs\", \"repo\": \"tokio\", \"path\": \"README.md\"}}`. With a tag: `{\"name\": \"get_repository_content\", \"arguments\": {\"owner\": \"tokio-rs\", \"repo\": \"tokio\", \"path\": \"tokio/src\", \"ref\": \"tokio-1.0.0\"}}`"
    )]
    async fn get_repository_content(
        &self,
        #[tool(aggr)] params: RepositoryContentParams,
    ) -> Result<String, String> {
        let content = self
            .manager
            .get_repository_content(
                &params.owner,
                &params.repo,
                params.path.as_deref(),
                params.ref_name.as_deref(),
                params.tokens.as_deref(),
            )
            .await
            .map_err(to_tool_error)?;

        to_json_text(&content)
    }

    #[tool(
        description = "List repositories of a GitHub organization, falling back to a user with the same name (first 100). Example usage: `{\"name\": \"list_repositories\", \"arguments\": {\"owner\": \"rust-lang\"}}`. Only repositories the user owns: `{\"name\": \"list_repositories\", \"arguments\": {\"owner\": \"octocat\", \"type\": \"owner\"}}`"
    )]
    async fn list_repositories(
        &self,
        #[tool(aggr)] params: ListRepositoriesParams,
    ) -> Result<String, String> {
        let repositories = self
            .manager
            .list_repositories(
                &params.owner,
                params.repo_type.unwrap_or_default(),
                params.tokens.as_deref(),
            )
            .await
            .map_err(to_tool_error)?;

        to_json_text(&repositories)
    }

    #[tool(
        description = "Show the locally tracked quota of every pooled GitHub token: index, remaining requests, reset time and whether it is the token currently in use. Tokens themselves are never shown. Example usage: `{\"name\": \"get_rate_limit_status\", \"arguments\": {}}`"
    )]
    async fn get_rate_limit_status(&self) -> Result<String, String> {
        let status = self.manager.rate_limit_status().await;
        to_json_text(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::GithubClientConfig;
    use crate::github::credential_pool::{AuthRequirement, SystemClock};
    use std::sync::Arc;

    fn tools_for(server: &mockito::ServerGuard, tokens: Option<&str>) -> GithubPoolTools {
        let config = GithubClientConfig::default()
            .with_api_base_url(url::Url::parse(&server.url()).unwrap());
        let manager = RepositoryManager::from_tokens(
            tokens,
            AuthRequirement::Optional,
            config,
            Arc::new(SystemClock),
        )
        .unwrap();
        GithubPoolTools::new(manager)
    }

    #[tokio::test]
    async fn test_tool_errors_are_prefixed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/owner/nonexistent/releases/latest")
            .with_status(404)
            .create_async()
            .await;

        let tools = tools_for(&server, Some("token-a"));
        let err = tools
            .get_latest_release("owner".to_string(), "nonexistent".to_string(), None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            "Error: Repository owner/nonexistent not found or no releases available"
        );
    }

    #[tokio::test]
    async fn test_list_repositories_defaults_to_all() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/orgs/rust-lang/repos")
            .match_query(mockito::Matcher::UrlEncoded("type".into(), "all".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"name":"rust","full_name":"rust-lang/rust","private":false,
                     "html_url":"https://github.com/rust-lang/rust"}]"#,
            )
            .create_async()
            .await;

        let tools = tools_for(&server, None);
        let text = tools
            .list_repositories(ListRepositoriesParams {
                owner: "rust-lang".to_string(),
                repo_type: None,
                tokens: None,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["full_name"], "rust-lang/rust");
        // pretty printed
        assert!(text.contains('\n'));
    }

    #[tokio::test]
    async fn test_rate_limit_status_never_shows_tokens() {
        let server = mockito::Server::new_async().await;
        let tools = tools_for(&server, Some("ghp_secret_one,ghp_secret_two"));

        let text = tools.get_rate_limit_status().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["index"], 0);
        assert_eq!(value[0]["remaining"], 5000);
        assert_eq!(value[0]["is_active"], true);
        assert_eq!(value[1]["is_active"], false);
        assert!(!text.contains("ghp_secret"));
    }

    #[tokio::test]
    async fn test_info_reports_pool_size() {
        let server = mockito::Server::new_async().await;

        let tools = tools_for(&server, Some("a,b,c"));
        let instructions = tools.get_info().instructions.unwrap();
        assert!(instructions.contains("3 GitHub token(s) in the pool"));

        let tools = tools_for(&server, None);
        let instructions = tools.get_info().instructions.unwrap();
        assert!(instructions.contains("No GitHub tokens configured"));
    }
}
