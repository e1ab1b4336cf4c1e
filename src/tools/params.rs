//! Argument structs for tools whose parameter names are Rust keywords

use rmcp::schemars;
use serde::Deserialize;

use crate::github::RepositoryType;

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct RepositoryContentParams {
    #[schemars(description = "Repository owner (user or organization), e.g. 'tokio-rs' (required)")]
    pub owner: String,

    #[schemars(description = "Repository name, e.g. 'tokio' (required)")]
    pub repo: String,

    #[schemars(
        description = "Path inside the repository (optional, default is the repository root). A directory path returns its entries, a file path returns the decoded file content."
    )]
    pub path: Option<String>,

    #[schemars(description = "Branch, tag or commit SHA (optional, default is 'main')")]
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,

    #[schemars(
        description = "Comma-separated GitHub tokens (optional). When given, they replace the server's token pool for this and all later calls."
    )]
    pub tokens: Option<String>,
}

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ListRepositoriesParams {
    #[schemars(description = "Organization or user name (required). Tried as an organization first, then as a user.")]
    pub owner: String,

    #[schemars(
        description = "Which repositories to list (optional, default is 'all'). Options: all, owner, member."
    )]
    #[serde(rename = "type")]
    pub repo_type: Option<RepositoryType>,

    #[schemars(
        description = "Comma-separated GitHub tokens (optional). When given, they replace the server's token pool for this and all later calls."
    )]
    pub tokens: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parameters_use_wire_names() {
        let params: RepositoryContentParams = serde_json::from_str(
            r#"{"owner":"o","repo":"r","path":"src","ref":"v1.0.0"}"#,
        )
        .unwrap();
        assert_eq!(params.ref_name.as_deref(), Some("v1.0.0"));
        assert_eq!(params.tokens, None);

        let params: ListRepositoriesParams =
            serde_json::from_str(r#"{"owner":"o","type":"member"}"#).unwrap();
        assert_eq!(params.repo_type, Some(RepositoryType::Member));
    }

    #[test]
    fn test_unknown_repository_type_is_rejected() {
        let result = serde_json::from_str::<ListRepositoriesParams>(r#"{"owner":"o","type":"forks"}"#);
        assert!(result.is_err());
    }
}
