//! Records returned by the GitHub operations
//!
//! These types deserialize straight from the GitHub REST payloads; serde drops
//! every field that is not listed here, which gives the projected shape the
//! tools return. File content is the only field that needs post-processing
//! (base64 decoding, see [`FileContent::decode_content`]).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Latest release of a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    pub name: Option<String>,
    pub body: Option<String>,
    pub published_at: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_count: u64,
    pub browser_download_url: String,
    pub size: u64,
}

/// One entry of a directory listing (content omitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub size: u64,
    pub sha: String,
    pub url: Option<String>,
    pub html_url: Option<String>,
    pub download_url: Option<String>,
}

/// A single file (or symlink/submodule) returned by the contents API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub size: u64,
    pub sha: String,
    pub content: Option<String>,
    pub encoding: Option<String>,
    pub url: Option<String>,
    pub html_url: Option<String>,
    pub download_url: Option<String>,
}

impl FileContent {
    /// Replaces base64 content with its decoded text
    ///
    /// GitHub wraps base64 content at 60 columns, so whitespace is stripped
    /// before decoding. Invalid UTF-8 is replaced lossily. Content with any
    /// other encoding is left as is.
    pub fn decode_content(mut self) -> Self {
        if self.encoding.as_deref() != Some("base64") {
            return self;
        }
        if let Some(raw) = self.content.as_deref() {
            let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            match STANDARD.decode(compact.as_bytes()) {
                Ok(bytes) => {
                    self.content = Some(String::from_utf8_lossy(&bytes).into_owned());
                }
                Err(e) => {
                    tracing::warn!(path = %self.path, "Failed to decode base64 content: {}", e);
                }
            }
        }
        self
    }
}

/// Result of the contents API: a directory listing or a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepositoryContent {
    Directory(Vec<ContentEntry>),
    File(FileContent),
}

/// Repository as returned by the org/user repository listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub private: bool,
    pub html_url: String,
    pub clone_url: Option<String>,
    pub ssh_url: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: Option<u64>,
    pub forks_count: Option<u64>,
    pub updated_at: Option<String>,
    pub created_at: Option<String>,
}

/// Which repositories of an owner to list
///
/// Passed through verbatim as the `type` query parameter of both the
/// organization and the user listing.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RepositoryType {
    /// Every repository the caller can see
    #[default]
    All,
    /// Repositories owned by the user
    Owner,
    /// Repositories the user is a member of
    Member,
}

impl RepositoryType {
    pub fn to_str(&self) -> &str {
        self.as_ref()
    }
}
