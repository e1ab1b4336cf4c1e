//! Error types shared by the credential pool, the GitHub client and the
//! repository manager.
//!
//! Rate-limit exhaustion never shows up here: the selector waits for the next
//! reset instead of failing.

use thiserror::Error;

/// Result alias used throughout the `github` module
pub type Result<T> = std::result::Result<T, GithubPoolError>;

#[derive(Debug, Error)]
pub enum GithubPoolError {
    /// Credential parsing produced no usable pool while authentication was required
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The GitHub API answered 404 for `resource`
    ///
    /// The repository manager translates this into [`GithubPoolError::NotFound`]
    /// with a message naming what the caller asked for.
    #[error("GitHub resource not found: {resource}")]
    RemoteNotFound { resource: String },

    /// Caller-facing not-found message
    #[error("{0}")]
    NotFound(String),

    /// Any other failure talking to the GitHub API
    #[error("{}", format_transport(.status, .message))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The HTTP client for a handle could not be constructed
    #[error("Failed to build GitHub client: {0}")]
    ClientBuild(String),
}

fn format_transport(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("GitHub API error {}: {}", status, message),
        None => format!("GitHub request failed: {}", message),
    }
}

impl GithubPoolError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// True when the remote reported a 404-equivalent
    pub fn is_remote_not_found(&self) -> bool {
        matches!(self, Self::RemoteNotFound { .. })
    }
}

impl From<reqwest::Error> for GithubPoolError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_includes_status() {
        let err = GithubPoolError::transport(Some(502), "Bad Gateway");
        assert_eq!(err.to_string(), "GitHub API error 502: Bad Gateway");

        let err = GithubPoolError::transport(None, "connection reset");
        assert_eq!(err.to_string(), "GitHub request failed: connection reset");
    }

    #[test]
    fn test_not_found_message_is_verbatim() {
        let err = GithubPoolError::NotFound("Content not found: o/r/p".to_string());
        assert_eq!(err.to_string(), "Content not found: o/r/p");
        assert!(!err.is_remote_not_found());

        let err = GithubPoolError::RemoteNotFound {
            resource: "o/r".to_string(),
        };
        assert!(err.is_remote_not_found());
    }
}
