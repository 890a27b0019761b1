//! GitLab API error types.

use thiserror::Error;

use crate::http::TransportError;

/// Errors that can occur when fetching org data from the GitLab API.
///
/// Network failures and non-2xx responses are kept distinguishable so the
/// group graph builder can tolerate a 404 on group detail without masking
/// real upstream failures.
#[derive(Debug, Error)]
pub enum GitLabError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("GitLab API returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode GitLab response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid GitLab API URL: {0}")]
    Url(String),
}

impl GitLabError {
    /// Create a status error for a non-2xx response.
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::Status {
            status,
            url: url.into(),
        }
    }

    /// Whether this error is an upstream 404.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_not_found_matches_only_404_statuses() {
        assert!(GitLabError::status(404, "https://gitlab.com/api/v4/groups/1").is_not_found());
        assert!(!GitLabError::status(500, "https://gitlab.com/api/v4/groups/1").is_not_found());
        assert!(!GitLabError::Transport(TransportError::Transport("boom".into())).is_not_found());
    }

    #[test]
    fn status_error_display_includes_status_and_url() {
        let err = GitLabError::status(503, "https://gitlab.com/api/v4/users");
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("/api/v4/users"));
    }
}
