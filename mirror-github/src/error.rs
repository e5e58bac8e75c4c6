//! Error types for mirror-github.

use thiserror::Error;

use mirror_core::AccountName;
use mirror_sync::SourceError;

/// All errors that can arise from GitHub API calls.
#[derive(Debug, Error)]
pub enum GithubError {
    #[error("GitHub returned 401; check that the token has 'repo' and 'read:user' scopes")]
    Unauthorized,

    /// 403 without rate-limit exhaustion, usually a missing token scope.
    #[error("GitHub refused the request (403): {0}")]
    Forbidden(String),

    #[error("GitHub rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("GitHub user '{0}' not found")]
    UserNotFound(String),

    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("repository name conflict creating '{0}'")]
    NameConflict(String),

    #[error("GitHub API error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode GitHub response: {0}")]
    Decode(String),
}

impl From<GithubError> for SourceError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::Unauthorized | GithubError::Forbidden(_) => {
                SourceError::Unauthorized(err.to_string())
            }
            GithubError::RateLimited(msg) => SourceError::RateLimited(msg),
            GithubError::UserNotFound(login) => SourceError::UnknownAccount(AccountName(login)),
            GithubError::GraphQl(_) | GithubError::Decode(_) => {
                SourceError::Malformed(err.to_string())
            }
            other => SourceError::Unavailable(other.to_string()),
        }
    }
}
