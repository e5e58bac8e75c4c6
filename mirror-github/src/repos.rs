//! Mirror repository provisioning: lookup, create, delete.

use serde::Deserialize;
use serde_json::json;

use crate::client::{GithubClient, DEFAULT_WEB_BASE};
use crate::error::GithubError;

/// The subset of the REST repository payload the mirror cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteRepo {
    pub full_name: String,
    #[serde(default)]
    pub private: bool,
}

/// `GET /repos/{owner}/{name}`; `None` on 404.
pub fn lookup_repo(client: &GithubClient, owner: &str, name: &str) -> Result<Option<RemoteRepo>, GithubError> {
    match client.get(&format!("/repos/{owner}/{name}")) {
        Ok(response) => response
            .into_json()
            .map(Some)
            .map_err(|e| GithubError::Decode(e.to_string())),
        Err(GithubError::Http { status: 404, .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Create a private, empty repository owned by the token's user.
pub fn create_repo(client: &GithubClient, name: &str) -> Result<RemoteRepo, GithubError> {
    tracing::info!(name, "creating mirror repository");
    let body = json!({
        "name": name,
        "private": true,
        "description": "Contribution activity mirror",
        "auto_init": false,
    });
    match client.post("/user/repos", body) {
        Ok(response) => response
            .into_json()
            .map_err(|e| GithubError::Decode(e.to_string())),
        Err(GithubError::Http { status: 422, .. }) => Err(GithubError::NameConflict(name.to_string())),
        Err(err) => Err(err),
    }
}

/// Delete the repository. Requires the `delete_repo` scope; absent is fine.
pub fn delete_repo(client: &GithubClient, owner: &str, name: &str) -> Result<(), GithubError> {
    match client.delete(&format!("/repos/{owner}/{name}")) {
        Ok(_) | Err(GithubError::Http { status: 404, .. }) => {
            tracing::info!(owner, name, "deleted mirror repository");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// HTTPS clone URL carrying `token` as credentials.
pub fn authenticated_clone_url(owner: &str, name: &str, token: &str) -> String {
    let host = DEFAULT_WEB_BASE.trim_start_matches("https://");
    format!("https://x-access-token:{token}@{host}/{owner}/{name}.git")
}
