//! Blocking GitHub API client.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GithubError;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_WEB_BASE: &str = "https://github.com";

const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated client for the REST and GraphQL APIs.
#[derive(Clone)]
pub struct GithubClient {
    agent: ureq::Agent,
    token: String,
    api_base: String,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_base", &self.api_base)
            .field("token", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl GithubClient {
    pub fn new(token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("mirror/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Run a GraphQL query and return its `data` member.
    pub(crate) fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, GithubError> {
        let url = format!("{}/graphql", self.api_base);
        let body = serde_json::json!({ "query": query, "variables": variables });
        let response = self.send(self.request("POST", &url), Some(body))?;
        let parsed: GraphQlResponse<T> = response
            .into_json()
            .map_err(|e| GithubError::Decode(e.to_string()))?;
        graphql_data(parsed)
    }

    pub(crate) fn get(&self, path: &str) -> Result<ureq::Response, GithubError> {
        let url = format!("{}{path}", self.api_base);
        self.send(self.request("GET", &url), None)
    }

    pub(crate) fn post(&self, path: &str, body: Value) -> Result<ureq::Response, GithubError> {
        let url = format!("{}{path}", self.api_base);
        self.send(self.request("POST", &url), Some(body))
    }

    pub(crate) fn delete(&self, path: &str) -> Result<ureq::Response, GithubError> {
        let url = format!("{}{path}", self.api_base);
        self.send(self.request("DELETE", &url), None)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        tracing::debug!(method, url, "github request");
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", API_VERSION)
    }

    fn send(&self, request: ureq::Request, body: Option<Value>) -> Result<ureq::Response, GithubError> {
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        match result {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(status, response)) => {
                let remaining = response.header("x-ratelimit-remaining").map(str::to_owned);
                let body = response.into_string().unwrap_or_default();
                Err(classify_status(status, remaining.as_deref(), body))
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(GithubError::Transport(transport.to_string()))
            }
        }
    }
}

/// Map a non-2xx status to the error taxonomy.
pub(crate) fn classify_status(status: u16, ratelimit_remaining: Option<&str>, body: String) -> GithubError {
    match status {
        401 => GithubError::Unauthorized,
        429 => GithubError::RateLimited(body),
        403 if ratelimit_remaining == Some("0") => GithubError::RateLimited(body),
        403 => GithubError::Forbidden(body),
        _ => GithubError::Http { status, body },
    }
}

fn graphql_data<T>(response: GraphQlResponse<T>) -> Result<T, GithubError> {
    if let Some(err) = response.errors.first() {
        match err.kind.as_deref() {
            Some("RATE_LIMITED") => return Err(GithubError::RateLimited(err.message.clone())),
            Some("NOT_FOUND") => return Err(GithubError::UserNotFound(not_found_login(&err.message))),
            _ => {}
        }
        return Err(GithubError::GraphQl(
            response.errors.iter().map(|e| e.message.clone()).collect(),
        ));
    }
    response
        .data
        .ok_or_else(|| GithubError::Decode("GraphQL response without data".to_string()))
}

/// GitHub phrases it as `Could not resolve to a User with the login of 'x'.`
fn not_found_login(message: &str) -> String {
    message
        .split('\'')
        .nth(1)
        .map(str::to_owned)
        .unwrap_or_else(|| message.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(401, None, "Unauthorized")]
    #[case(403, Some("0"), "RateLimited")]
    #[case(403, Some("42"), "Forbidden")]
    #[case(429, None, "RateLimited")]
    #[case(500, None, "Http")]
    fn status_codes_are_classified(
        #[case] status: u16,
        #[case] remaining: Option<&str>,
        #[case] expected: &str,
    ) {
        let err = classify_status(status, remaining, "body".to_string());
        let kind = format!("{err:?}");
        assert!(kind.starts_with(expected), "got: {kind}");
    }

    #[test]
    fn graphql_not_found_names_the_login() {
        let response: GraphQlResponse<Value> = serde_json::from_str(
            r#"{"data":{"user":null},"errors":[{"type":"NOT_FOUND","message":"Could not resolve to a User with the login of 'ghost'."}]}"#,
        )
        .unwrap();
        match graphql_data(response) {
            Err(GithubError::UserNotFound(login)) => assert_eq!(login, "ghost"),
            other => panic!("expected UserNotFound, got {other:?}"),
        }
    }

    #[test]
    fn graphql_other_errors_are_collected() {
        let response: GraphQlResponse<Value> = serde_json::from_str(
            r#"{"errors":[{"message":"first"},{"message":"second"}]}"#,
        )
        .unwrap();
        match graphql_data(response) {
            Err(GithubError::GraphQl(messages)) => assert_eq!(messages, ["first", "second"]),
            other => panic!("expected GraphQl, got {other:?}"),
        }
    }

    #[test]
    fn debug_output_hides_token() {
        let client = GithubClient::new("ghp_secret");
        let debug = format!("{client:?}");
        assert!(!debug.contains("ghp_secret"));
        assert_eq!(client.token(), "ghp_secret");
    }
}
