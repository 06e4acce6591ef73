//! Thin octocrab wrapper that issues raw REST calls with the fixed GitHub
//! headers and reports failures as [`EasyGithubError::Upstream`], keeping the
//! status code and the response body text.

use std::sync::Arc;

use http::header::{HeaderName, ACCEPT};
use http::StatusCode;
use octocrab::{Octocrab, OctocrabBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::error::{EasyGithubError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
pub const API_VERSION: &str = "2022-11-28";
pub const MEDIA_TYPE: &str = "application/vnd.github+json";

/// Settings fixed for the life of the process.
#[derive(Clone, Default)]
pub struct ClientConfig {
    /// API root. `None` means public GitHub.
    pub base_url: Option<String>,
    pub token: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone)]
pub struct GitHubClient {
    github: Arc<Octocrab>,
    authenticated: bool,
}

impl GitHubClient {
    pub fn new(config: ClientConfig) -> std::result::Result<Self, octocrab::Error> {
        let base_url = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let mut builder = OctocrabBuilder::new()
            .base_uri(base_url)?
            .add_header(ACCEPT, MEDIA_TYPE.to_string())
            .add_header(
                HeaderName::from_static("x-github-api-version"),
                API_VERSION.to_string(),
            );

        let authenticated = config.token.is_some();
        if let Some(token) = config.token {
            builder = builder.personal_token(token);
        }

        Ok(Self {
            github: Arc::new(builder.build()?),
            authenticated,
        })
    }

    pub fn has_token(&self) -> bool {
        self.authenticated
    }

    pub async fn get<Q>(&self, endpoint: &str, query: Option<&Q>) -> Result<Value>
    where
        Q: Serialize + ?Sized,
    {
        let uri = with_query(endpoint, query)?;
        tracing::debug!(uri = %uri, "GET");
        let response = self
            .github
            ._get(uri)
            .await
            .map_err(|e| Self::unreachable("GET", endpoint, e))?;
        let status = response.status();
        let text = self
            .github
            .body_to_string(response)
            .await
            .map_err(|e| Self::unreachable("GET", endpoint, e))?;
        Self::decode("GET", endpoint, status, &text)
    }

    pub async fn post<B>(&self, endpoint: &str, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        tracing::debug!(endpoint, "POST");
        let response = self
            .github
            ._post(endpoint, Some(body))
            .await
            .map_err(|e| Self::unreachable("POST", endpoint, e))?;
        let status = response.status();
        let text = self
            .github
            .body_to_string(response)
            .await
            .map_err(|e| Self::unreachable("POST", endpoint, e))?;
        Self::decode("POST", endpoint, status, &text)
    }

    fn decode(method: &str, endpoint: &str, status: StatusCode, text: &str) -> Result<Value> {
        if !status.is_success() {
            let err = EasyGithubError::upstream(endpoint, status.as_u16(), text);
            tracing::warn!(method, endpoint, error = %err, "GitHub API request failed");
            return Err(err);
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(text).map_err(|e| {
            tracing::warn!(method, endpoint, error = %e, "GitHub API returned invalid JSON");
            EasyGithubError::Upstream {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message: format!("response body is not valid JSON ({e})"),
            }
        })
    }

    fn unreachable(method: &str, endpoint: &str, err: octocrab::Error) -> EasyGithubError {
        let err = EasyGithubError::transport(endpoint, err);
        tracing::warn!(method, endpoint, error = %err, "GitHub API request failed");
        err
    }
}

/// Append `query` to `endpoint` as a URL-encoded query string. The query must
/// serialize to a flat map; `null` values are left out.
fn with_query<Q>(endpoint: &str, query: Option<&Q>) -> Result<String>
where
    Q: Serialize + ?Sized,
{
    let Some(query) = query else {
        return Ok(endpoint.to_string());
    };
    let params = match serde_json::to_value(query) {
        Ok(Value::Object(params)) => params,
        Ok(Value::Null) => return Ok(endpoint.to_string()),
        Ok(_) => {
            return Err(EasyGithubError::Format(
                "query parameters must be a map".to_string(),
            ))
        }
        Err(e) => {
            return Err(EasyGithubError::Format(format!(
                "query parameters could not be encoded: {e}"
            )))
        }
    };

    let mut encoder = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in &params {
        match value {
            Value::Null => {}
            Value::String(s) => {
                encoder.append_pair(key, s);
            }
            other => {
                encoder.append_pair(key, &other.to_string());
            }
        }
    }
    let encoded = encoder.finish();
    if encoded.is_empty() {
        Ok(endpoint.to_string())
    } else {
        Ok(format!("{endpoint}?{encoded}"))
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}
