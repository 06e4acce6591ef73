#[derive(Debug, thiserror::Error)]
pub enum EasyGithubError {
    #[error("GitHub API request to {endpoint} failed with status {status}: {message}")]
    Upstream {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("GitHub API request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("Failed to fetch {what} for {target}.")]
    UnexpectedPayload { what: &'static str, target: String },

    #[error("No {what} found for {target}.")]
    NoResults { what: &'static str, target: String },

    #[error("No {what} found for {target} with at least {stars} stars.")]
    NoResultsAboveThreshold {
        what: &'static str,
        target: String,
        stars: u64,
    },

    #[error("Authentication token required to {0}.")]
    AuthRequired(&'static str),

    #[error("{0}")]
    Format(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),
}

impl EasyGithubError {
    /// Build an error for a request that never produced an HTTP response.
    pub fn transport(endpoint: &str, err: octocrab::Error) -> Self {
        EasyGithubError::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }

    /// Build an error from a non-2xx response. GitHub's JSON error bodies are
    /// reduced to their `message` plus any `errors` detail; anything else is
    /// kept as text.
    pub fn upstream(endpoint: &str, status: u16, body: &str) -> Self {
        EasyGithubError::Upstream {
            endpoint: endpoint.to_string(),
            status,
            message: error_body_message(body),
        }
    }

    /// Whether the request was never sent because the input was rejected.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            EasyGithubError::AuthRequired(_)
                | EasyGithubError::Format(_)
                | EasyGithubError::InvalidParam(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EasyGithubError>;

const MAX_BODY_CHARS: usize = 1000;

fn error_body_message(body: &str) -> String {
    let body = body.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(body) {
        if let Some(message) = map.get("message").and_then(|m| m.as_str()) {
            return match map.get("errors") {
                Some(errors) if errors.as_array().is_some_and(|e| !e.is_empty()) => {
                    format!("{message} (errors: {errors})")
                }
                _ => message.to_string(),
            };
        }
    }
    if body.is_empty() {
        return "empty response body".to_string();
    }
    if body.chars().count() > MAX_BODY_CHARS {
        let cut: String = body.chars().take(MAX_BODY_CHARS).collect();
        return format!("{cut}... [truncated]");
    }
    body.to_string()
}
