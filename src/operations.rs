use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::client::GitHubClient;
use crate::error::{EasyGithubError, Result};
use crate::shaper::{shape, shape_value, Projection};

pub const DEFAULT_TOP: usize = 10;
pub const DEFAULT_STARS: u64 = 0;
pub const DEFAULT_REPOS_PER_PAGE: u32 = 200;
pub const DEFAULT_PER_PAGE: u32 = 30;

/// The `/search/{type}` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Repositories,
    Issues,
    Code,
    Users,
    Topics,
    Commits,
}

impl SearchType {
    pub const ALL: [SearchType; 6] = [
        SearchType::Repositories,
        SearchType::Issues,
        SearchType::Code,
        SearchType::Users,
        SearchType::Topics,
        SearchType::Commits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Repositories => "repositories",
            SearchType::Issues => "issues",
            SearchType::Code => "code",
            SearchType::Users => "users",
            SearchType::Topics => "topics",
            SearchType::Commits => "commits",
        }
    }

    fn allowed() -> String {
        Self::ALL
            .iter()
            .map(SearchType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = EasyGithubError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                EasyGithubError::Format(format!(
                    "Invalid search type '{}'. Allowed types: {}.",
                    wanted,
                    Self::allowed()
                ))
            })
    }
}

/// `state` filter for issue and pull request listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Open,
    Closed,
    All,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Open => "open",
            ItemState::Closed => "closed",
            ItemState::All => "all",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemState {
    type Err = EasyGithubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "open" => Ok(ItemState::Open),
            "closed" => Ok(ItemState::Closed),
            "all" => Ok(ItemState::All),
            other => Err(EasyGithubError::Format(format!(
                "Invalid state '{other}'. Allowed states: open, closed, all."
            ))),
        }
    }
}

#[derive(Serialize)]
struct PageQuery {
    page: u32,
    per_page: u32,
}

#[derive(Serialize)]
struct StateQuery {
    state: ItemState,
    per_page: u32,
}

#[derive(Serialize)]
struct SearchQuery<'a> {
    q: &'a str,
    per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<&'a str>,
}

#[derive(Serialize)]
struct NewIssue<'a> {
    title: &'a str,
    body: &'a str,
}

/// Strip whitespace and surrounding quotes from a user-supplied identifier.
///
/// Models frequently pass names like `"octocat"` or `'octocat'` verbatim.
pub fn strip_identifier(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'')
}

/// Validate that a GitHub owner/repo name doesn't contain characters that
/// could be used for URL injection in raw API routes.
fn sanitize_github_name(name: &str, field: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EasyGithubError::InvalidParam(format!(
            "{} must not be empty",
            field
        )));
    }
    for ch in ['/', '?', '#', '%', '\0', ' ', '\n', '\t'] {
        if name.contains(ch) {
            return Err(EasyGithubError::InvalidParam(format!(
                "{} contains invalid character {:?}",
                field, ch
            )));
        }
    }
    Ok(())
}

/// Strip, then validate, an identifier destined for a URL path segment.
pub fn sanitize_identifier(raw: &str, field: &str) -> Result<String> {
    let name = strip_identifier(raw);
    sanitize_github_name(name, field)?;
    Ok(name.to_string())
}

/// Wrap a payload in the sentence the model reads before it.
fn present(preamble: &str, payload: &Value) -> String {
    let json = serde_json::to_string(payload).unwrap_or_else(|_| "null".to_string());
    format!("\n{preamble}\n\n{json}\n")
}

fn expect_list<'a>(payload: &'a Value, what: &'static str, target: &str) -> Result<&'a [Value]> {
    payload
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| EasyGithubError::UnexpectedPayload {
            what,
            target: target.to_string(),
        })
}

fn expect_object(payload: &Value, what: &'static str, target: &str) -> Result<()> {
    if payload.is_object() {
        Ok(())
    } else {
        Err(EasyGithubError::UnexpectedPayload {
            what,
            target: target.to_string(),
        })
    }
}

/// The operations exposed to the model, each returning presentable text.
#[derive(Debug, Clone)]
pub struct GitHubTools {
    client: GitHubClient,
}

impl GitHubTools {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    /// Public repositories of `username`, most-starred first.
    pub async fn list_repos(
        &self,
        username: &str,
        top: usize,
        stars: u64,
        per_page: u32,
        include_description: bool,
    ) -> Result<String> {
        let username = sanitize_identifier(username, "username")?;
        let endpoint = format!("/users/{username}/repos");
        let payload = self
            .client
            .get(&endpoint, Some(&PageQuery { page: 1, per_page }))
            .await?;

        let records = expect_list(&payload, "repositories", &username)?;
        if records.is_empty() {
            return Err(EasyGithubError::NoResults {
                what: "repositories",
                target: username,
            });
        }

        let projection = if include_description {
            Projection::REPO_LISTING_DESCRIBED
        } else {
            Projection::REPO_LISTING
        };
        let repos = shape(records, stars, top, &projection);
        if repos.is_empty() && top > 0 {
            return Err(EasyGithubError::NoResultsAboveThreshold {
                what: "repositories",
                target: username,
                stars,
            });
        }

        tracing::debug!(
            username = %username,
            fetched = records.len(),
            kept = repos.len(),
            "Shaped repositories"
        );
        let preamble = format!("Show a list of the top {} results:", repos.len());
        Ok(present(&preamble, &Value::Array(repos)))
    }

    pub async fn get_user(&self, username: &str) -> Result<String> {
        let username = sanitize_identifier(username, "username")?;
        let endpoint = format!("/users/{username}");
        let payload = self.client.get(&endpoint, None::<&()>).await?;
        expect_object(&payload, "user details", &username)?;

        let preamble = format!("Here are the details for GitHub user {username}:");
        Ok(present(&preamble, &Projection::USER_PROFILE.apply(&payload)))
    }

    pub async fn get_repo(&self, owner: &str, repo: &str) -> Result<String> {
        let owner = sanitize_identifier(owner, "owner")?;
        let repo = sanitize_identifier(repo, "repo")?;
        let full_name = format!("{owner}/{repo}");
        let payload = self
            .client
            .get(&format!("/repos/{full_name}"), None::<&()>)
            .await?;
        expect_object(&payload, "repository details", &full_name)?;

        let preamble = format!("Here are the details for repository {full_name}:");
        Ok(present(&preamble, &Projection::REPO_DETAILS.apply(&payload)))
    }

    pub async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        per_page: u32,
    ) -> Result<String> {
        self.list_repo_items(owner, repo, state, per_page, RepoItems::Issues)
            .await
    }

    pub async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        per_page: u32,
    ) -> Result<String> {
        self.list_repo_items(owner, repo, state, per_page, RepoItems::Pulls)
            .await
    }

    async fn list_repo_items(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        per_page: u32,
        kind: RepoItems,
    ) -> Result<String> {
        let state: ItemState = state.parse()?;
        let owner = sanitize_identifier(owner, "owner")?;
        let repo = sanitize_identifier(repo, "repo")?;
        let full_name = format!("{owner}/{repo}");
        let endpoint = format!("/repos/{full_name}/{}", kind.path());
        let payload = self
            .client
            .get(&endpoint, Some(&StateQuery { state, per_page }))
            .await?;

        let records = expect_list(&payload, kind.label(), &full_name)?;
        if records.is_empty() {
            return Err(EasyGithubError::NoResults {
                what: kind.label(),
                target: format!("{full_name} (state: {state})"),
            });
        }

        let items: Vec<Value> = records.iter().map(|r| kind.projection().apply(r)).collect();
        let preamble = format!(
            "Show a list of {} {} ({}) in {}:",
            items.len(),
            kind.label(),
            state,
            full_name
        );
        Ok(present(&preamble, &Value::Array(items)))
    }

    /// Open an issue. Requires a configured token; without one nothing is sent.
    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> Result<String> {
        if !self.client.has_token() {
            return Err(EasyGithubError::AuthRequired("create an issue"));
        }
        let owner = sanitize_identifier(owner, "owner")?;
        let repo = sanitize_identifier(repo, "repo")?;
        let title = title.trim();
        if title.is_empty() {
            return Err(EasyGithubError::InvalidParam(
                "title must not be empty".to_string(),
            ));
        }

        let full_name = format!("{owner}/{repo}");
        let created = self
            .client
            .post(&format!("/repos/{full_name}/issues"), &NewIssue { title, body })
            .await?;
        let number = created
            .get("number")
            .and_then(Value::as_u64)
            .ok_or_else(|| EasyGithubError::UnexpectedPayload {
                what: "the created issue",
                target: full_name.clone(),
            })?;

        tracing::info!(repo = %full_name, number, "Created issue");
        let preamble = format!("Created issue #{number} in {full_name}:");
        Ok(present(&preamble, &Projection::CREATED_ISSUE.apply(&created)))
    }

    /// Search one of GitHub's search indexes and rank hits by stars.
    #[allow(clippy::too_many_arguments)]
    pub async fn search_github(
        &self,
        search_type: &str,
        query: &str,
        top: usize,
        stars: u64,
        per_page: u32,
        sort: Option<&str>,
        order: Option<&str>,
    ) -> Result<String> {
        let search_type: SearchType = search_type.parse()?;
        let q = query.trim();
        if q.is_empty() {
            return Err(EasyGithubError::InvalidParam(
                "query must not be empty".to_string(),
            ));
        }

        let endpoint = format!("/search/{search_type}");
        let params = SearchQuery {
            q,
            per_page,
            sort: sort.map(str::trim).filter(|s| !s.is_empty()),
            order: order.map(str::trim).filter(|s| !s.is_empty()),
        };
        let payload = self.client.get(&endpoint, Some(&params)).await?;

        let target = format!("'{q}' in {search_type}");
        let hits = match payload.get("items") {
            Some(items) => shape_value(items, stars, top, &Projection::SEARCH_HIT),
            None => Ok(Vec::new()),
        }
        .map_err(|_| EasyGithubError::UnexpectedPayload {
            what: "search results",
            target: target.clone(),
        })?;
        let fetched = payload
            .get("items")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if fetched == 0 {
            return Err(EasyGithubError::NoResults {
                what: "results",
                target,
            });
        }
        if hits.is_empty() && top > 0 {
            return Err(EasyGithubError::NoResultsAboveThreshold {
                what: "results",
                target,
                stars,
            });
        }

        let total = payload
            .get("total_count")
            .and_then(Value::as_u64)
            .unwrap_or(hits.len() as u64);
        let preamble = format!(
            "Found {total} results for {target}. Show a list of the top {} results:",
            hits.len()
        );
        Ok(present(&preamble, &Value::Array(hits)))
    }
}

#[derive(Debug, Clone, Copy)]
enum RepoItems {
    Issues,
    Pulls,
}

impl RepoItems {
    fn path(self) -> &'static str {
        match self {
            RepoItems::Issues => "issues",
            RepoItems::Pulls => "pulls",
        }
    }

    fn label(self) -> &'static str {
        match self {
            RepoItems::Issues => "issues",
            RepoItems::Pulls => "pull requests",
        }
    }

    fn projection(self) -> Projection {
        match self {
            RepoItems::Issues => Projection::ISSUE,
            RepoItems::Pulls => Projection::PULL_REQUEST,
        }
    }
}
