use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_handler, tool_router, ServerHandler};
use serde::Deserialize;

use crate::error::EasyGithubError;
use crate::operations::{
    GitHubTools, DEFAULT_PER_PAGE, DEFAULT_REPOS_PER_PAGE, DEFAULT_STARS, DEFAULT_TOP,
};

#[derive(Clone)]
pub struct EasyGithubServer {
    tools: GitHubTools,
    tool_router: ToolRouter<Self>,
}

// -- Tool parameter types --

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListReposParams {
    #[schemars(description = "GitHub username whose public repositories to list")]
    pub username: String,

    #[schemars(description = "Number of repositories to return (default: 10)")]
    #[serde(default)]
    pub top: Option<usize>,

    #[schemars(description = "Minimum stars a repository must have to be included (default: 0)")]
    #[serde(default)]
    pub stars: Option<u64>,

    #[schemars(description = "Number of repositories to request from GitHub (default: 200)")]
    #[serde(default)]
    pub per_page: Option<u32>,

    #[schemars(description = "Include each repository's description (default: false)")]
    #[serde(default)]
    pub include_description: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UserParams {
    #[schemars(description = "GitHub username")]
    pub username: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RepoParams {
    #[schemars(description = "Repository owner (user or org)")]
    pub owner: String,

    #[schemars(description = "Repository name")]
    pub repo: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListItemsParams {
    #[schemars(description = "Repository owner (user or org)")]
    pub owner: String,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(description = "Filter by state: open, closed, or all (default: open)")]
    #[serde(default)]
    pub state: Option<String>,

    #[schemars(description = "Maximum number of results (default: 30)")]
    #[serde(default)]
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateIssueParams {
    #[schemars(description = "Repository owner (user or org)")]
    pub owner: String,

    #[schemars(description = "Repository name")]
    pub repo: String,

    #[schemars(description = "Issue title")]
    pub title: String,

    #[schemars(description = "Issue body in Markdown")]
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    #[schemars(
        description = "What to search: repositories, issues, code, users, topics, or commits"
    )]
    pub search_type: String,

    #[schemars(description = "Search query (GitHub search syntax)")]
    pub query: String,

    #[schemars(description = "Number of results to return (default: 10)")]
    #[serde(default)]
    pub top: Option<usize>,

    #[schemars(description = "Minimum stars a hit must have to be included (default: 0)")]
    #[serde(default)]
    pub stars: Option<u64>,

    #[schemars(description = "Number of hits to request from GitHub (default: 30)")]
    #[serde(default)]
    pub per_page: Option<u32>,

    #[schemars(description = "Sort field understood by GitHub for this search type, e.g. stars")]
    #[serde(default)]
    pub sort: Option<String>,

    #[schemars(description = "Sort order: asc or desc")]
    #[serde(default)]
    pub order: Option<String>,
}

impl EasyGithubServer {
    pub fn new(tools: GitHubTools) -> Self {
        Self {
            tools,
            tool_router: Self::tool_router(),
        }
    }
}

/// Collapse an operation outcome into the text handed back to the model.
/// Failures are reported as text too; the caller never sees an MCP error.
fn into_text(tool: &str, outcome: Result<String, EasyGithubError>) -> String {
    match outcome {
        Ok(text) => text,
        Err(e) => {
            if e.is_caller_error() {
                tracing::info!(tool, error = %e, "Rejected tool call");
            } else {
                tracing::debug!(tool, error = %e, "Tool call produced no result");
            }
            e.to_string()
        }
    }
}

fn respond(tool: &str, outcome: Result<String, EasyGithubError>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(into_text(tool, outcome))])
}

// -- MCP tool handlers (thin wrappers around GitHubTools) --

#[tool_router]
impl EasyGithubServer {
    #[tool(
        name = "list_repos",
        description = "List a user's public repositories ordered by stars"
    )]
    async fn list_repos(
        &self,
        Parameters(params): Parameters<ListReposParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outcome = self
            .tools
            .list_repos(
                &params.username,
                params.top.unwrap_or(DEFAULT_TOP),
                params.stars.unwrap_or(DEFAULT_STARS),
                params.per_page.unwrap_or(DEFAULT_REPOS_PER_PAGE),
                params.include_description.unwrap_or(false),
            )
            .await;
        Ok(respond("list_repos", outcome))
    }

    #[tool(
        name = "get_user",
        description = "Get a GitHub user's profile: name, bio, location, followers, and public repo count"
    )]
    async fn get_user(
        &self,
        Parameters(params): Parameters<UserParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outcome = self.tools.get_user(&params.username).await;
        Ok(respond("get_user", outcome))
    }

    #[tool(
        name = "get_repo",
        description = "Get repository info including description, stars, forks, language, and default branch"
    )]
    async fn get_repo(
        &self,
        Parameters(params): Parameters<RepoParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outcome = self.tools.get_repo(&params.owner, &params.repo).await;
        Ok(respond("get_repo", outcome))
    }

    #[tool(
        name = "list_issues",
        description = "List issues in a repository, optionally filtered by state"
    )]
    async fn list_issues(
        &self,
        Parameters(params): Parameters<ListItemsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outcome = self
            .tools
            .list_issues(
                &params.owner,
                &params.repo,
                params.state.as_deref().unwrap_or("open"),
                params.per_page.unwrap_or(DEFAULT_PER_PAGE),
            )
            .await;
        Ok(respond("list_issues", outcome))
    }

    #[tool(
        name = "create_issue",
        description = "Create an issue in a repository (requires a GitHub token)"
    )]
    async fn create_issue(
        &self,
        Parameters(params): Parameters<CreateIssueParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outcome = self
            .tools
            .create_issue(
                &params.owner,
                &params.repo,
                &params.title,
                params.body.as_deref().unwrap_or(""),
            )
            .await;
        Ok(respond("create_issue", outcome))
    }

    #[tool(
        name = "list_pull_requests",
        description = "List pull requests in a repository, optionally filtered by state"
    )]
    async fn list_pull_requests(
        &self,
        Parameters(params): Parameters<ListItemsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outcome = self
            .tools
            .list_pull_requests(
                &params.owner,
                &params.repo,
                params.state.as_deref().unwrap_or("open"),
                params.per_page.unwrap_or(DEFAULT_PER_PAGE),
            )
            .await;
        Ok(respond("list_pull_requests", outcome))
    }

    #[tool(
        name = "search_github",
        description = "Search GitHub repositories, issues, code, users, topics, or commits; hits are ranked by stars"
    )]
    async fn search_github(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let outcome = self
            .tools
            .search_github(
                &params.search_type,
                &params.query,
                params.top.unwrap_or(DEFAULT_TOP),
                params.stars.unwrap_or(DEFAULT_STARS),
                params.per_page.unwrap_or(DEFAULT_PER_PAGE),
                params.sort.as_deref(),
                params.order.as_deref(),
            )
            .await;
        Ok(respond("search_github", outcome))
    }
}

#[tool_handler]
impl ServerHandler for EasyGithubServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "easy-github".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "GitHub server. Use list_repos to see a user's most-starred repositories, \
                 get_user and get_repo for details, list_issues/create_issue for issues, \
                 list_pull_requests for PRs, and search_github to search repositories, \
                 issues, code, users, topics, or commits. Every tool answers with a short \
                 sentence followed by a JSON payload, or with an explanation when nothing \
                 could be returned."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientConfig, GitHubClient};

    fn make_server() -> EasyGithubServer {
        let client = GitHubClient::new(ClientConfig::default()).unwrap();
        EasyGithubServer::new(GitHubTools::new(client))
    }

    // Note: building an Octocrab client requires a Tokio runtime (tower::Buffer),
    // so these tests must be async even though they don't await anything.

    #[tokio::test]
    async fn test_registers_every_tool() {
        let server = make_server();
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "create_issue",
                "get_repo",
                "get_user",
                "list_issues",
                "list_pull_requests",
                "list_repos",
                "search_github",
            ]
        );
    }

    #[tokio::test]
    async fn test_info_mentions_tools() {
        let server = make_server();
        let info = server.get_info();
        assert_eq!(info.server_info.name, "easy-github");
        let instructions = info.instructions.unwrap();
        assert!(instructions.contains("search_github"));
        assert!(instructions.contains("create_issue"));
    }

    #[test]
    fn test_into_text_passes_success_through() {
        let text = into_text("list_repos", Ok("\nShow a list of the top 0 results:\n\n[]\n".into()));
        assert!(text.starts_with("\nShow a list"));
    }

    #[test]
    fn test_into_text_renders_errors() {
        let text = into_text(
            "create_issue",
            Err(EasyGithubError::AuthRequired("create an issue")),
        );
        assert_eq!(text, "Authentication token required to create an issue.");

        let text = into_text(
            "list_repos",
            Err(EasyGithubError::NoResults {
                what: "repositories",
                target: "octocat".to_string(),
            }),
        );
        assert_eq!(text, "No repositories found for octocat.");
    }

    #[test]
    fn test_params_defaults() {
        let params: SearchParams =
            serde_json::from_value(serde_json::json!({"search_type": "users", "query": "tom"}))
                .unwrap();
        assert!(params.top.is_none());
        assert!(params.sort.is_none());

        let params: ListReposParams =
            serde_json::from_value(serde_json::json!({"username": "octocat", "stars": 5}))
                .unwrap();
        assert_eq!(params.stars, Some(5));
        assert!(params.include_description.is_none());
    }
}
