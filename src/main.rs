use anyhow::Result;
use clap::Parser;
use easy_github::client::{ClientConfig, GitHubClient, DEFAULT_BASE_URL};
use easy_github::operations::GitHubTools;
use easy_github::server;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

/// MCP server for GitHub: lets LLMs list, search, and file repositories, issues, and pull requests
#[derive(Parser)]
#[command(name = "easy-github", version, about)]
struct Cli {
    /// GitHub personal access token.
    /// Can also be set via GITHUB_TOKEN environment variable.
    #[arg(long)]
    token: Option<String>,

    /// Read GitHub token from an environment variable.
    /// Default: GITHUB_TOKEN
    #[arg(long = "token-env")]
    token_env: Option<String>,

    /// GitHub API base URL (for GitHub Enterprise Server)
    #[arg(long = "base-url", default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Resolve token: --token > --token-env > GITHUB_TOKEN
    let token = match cli.token.filter(|t| !t.is_empty()) {
        Some(t) => Some(t),
        None => {
            let env_name = cli.token_env.as_deref().unwrap_or("GITHUB_TOKEN");
            match std::env::var(env_name) {
                Ok(t) if !t.is_empty() => {
                    tracing::info!(env = env_name, "Read GitHub token from environment variable");
                    Some(t)
                }
                _ => None,
            }
        }
    };

    let authenticated = token.is_some();
    if !authenticated {
        tracing::warn!("No GitHub token provided; access is read-only and heavily rate limited");
    }

    let client = GitHubClient::new(ClientConfig {
        base_url: Some(cli.base_url.clone()),
        token,
    })
    .map_err(|e| anyhow::anyhow!("Failed to create GitHub client: {}", e))?;

    tracing::info!(
        authenticated,
        base_url = %cli.base_url,
        "Starting easy-github server"
    );

    let service = server::EasyGithubServer::new(GitHubTools::new(client));
    let running = service.serve(stdio()).await?;
    running.waiting().await?;

    Ok(())
}
