//! MCP server that lets LLMs query GitHub: list and search repositories,
//! inspect users and repos, list issues and pull requests, and file issues.
//!
//! Every tool answers with a short sentence followed by a compact JSON
//! payload. List-like results are filtered by a star threshold, ranked by
//! stars, and truncated (see [`shaper`]).

pub mod client;
pub mod error;
pub mod operations;
pub mod server;
pub mod shaper;
