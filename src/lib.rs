//! GitHub MCP server backed by a pool of rate-limited tokens
//!
//! This library provides Model Context Protocol (MCP) tools for reading GitHub:
//! - latest release of a repository
//! - file content or directory listings
//! - repository listings for organizations and users
//! - quota status of the token pool
//!
//! ## Token Pool
//!
//! Several personal access tokens can be configured at once. The pool keeps
//! using one token until it is close to its limit, then moves on to the next
//! one with quota left. When every token is exhausted the call waits for the
//! earliest reset instead of failing.
//!
//! ```bash
//! # Comma-separated list (optional)
//! export GITHUB_TOKENS=ghp_first,ghp_second
//! ```
//!
//! ### GitHub Tokens (`GITHUB_TOKENS`)
//!
//! - **Purpose**: Authenticates requests to the GitHub API
//! - **Requirement**: Optional, unless the binary is started with `--require-tokens`
//! - **Rate Limits**:
//!   - Without tokens: 60 requests/hour (unauthenticated)
//!   - With tokens: 5,000 requests/hour per token
//! - **Private Repositories**: Requires tokens with `repo` scope
//!
//! A `.env` file in the current directory or one of its parents (up to the
//! project root) is read at startup; variables already set in the environment
//! take precedence.
//!
//! ## Usage
//!
//! This library can be used in several ways:
//! - As an MCP server (HTTP/SSE mode)
//! - As an MCP server (STDIN/STDOUT mode)
//! - From the `github-pool-cli` terminal client
//! - Directly as a Rust library through [`github::RepositoryManager`]

pub mod config;
pub mod github;
pub mod tools;
pub mod transport;
