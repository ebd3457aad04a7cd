//! forge::github
//!
//! GitHub host implementation using the REST Git Data API.
//!
//! # Design
//!
//! This module implements the `GitHost` trait for GitHub. Every object is
//! created through the Git Data endpoints (`git/blobs`, `git/trees`,
//! `git/commits`, `git/refs`); repository creation and Pages enablement use
//! the repository endpoints.
//!
//! # Authentication
//!
//! Tokens come from a [`TokenProvider`] on every request. If a 401 or 403
//! comes back and the provider is refreshable, the request is retried once
//! with a freshly read token.
//!
//! # Rate Limiting
//!
//! - Returns `ForgeError::RateLimited` when limits are hit
//! - Does not retry (the caller re-runs the whole sync)
//!
//! # Example
//!
//! ```ignore
//! use regsync::forge::github::GitHubHost;
//! use regsync::forge::{GitHost, RepoId};
//! use std::time::Duration;
//!
//! let host = GitHubHost::new_with_provider(provider, "https://api.github.com", Duration::from_secs(30))?;
//! let repo = RepoId::new("octocat", "ui-registry");
//! let head = host.get_ref(&repo, &"main".parse()?).await?;
//! ```
//!
//! [`TokenProvider`]: crate::auth::TokenProvider

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{
    CommitInfo, CreateCommitRequest, CreateRepoRequest, CreateTreeRequest, FileMode, ForgeError,
    GitHost, HostCapabilities, HostingInfo, RepoId, RepoInfo, TreeEntry, TreeListing, Visibility,
};
use crate::auth::TokenProvider;
use crate::core::types::{BranchName, ObjectId, RepoPath};

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "regsync";

/// GitHub host implementation.
pub struct GitHubHost {
    /// HTTP client for making requests
    client: Client,
    /// Token source, consulted on every request
    token_provider: Arc<dyn TokenProvider>,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
    /// Per-request timeout
    timeout: Duration,
}

impl std::fmt::Debug for GitHubHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubHost")
            .field("host", &self.token_provider.host())
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GitHubHost {
    /// Create a GitHub host.
    ///
    /// # Arguments
    ///
    /// * `provider` - Token provider
    /// * `api_base` - API base URL (e.g., `https://github.example.com/api/v3`)
    /// * `timeout` - Applied to every request
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::NetworkError` if the HTTP client cannot be built.
    pub fn new_with_provider(
        provider: Arc<dyn TokenProvider>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ForgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            token_provider: provider,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    async fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let token = self
            .token_provider
            .bearer_token()
            .await
            .map_err(|e| match e {
                crate::auth::AuthError::NotAuthenticated(_) => ForgeError::AuthRequired,
                other => ForgeError::AuthFailed(other.to_string()),
            })?;
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, repo: &RepoId, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, repo.owner, repo.name, path
        )
    }

    /// Send a request, retrying once on an auth failure if the token
    /// provider can hand out a different token.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, ForgeError> {
        let result = self.send_once(method.clone(), url, body).await;
        match result {
            Err(ForgeError::AuthFailed(_)) if self.token_provider.refreshable() => {
                debug!(%method, url, "auth failed, retrying with fresh token");
                self.send_once(method, url, body).await
            }
            other => other,
        }
    }

    async fn send_once<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, ForgeError> {
        debug!(%method, url, "github request");
        let mut request = self
            .client
            .request(method, url)
            .headers(self.headers().await?)
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(self.error_from_response(response, status).await)
        }
    }

    /// Send a request and decode the JSON response.
    async fn call<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T, ForgeError> {
        let response = self.execute(method, url, body).await?;
        let status = response.status();
        response.json().await.map_err(|e| ForgeError::ApiError {
            status: status.as_u16(),
            message: format!("Failed to parse response: {}", e),
        })
    }

    /// Map an error response from the API.
    async fn error_from_response(&self, response: Response, status: StatusCode) -> ForgeError {
        // GitHub Apps use X-Accepted-GitHub-Permissions, classic tokens X-Accepted-OAuth-Scopes.
        let required = response
            .headers()
            .get("X-Accepted-GitHub-Permissions")
            .or_else(|| response.headers().get("X-Accepted-OAuth-Scopes"))
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.full_message(),
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limited => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => {
                let mut err_msg = format!("Permission denied: {}", message);
                if let Some(required) = required {
                    err_msg.push_str(&format!(" [required: {}]", required));
                }
                ForgeError::AuthFailed(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Parse an object id returned by the API.
fn parse_oid(sha: &str) -> Result<ObjectId, ForgeError> {
    ObjectId::new(sha).map_err(|e| ForgeError::ApiError {
        status: 200,
        message: format!("unexpected object id in response: {}", e),
    })
}

fn is_unprocessable(err: &ForgeError, needle: &str) -> bool {
    matches!(
        err,
        ForgeError::ApiError { status: 422, message }
            if message.to_ascii_lowercase().contains(needle)
    )
}

#[async_trait]
impl GitHost for GitHubHost {
    fn name(&self) -> &'static str {
        "github"
    }

    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities {
            base_tree: true,
            conditional_ref_update: true,
        }
    }

    async fn create_blob(&self, repo: &RepoId, content: &str) -> Result<ObjectId, ForgeError> {
        let url = self.repo_url(repo, "git/blobs");
        let body = CreateBlobBody {
            content,
            encoding: "utf-8",
        };
        let created: GitHubSha = self.call(Method::POST, &url, Some(&body)).await?;
        parse_oid(&created.sha)
    }

    async fn get_commit(&self, repo: &RepoId, sha: &ObjectId) -> Result<CommitInfo, ForgeError> {
        let url = self.repo_url(repo, &format!("git/commits/{}", sha));
        let commit: GitHubCommit = self.call::<_, ()>(Method::GET, &url, None).await?;
        Ok(CommitInfo {
            sha: parse_oid(&commit.sha)?,
            tree: parse_oid(&commit.tree.sha)?,
            parents: commit
                .parents
                .iter()
                .map(|p| parse_oid(&p.sha))
                .collect::<Result<_, _>>()?,
        })
    }

    async fn get_tree(&self, repo: &RepoId, sha: &ObjectId) -> Result<TreeListing, ForgeError> {
        let url = self.repo_url(repo, &format!("git/trees/{}?recursive=1", sha));
        let tree: GitHubTree = self.call::<_, ()>(Method::GET, &url, None).await?;

        let mut entries = Vec::new();
        for item in tree.tree {
            // Directories are implied by paths; submodules are not ours to rewrite.
            if item.kind != "blob" {
                continue;
            }
            let Some(mode) = FileMode::parse(&item.mode) else {
                continue;
            };
            let path = RepoPath::new(&item.path).map_err(|e| ForgeError::ApiError {
                status: 200,
                message: format!("unexpected path in tree: {}", e),
            })?;
            let sha = item.sha.as_deref().map(parse_oid).transpose()?;
            entries.push(TreeEntry { path, mode, sha });
        }

        Ok(TreeListing {
            entries,
            truncated: tree.truncated,
        })
    }

    async fn create_tree(
        &self,
        repo: &RepoId,
        request: CreateTreeRequest,
    ) -> Result<ObjectId, ForgeError> {
        let url = self.repo_url(repo, "git/trees");
        let body = CreateTreeBody {
            base_tree: request.base_tree.as_ref().map(|t| t.as_str()),
            tree: request
                .entries
                .iter()
                .map(|e| CreateTreeEntry {
                    path: e.path.as_str(),
                    mode: e.mode.as_str(),
                    kind: "blob",
                    sha: e.sha.as_ref().map(|s| s.as_str()),
                })
                .collect(),
        };
        let created: GitHubSha = self.call(Method::POST, &url, Some(&body)).await?;
        parse_oid(&created.sha)
    }

    async fn create_commit(
        &self,
        repo: &RepoId,
        request: CreateCommitRequest,
    ) -> Result<ObjectId, ForgeError> {
        let url = self.repo_url(repo, "git/commits");
        let body = CreateCommitBody {
            message: &request.message,
            tree: request.tree.as_str(),
            parents: request.parents.iter().map(|p| p.as_str()).collect(),
        };
        let created: GitHubSha = self.call(Method::POST, &url, Some(&body)).await?;
        parse_oid(&created.sha)
    }

    async fn get_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
    ) -> Result<Option<ObjectId>, ForgeError> {
        let url = self.repo_url(repo, &format!("git/ref/heads/{}", branch));
        match self.call::<GitHubRef, ()>(Method::GET, &url, None).await {
            Ok(reference) => Ok(Some(parse_oid(&reference.object.sha)?)),
            Err(ForgeError::NotFound(_)) => Ok(None),
            // "Git Repository is empty."
            Err(ForgeError::ApiError { status: 409, .. }) => {
                Err(ForgeError::EmptyRepository(repo.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn create_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        sha: &ObjectId,
    ) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, "git/refs");
        let qualified = branch.qualified();
        let body = CreateRefBody {
            reference: &qualified,
            sha: sha.as_str(),
        };
        match self.call::<GitHubRef, _>(Method::POST, &url, Some(&body)).await {
            Ok(_) => Ok(()),
            Err(e) if is_unprocessable(&e, "already exists") => {
                Err(ForgeError::RefConflict(format!("{} already exists", qualified)))
            }
            Err(e) => Err(e),
        }
    }

    async fn update_ref(
        &self,
        repo: &RepoId,
        branch: &BranchName,
        sha: &ObjectId,
        force: bool,
    ) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, &format!("git/refs/heads/{}", branch));
        let body = UpdateRefBody {
            sha: sha.as_str(),
            force,
        };
        match self.call::<GitHubRef, _>(Method::PATCH, &url, Some(&body)).await {
            Ok(_) => Ok(()),
            Err(e) if is_unprocessable(&e, "fast forward") => Err(ForgeError::RefConflict(
                format!("{} is not a fast forward of {}", sha.short(7), branch),
            )),
            Err(e) => Err(e),
        }
    }

    async fn create_repository(&self, request: CreateRepoRequest) -> Result<RepoInfo, ForgeError> {
        let url = match &request.org {
            Some(org) => format!("{}/orgs/{}/repos", self.api_base, org),
            None => format!("{}/user/repos", self.api_base),
        };
        let body = CreateRepoBody {
            name: &request.name,
            description: request.description.as_deref(),
            private: request.visibility == Visibility::Private,
            auto_init: request.auto_init,
        };
        match self.call::<GitHubRepo, _>(Method::POST, &url, Some(&body)).await {
            Ok(repo) => Ok(RepoInfo {
                id: RepoId::new(repo.owner.login, repo.name),
                html_url: repo.html_url,
                default_branch: repo.default_branch,
            }),
            Err(e) if is_unprocessable(&e, "already exists") => {
                Err(ForgeError::NameCollision(request.name))
            }
            Err(e) => Err(e),
        }
    }

    async fn enable_static_hosting(
        &self,
        repo: &RepoId,
        branch: &BranchName,
    ) -> Result<HostingInfo, ForgeError> {
        let url = self.repo_url(repo, "pages");
        let body = CreatePagesBody {
            build_type: "workflow",
            source: PagesSource {
                branch: branch.as_str(),
                path: "/",
            },
        };
        let created = match self.call::<GitHubPages, _>(Method::POST, &url, Some(&body)).await {
            Ok(pages) => pages.html_url,
            // Already enabled
            Err(ForgeError::ApiError { status: 409, .. }) => None,
            Err(e) => return Err(e),
        };

        match created {
            Some(url) => Ok(HostingInfo { url }),
            None => self.get_static_hosting(repo).await?.ok_or_else(|| {
                ForgeError::NotFound(format!("pages site for {} has no URL yet", repo))
            }),
        }
    }

    async fn get_static_hosting(&self, repo: &RepoId) -> Result<Option<HostingInfo>, ForgeError> {
        let url = self.repo_url(repo, "pages");
        match self.call::<GitHubPages, ()>(Method::GET, &url, None).await {
            Ok(pages) => Ok(pages.html_url.map(|url| HostingInfo { url })),
            Err(ForgeError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// =============================================================================
// GitHub API request/response types
// =============================================================================

#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'a str,
}

#[derive(Serialize)]
struct CreateTreeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_tree: Option<&'a str>,
    tree: Vec<CreateTreeEntry<'a>>,
}

#[derive(Serialize)]
struct CreateTreeEntry<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    /// `null` removes the path from the base tree
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    reference: &'a str,
    sha: &'a str,
}

#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

#[derive(Serialize)]
struct CreateRepoBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    private: bool,
    auto_init: bool,
}

#[derive(Serialize)]
struct CreatePagesBody<'a> {
    build_type: &'a str,
    source: PagesSource<'a>,
}

#[derive(Serialize)]
struct PagesSource<'a> {
    branch: &'a str,
    path: &'a str,
}

#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
    #[serde(default)]
    errors: Vec<GitHubErrorDetail>,
}

impl GitHubErrorResponse {
    /// Top-level message plus any per-field details.
    fn full_message(self) -> String {
        let details: Vec<String> = self
            .errors
            .into_iter()
            .filter_map(|d| d.message.or(d.code))
            .collect();
        if details.is_empty() {
            self.message
        } else {
            format!("{} ({})", self.message, details.join("; "))
        }
    }
}

#[derive(Deserialize)]
struct GitHubErrorDetail {
    message: Option<String>,
    code: Option<String>,
}

#[derive(Deserialize)]
struct GitHubSha {
    sha: String,
}

#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    tree: GitHubSha,
    #[serde(default)]
    parents: Vec<GitHubSha>,
}

#[derive(Deserialize)]
struct GitHubTree {
    tree: Vec<GitHubTreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct GitHubTreeItem {
    path: String,
    mode: String,
    #[serde(rename = "type")]
    kind: String,
    sha: Option<String>,
}

#[derive(Deserialize)]
struct GitHubRef {
    object: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubRepo {
    name: String,
    owner: GitHubOwner,
    html_url: String,
    default_branch: String,
}

#[derive(Deserialize)]
struct GitHubOwner {
    login: String,
}

#[derive(Deserialize)]
struct GitHubPages {
    html_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;

    fn host() -> GitHubHost {
        let provider: Arc<dyn TokenProvider> =
            Arc::new(StaticTokenProvider::new("github.com", "secret_token_abc123"));
        GitHubHost::new_with_provider(provider, "https://api.github.com/", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn trims_trailing_slash_from_api_base() {
        assert_eq!(host().api_base(), "https://api.github.com");
    }

    #[test]
    fn repo_url_format() {
        let repo = RepoId::new("octocat", "ui");
        assert_eq!(
            host().repo_url(&repo, "git/blobs"),
            "https://api.github.com/repos/octocat/ui/git/blobs"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let debug_output = format!("{:?}", host());
        assert!(!debug_output.contains("secret_token_abc123"));
        assert!(debug_output.contains("api_base"));
    }

    #[test]
    fn reports_full_capabilities() {
        let caps = host().capabilities();
        assert!(caps.base_tree);
        assert!(caps.conditional_ref_update);
    }

    #[test]
    fn tree_entry_removal_serializes_null_sha() {
        let body = CreateTreeBody {
            base_tree: Some("abc"),
            tree: vec![CreateTreeEntry {
                path: "registry/a.tsx",
                mode: "100644",
                kind: "blob",
                sha: None,
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["tree"][0]["sha"].is_null());
        assert_eq!(json["tree"][0]["type"], "blob");
    }

    #[test]
    fn full_tree_omits_base_tree() {
        let body = CreateTreeBody {
            base_tree: None,
            tree: vec![],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("base_tree").is_none());
    }

    #[test]
    fn error_message_includes_details() {
        let err: GitHubErrorResponse = serde_json::from_str(
            r#"{"message":"Repository creation failed.","errors":[{"resource":"Repository","code":"custom","field":"name","message":"name already exists on this account"}]}"#,
        )
        .unwrap();
        assert_eq!(
            err.full_message(),
            "Repository creation failed. (name already exists on this account)"
        );
    }

    #[test]
    fn unprocessable_matching_is_case_insensitive() {
        let err = ForgeError::ApiError {
            status: 422,
            message: "Update is not a fast forward".into(),
        };
        assert!(is_unprocessable(&err, "fast forward"));
        assert!(!is_unprocessable(&err, "already exists"));
        assert!(!is_unprocessable(&ForgeError::RateLimited, "fast forward"));
    }
}
