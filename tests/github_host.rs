//! GitHub REST mapping tests.
//!
//! Each test stands up a wiremock server playing the GitHub API and checks
//! the request the host sends and how the response is mapped.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use regsync::auth::StaticTokenProvider;
use regsync::core::types::{BranchName, ObjectId, RepoPath};
use regsync::forge::github::GitHubHost;
use regsync::forge::{
    CreateRepoRequest, CreateTreeRequest, ForgeError, GitHost, RepoId, TreeEntry, Visibility,
};

const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const SHA_C: &str = "cccccccccccccccccccccccccccccccccccccccc";

// =============================================================================
// Test Fixtures
// =============================================================================

async fn setup() -> (MockServer, GitHubHost) {
    let server = MockServer::start().await;
    let provider = Arc::new(StaticTokenProvider::new("github.com", "test-token"));
    let host = GitHubHost::new_with_provider(provider, server.uri(), Duration::from_secs(5))
        .expect("client should build");
    (server, host)
}

fn repo() -> RepoId {
    RepoId::new("acme", "ui")
}

fn main_branch() -> BranchName {
    BranchName::new("main").unwrap()
}

fn oid(sha: &str) -> ObjectId {
    ObjectId::new(sha).unwrap()
}

fn unprocessable(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(422).set_body_json(json!({ "message": message }))
}

// =============================================================================
// Git objects
// =============================================================================

#[tokio::test]
async fn create_blob_posts_utf8_content() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ui/git/blobs"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({ "content": "hello", "encoding": "utf-8" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": SHA_A })))
        .expect(1)
        .mount(&server)
        .await;

    let sha = host.create_blob(&repo(), "hello").await.unwrap();
    assert_eq!(sha, oid(SHA_A));
}

#[tokio::test]
async fn create_tree_sends_base_tree_and_null_removals() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ui/git/trees"))
        .and(body_json(json!({
            "base_tree": SHA_A,
            "tree": [
                { "path": "src/a.ts", "mode": "100644", "type": "blob", "sha": SHA_B },
                { "path": "old.ts", "mode": "100644", "type": "blob", "sha": null },
            ]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "sha": SHA_C })))
        .expect(1)
        .mount(&server)
        .await;

    let request = CreateTreeRequest {
        base_tree: Some(oid(SHA_A)),
        entries: vec![
            TreeEntry::blob(RepoPath::new("src/a.ts").unwrap(), oid(SHA_B)),
            TreeEntry::removal(RepoPath::new("old.ts").unwrap()),
        ],
    };
    let sha = host.create_tree(&repo(), request).await.unwrap();
    assert_eq!(sha, oid(SHA_C));
}

#[tokio::test]
async fn get_tree_skips_directories_and_reports_truncation() {
    let (server, host) = setup().await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/acme/ui/git/trees/{SHA_A}")))
        .and(query_param("recursive", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": SHA_A,
            "truncated": true,
            "tree": [
                { "path": "src", "mode": "040000", "type": "tree", "sha": SHA_B },
                { "path": "src/a.ts", "mode": "100644", "type": "blob", "sha": SHA_C },
            ]
        })))
        .mount(&server)
        .await;

    let listing = host.get_tree(&repo(), &oid(SHA_A)).await.unwrap();
    assert!(listing.truncated);
    assert_eq!(listing.entries.len(), 1);
    assert_eq!(listing.entries[0].path.as_str(), "src/a.ts");
    assert_eq!(listing.entries[0].sha, Some(oid(SHA_C)));
}

#[tokio::test]
async fn get_commit_reads_tree_and_parents() {
    let (server, host) = setup().await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/acme/ui/git/commits/{SHA_A}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sha": SHA_A,
            "tree": { "sha": SHA_B },
            "parents": [{ "sha": SHA_C }],
            "message": "Update registry"
        })))
        .mount(&server)
        .await;

    let commit = host.get_commit(&repo(), &oid(SHA_A)).await.unwrap();
    assert_eq!(commit.tree, oid(SHA_B));
    assert_eq!(commit.parents, vec![oid(SHA_C)]);
}

// =============================================================================
// Refs
// =============================================================================

#[tokio::test]
async fn missing_ref_is_none() {
    let (server, host) = setup().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/ui/git/ref/heads/main"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    assert_eq!(host.get_ref(&repo(), &main_branch()).await.unwrap(), None);
}

#[tokio::test]
async fn ref_in_empty_repository_is_distinguished() {
    let (server, host) = setup().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/ui/git/ref/heads/main"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "Git Repository is empty." })),
        )
        .mount(&server)
        .await;

    let err = host.get_ref(&repo(), &main_branch()).await.unwrap_err();
    assert!(matches!(err, ForgeError::EmptyRepository(ref name) if name == "acme/ui"), "got {err:?}");
}

#[tokio::test]
async fn existing_ref_returns_head() {
    let (server, host) = setup().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/ui/git/ref/heads/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ref": "refs/heads/main",
            "object": { "sha": SHA_A, "type": "commit" }
        })))
        .mount(&server)
        .await;

    assert_eq!(
        host.get_ref(&repo(), &main_branch()).await.unwrap(),
        Some(oid(SHA_A))
    );
}

#[tokio::test]
async fn non_fast_forward_update_is_a_ref_conflict() {
    let (server, host) = setup().await;
    Mock::given(method("PATCH"))
        .and(path("/repos/acme/ui/git/refs/heads/main"))
        .and(body_json(json!({ "sha": SHA_B, "force": false })))
        .respond_with(unprocessable("Update is not a fast forward"))
        .expect(1)
        .mount(&server)
        .await;

    let err = host
        .update_ref(&repo(), &main_branch(), &oid(SHA_B), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::RefConflict(_)), "got {err:?}");
}

#[tokio::test]
async fn create_existing_ref_is_a_ref_conflict() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ui/git/refs"))
        .and(body_json(json!({ "ref": "refs/heads/main", "sha": SHA_A })))
        .respond_with(unprocessable("Reference already exists"))
        .mount(&server)
        .await;

    let err = host
        .create_ref(&repo(), &main_branch(), &oid(SHA_A))
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::RefConflict(_)), "got {err:?}");
}

// =============================================================================
// Error mapping
// =============================================================================

#[tokio::test]
async fn unauthorized_maps_to_auth_failed() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ui/git/blobs"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .mount(&server)
        .await;

    let err = host.create_blob(&repo(), "x").await.unwrap_err();
    assert!(matches!(err, ForgeError::AuthFailed(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn forbidden_with_exhausted_quota_is_rate_limited() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ui/git/blobs"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .set_body_json(json!({ "message": "API rate limit exceeded" })),
        )
        .mount(&server)
        .await;

    let err = host.create_blob(&repo(), "x").await.unwrap_err();
    assert!(matches!(err, ForgeError::RateLimited));
    assert!(err.is_transient());
}

#[tokio::test]
async fn forbidden_reports_required_permission() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ui/git/blobs"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("X-Accepted-GitHub-Permissions", "contents=write")
                .set_body_json(json!({ "message": "Resource not accessible by integration" })),
        )
        .mount(&server)
        .await;

    let err = host.create_blob(&repo(), "x").await.unwrap_err();
    match err {
        ForgeError::AuthFailed(message) => assert!(message.contains("contents=write")),
        other => panic!("expected AuthFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn too_many_requests_is_rate_limited() {
    let (server, host) = setup().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/ui/git/ref/heads/main"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = host.get_ref(&repo(), &main_branch()).await.unwrap_err();
    assert!(matches!(err, ForgeError::RateLimited));
}

#[tokio::test]
async fn server_error_is_transient() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ui/git/commits"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({ "message": "Bad Gateway" })))
        .mount(&server)
        .await;

    let err = host
        .create_commit(
            &repo(),
            regsync::forge::CreateCommitRequest {
                message: "msg".into(),
                tree: oid(SHA_A),
                parents: vec![oid(SHA_B)],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::ApiError { status: 502, .. }));
    assert!(err.is_transient());
}

// =============================================================================
// Repositories and hosting
// =============================================================================

#[tokio::test]
async fn create_repository_under_org() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/orgs/acme/repos"))
        .and(body_json(json!({
            "name": "ui",
            "description": "Acme components",
            "private": false,
            "auto_init": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": "ui",
            "owner": { "login": "acme" },
            "html_url": "https://github.com/acme/ui",
            "default_branch": "main"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = host
        .create_repository(CreateRepoRequest {
            name: "ui".into(),
            org: Some("acme".into()),
            description: Some("Acme components".into()),
            visibility: Visibility::Public,
            auto_init: true,
        })
        .await
        .unwrap();
    assert_eq!(info.id, repo());
    assert_eq!(info.html_url, "https://github.com/acme/ui");
    assert_eq!(info.default_branch, "main");
}

#[tokio::test]
async fn taken_repository_name_is_a_collision() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Repository creation failed.",
            "errors": [{ "resource": "Repository", "code": "custom", "field": "name",
                         "message": "name already exists on this account" }]
        })))
        .mount(&server)
        .await;

    let err = host
        .create_repository(CreateRepoRequest {
            name: "ui".into(),
            org: None,
            description: None,
            visibility: Visibility::Private,
            auto_init: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::NameCollision(name) if name == "ui"));
}

#[tokio::test]
async fn enable_hosting_uses_workflow_build() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ui/pages"))
        .and(body_json(json!({
            "build_type": "workflow",
            "source": { "branch": "main", "path": "/" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "html_url": "https://acme.github.io/ui/"
        })))
        .mount(&server)
        .await;

    let hosting = host
        .enable_static_hosting(&repo(), &main_branch())
        .await
        .unwrap();
    assert_eq!(hosting.url, "https://acme.github.io/ui/");
}

#[tokio::test]
async fn enable_hosting_when_already_enabled_reads_site() {
    let (server, host) = setup().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/ui/pages"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({ "message": "GitHub Pages is already enabled." })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/ui/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "html_url": "https://acme.github.io/ui/",
            "build_type": "workflow"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hosting = host
        .enable_static_hosting(&repo(), &main_branch())
        .await
        .unwrap();
    assert_eq!(hosting.url, "https://acme.github.io/ui/");
}

#[tokio::test]
async fn hosting_disabled_reads_as_none() {
    let (server, host) = setup().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/ui/pages"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    assert_eq!(host.get_static_hosting(&repo()).await.unwrap(), None);
}
