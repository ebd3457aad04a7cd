//! scaffold
//!
//! Generates the complete repository file set for a registry.
//!
//! # Layout
//!
//! ```text
//! registry.json                      index: metadata and file descriptors
//! registry/<item>/<file>             item sources
//! package.json                       registry build script
//! .github/workflows/publish.yml      build and deploy to Pages on push
//! README.md                          install instructions
//! .gitignore
//! ```
//!
//! First export and every later push use the same generator. The output is
//! a pure function of the registry and the binding: no timestamps, ordered
//! maps only, so unchanged input produces identical fingerprints.

mod index;
pub mod workflow;

use thiserror::Error;
use tracing::warn;

use crate::core::types::BranchName;
use crate::registry::{Registry, RegistryError};
use crate::sync::diff::{DesiredFileSet, FileSetError};
use crate::sync::snapshot::RepositoryBinding;

pub use index::{RegistryIndex, REGISTRY_SCHEMA_URL};

/// Index document path.
pub const INDEX_PATH: &str = "registry.json";

/// Errors from generating the file set.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    FileSet(#[from] FileSetError),

    #[error("failed to render {path}: {message}")]
    Render { path: &'static str, message: String },
}

/// Where the registry is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldContext {
    pub repo_url: String,
    pub hosting_url: Option<String>,
    pub default_branch: BranchName,
}

impl ScaffoldContext {
    pub fn from_binding(binding: &RepositoryBinding) -> Self {
        Self {
            repo_url: binding.repo_url.clone(),
            hosting_url: binding.hosting_url.clone(),
            default_branch: binding.default_branch.clone(),
        }
    }

    /// Base URL the built registry is served from, without trailing `/`.
    fn public_base(&self) -> &str {
        match &self.hosting_url {
            Some(url) => url.trim_end_matches('/'),
            None => {
                warn!(repo = %self.repo_url, "no hosting URL yet; using the repository URL");
                self.repo_url.trim_end_matches('/')
            }
        }
    }
}

/// Produce every file of the published repository.
///
/// # Errors
///
/// Fails on invalid registries, colliding paths, or serialization errors.
pub fn generate(
    registry: &Registry,
    context: &ScaffoldContext,
) -> Result<DesiredFileSet, ScaffoldError> {
    registry.validate()?;
    let base = context.public_base();
    let homepage = registry.homepage.as_deref().unwrap_or(base);

    let mut files = DesiredFileSet::new();

    let index = RegistryIndex::new(registry, homepage)?;
    files.insert_str(INDEX_PATH, to_json(INDEX_PATH, &index)?)?;

    for item in &registry.items {
        let dir = item.dir()?;
        for file in &item.files {
            files.insert(index::file_path(&dir, &file.path)?, file.content.clone())?;
        }
    }

    let manifest = index::PackageManifest::new(registry);
    files.insert_str("package.json", to_json("package.json", &manifest)?)?;

    let workflow = workflow::render(&workflow::publish_workflow(&context.default_branch))
        .map_err(|e| ScaffoldError::Render {
            path: workflow::WORKFLOW_PATH,
            message: e.to_string(),
        })?;
    files.insert_str(workflow::WORKFLOW_PATH, workflow)?;

    files.insert_str("README.md", readme(registry, base, &context.repo_url))?;
    files.insert_str(".gitignore", GITIGNORE)?;

    Ok(files)
}

const GITIGNORE: &str = "node_modules/\npublic/r/\n.DS_Store\n";

fn to_json<T: serde::Serialize>(path: &'static str, value: &T) -> Result<String, ScaffoldError> {
    serde_json::to_string_pretty(value)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| ScaffoldError::Render {
            path,
            message: e.to_string(),
        })
}

fn readme(registry: &Registry, base: &str, repo_url: &str) -> String {
    let mut out = format!("# {}\n\n", registry.name);
    if let Some(description) = &registry.description {
        out.push_str(description.trim());
        out.push_str("\n\n");
    }

    out.push_str("## Items\n\n");
    if registry.items.is_empty() {
        out.push_str("This registry has no items yet.\n");
    }
    for item in &registry.items {
        let summary = item
            .description
            .as_deref()
            .or(item.title.as_deref())
            .unwrap_or(&item.kind);
        out.push_str(&format!("- `{}`: {}\n", item.name, summary));
    }

    out.push_str("\n## Install\n\n");
    out.push_str("Add an item to a project with the shadcn CLI:\n\n```bash\n");
    match registry.items.first() {
        Some(item) => out.push_str(&format!("npx shadcn@latest add {base}/r/{}.json\n", item.name)),
        None => out.push_str(&format!("npx shadcn@latest add {base}/r/<item>.json\n")),
    }
    out.push_str("```\n\n");
    out.push_str(&format!(
        "Sources live in [{repo_url}]({repo_url}). The registry is rebuilt and \
         redeployed on every push.\n"
    ));
    out
}
