//! Registry index and build configuration documents.

use serde::Serialize;

use crate::core::types::RepoPath;
use crate::registry::{Registry, RegistryError, RegistryItem};

/// Published schema of the index document.
pub const REGISTRY_SCHEMA_URL: &str = "https://ui.shadcn.com/schema/registry.json";

/// `registry.json`: item metadata and file descriptors, no file bodies.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryIndex<'a> {
    #[serde(rename = "$schema")]
    pub schema: &'static str,
    pub name: &'a str,
    pub homepage: &'a str,
    pub items: Vec<IndexItem<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexItem<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    #[serde(skip_serializing_if = "no_entries")]
    pub dependencies: &'a [String],
    #[serde(skip_serializing_if = "no_entries")]
    pub registry_dependencies: &'a [String],
    pub files: Vec<IndexFile<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ItemMeta<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexFile<'a> {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemMeta<'a> {
    pub version: &'a str,
}

impl<'a> RegistryIndex<'a> {
    pub fn new(registry: &'a Registry, homepage: &'a str) -> Result<Self, RegistryError> {
        let items = registry
            .items
            .iter()
            .map(IndexItem::new)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            schema: REGISTRY_SCHEMA_URL,
            name: &registry.name,
            homepage,
            items,
        })
    }
}

impl<'a> IndexItem<'a> {
    fn new(item: &'a RegistryItem) -> Result<Self, RegistryError> {
        let dir = item.dir()?;
        let files = item
            .files
            .iter()
            .map(|file| {
                Ok(IndexFile {
                    path: file_path(&dir, &file.path)?.to_string(),
                    kind: &file.kind,
                    target: file.target.as_deref(),
                })
            })
            .collect::<Result<_, RegistryError>>()?;
        Ok(Self {
            name: &item.name,
            kind: &item.kind,
            title: item.title.as_deref(),
            description: item.description.as_deref(),
            dependencies: &item.dependencies,
            registry_dependencies: &item.registry_dependencies,
            files,
            meta: item.version.as_deref().map(|version| ItemMeta { version }),
        })
    }
}

fn no_entries(list: &&[String]) -> bool {
    list.is_empty()
}

/// Repository path of one item file.
pub fn file_path(item_dir: &RepoPath, file: &str) -> Result<RepoPath, RegistryError> {
    item_dir
        .join(file)
        .map_err(|e| RegistryError::Invalid(e.to_string()))
}

/// `package.json` driving the registry build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: String,
    pub version: &'static str,
    pub private: bool,
    pub scripts: Scripts,
    pub dev_dependencies: DevDependencies,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scripts {
    #[serde(rename = "registry:build")]
    pub registry_build: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevDependencies {
    pub shadcn: &'static str,
}

impl PackageManifest {
    pub fn new(registry: &Registry) -> Self {
        Self {
            name: package_name(registry.id.as_str()),
            version: "0.0.0",
            private: true,
            scripts: Scripts {
                registry_build: "shadcn build",
            },
            dev_dependencies: DevDependencies { shadcn: "latest" },
        }
    }
}

/// npm package names are lowercase and cannot start with `.` or `_`.
fn package_name(id: &str) -> String {
    let name = id.to_ascii_lowercase();
    let name = name.trim_start_matches(['.', '_']);
    if name.is_empty() {
        "registry".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_names() {
        assert_eq!(package_name("Acme-UI"), "acme-ui");
        assert_eq!(package_name("_private"), "private");
        assert_eq!(package_name("___"), "registry");
    }
}
