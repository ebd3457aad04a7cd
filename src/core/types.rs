//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`ObjectId`] - Remote Git object identifier (blob, tree, or commit SHA)
//! - [`RepoPath`] - Repository-relative file path
//! - [`Fingerprint`] - Content hash used to detect changed files
//! - [`RegistryId`] - Identifier of a registry in external storage
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a malformed path or SHA never reaches the
//! remote API.
//!
//! # Examples
//!
//! ```
//! use regsync::core::types::{BranchName, Fingerprint, ObjectId, RepoPath};
//!
//! let branch = BranchName::new("main").unwrap();
//! let oid = ObjectId::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let path = RepoPath::new("registry/button/button.tsx").unwrap();
//! let fp = Fingerprint::of("export {}");
//!
//! assert!(RepoPath::new("../escape").is_err());
//! assert!(ObjectId::new("not-a-sha").is_err());
//! assert_eq!(fp, Fingerprint::of("export {}"));
//! # let _ = (branch, oid, path);
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("invalid repository path: {0}")]
    InvalidRepoPath(String),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid registry id: {0}")]
    InvalidRegistryId(String),
}

/// A validated Git branch name.
///
/// Only the subset of `git check-ref-format` rules that matter for a
/// branch we create through the REST API is enforced:
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.`, `-` or `/`, cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, whitespace, control characters,
///   or any of `~ ^ : \ ? * [`
///
/// # Example
///
/// ```
/// use regsync::core::types::BranchName;
///
/// let name = BranchName::new("gh-pages").unwrap();
/// assert_eq!(name.as_str(), "gh-pages");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("main.lock").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |reason: &str| Err(TypeError::InvalidBranchName(reason.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') || name.starts_with('-') || name.starts_with('/') {
            return reject("branch name cannot start with '.', '-' or '/'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return reject("branch name cannot end with '.lock' or '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{bad}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fully qualified ref (`refs/heads/<branch>`).
    pub fn qualified(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl Default for BranchName {
    fn default() -> Self {
        Self("main".to_string())
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An identifier for a remote Git object (SHA-1 or SHA-256).
///
/// Identifiers are normalized to lowercase so that comparisons between the
/// snapshot's recorded commit and the remote head are exact.
///
/// # Example
///
/// ```
/// use regsync::core::types::ObjectId;
///
/// let oid = ObjectId::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidObjectId` if the string is not a 40 or 64
    /// character hex digest.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidObjectId(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidObjectId(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the id.
    ///
    /// Returns the first `len` characters, or the whole id if shorter.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ObjectId> for String {
    fn from(oid: ObjectId) -> Self {
        oid.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A repository-relative file path.
///
/// Paths use `/` separators and must stay inside the repository:
/// - Cannot be empty, absolute, or end with `/`
/// - No empty, `.` or `..` components
/// - No `.git` component
/// - No backslashes or control characters
///
/// Ordering is lexicographic so file sets iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoPath(String);

impl RepoPath {
    /// Create a new validated repository path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoPath` if the path could escape the
    /// repository root or would be rejected by the tree API.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        Self::validate(&path)?;
        Ok(Self(path))
    }

    fn validate(path: &str) -> Result<(), TypeError> {
        let reject = |reason: String| Err(TypeError::InvalidRepoPath(reason));

        if path.is_empty() {
            return reject("path cannot be empty".into());
        }
        if path.starts_with('/') {
            return reject(format!("'{path}' must be relative"));
        }
        if path.contains('\\') {
            return reject(format!("'{path}' must use '/' separators"));
        }
        if path.chars().any(|c| c.is_control()) {
            return reject(format!("'{path}' contains control characters"));
        }
        for component in path.split('/') {
            match component {
                "" => return reject(format!("'{path}' has an empty component")),
                "." | ".." => return reject(format!("'{path}' contains '{component}'")),
                ".git" => return reject(format!("'{path}' cannot write into .git")),
                _ => {}
            }
        }
        Ok(())
    }

    /// Join a relative segment onto this path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoPath` if the joined path is invalid.
    pub fn join(&self, segment: &str) -> Result<Self, TypeError> {
        Self::new(format!("{}/{}", self.0, segment))
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepoPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepoPath> for String {
    fn from(path: RepoPath) -> Self {
        path.0
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content fingerprint of a published file.
///
/// Lowercase hex SHA-256 of the file bytes. Two files with identical content
/// always have the same fingerprint regardless of when they were saved.
///
/// # Example
///
/// ```
/// use regsync::core::types::Fingerprint;
///
/// let a = Fingerprint::of("hello");
/// let b = Fingerprint::of(String::from("hello"));
/// assert_eq!(a, b);
/// assert_ne!(a, Fingerprint::of("hello\n"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of some content.
    pub fn of(content: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_ref());
        Self(hex::encode(hasher.finalize()))
    }

    /// Parse a stored fingerprint.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidFingerprint` unless the value is 64 hex characters.
    pub fn parse(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into().to_ascii_lowercase();
        if value.len() != 64 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidFingerprint(format!(
                "expected 64 hex characters, got '{value}'"
            )));
        }
        Ok(Self(value))
    }

    /// Get the fingerprint as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a registry in external storage.
///
/// Ids name files in the data directory, so they are restricted to ASCII
/// letters, digits, `-`, `_` and `.`, may not start with `.`, and are at
/// most 128 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistryId(String);

impl RegistryId {
    /// Create a new validated registry id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRegistryId` if the id is empty, too long,
    /// starts with `.`, or contains other characters.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() || id.len() > 128 {
            return Err(TypeError::InvalidRegistryId(
                "id must be 1-128 characters".into(),
            ));
        }
        if id.starts_with('.') {
            return Err(TypeError::InvalidRegistryId(format!(
                "'{id}' cannot start with '.'"
            )));
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(TypeError::InvalidRegistryId(format!(
                "'{id}' contains '{c}'"
            )));
        }
        Ok(Self(id))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RegistryId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RegistryId> for String {
    fn from(id: RegistryId) -> Self {
        id.0
    }
}

impl std::str::FromStr for RegistryId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for RegistryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
