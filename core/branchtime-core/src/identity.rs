use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const HASH_PREFIX_LEN: usize = 12;

/// Stable identity of one tracked project root: `<basename>-<md5 prefix>`.
///
/// The basename keeps ledger files readable; the hash of the canonical
/// absolute path keeps two checkouts named `app` apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceIdentity(String);

impl WorkspaceIdentity {
    pub fn from_root(project_root: &Path) -> Self {
        let canonical = canonicalize_path(project_root);
        let source = canonical.to_string_lossy().to_string();
        #[cfg(target_os = "macos")]
        let source = source.to_lowercase();
        let digest = format!("{:x}", md5::compute(source));

        let name = canonical
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "root".to_string());

        WorkspaceIdentity(format!("{}-{}", name, &digest[..HASH_PREFIX_LEN]))
    }

    /// Wraps an identity read back from storage or typed by a user.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        WorkspaceIdentity(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WorkspaceIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn canonicalize_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| absolute_path(path))
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
