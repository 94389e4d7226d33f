use std::path::{Path, PathBuf};

use poon_store::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// Repository settings, loadable from TOML.
///
/// ```toml
/// [backend]
/// type = "disk"
/// root = "/var/lib/poon"
///
/// [patch]
/// verify_context = true
///
/// [ingest]
/// skip_names = [".git", "target"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub backend: BackendConfig,
    pub patch: PatchConfig,
    pub ingest: IngestConfig,
    pub defaults: DefaultsConfig,
}

/// Where objects and version records live.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    #[default]
    Memory,
    Disk { root: PathBuf },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Require context and removed lines to match the file being patched.
    pub verify_context: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory entry names skipped while snapshotting a directory.
    pub skip_names: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            skip_names: vec![".git".to_string()],
        }
    }
}

/// Modes for entries created by patch application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub file_mode: u32,
    pub dir_mode: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            file_mode: DEFAULT_FILE_MODE,
            dir_mode: DEFAULT_DIR_MODE,
        }
    }
}

impl RepositoryConfig {
    /// In-memory repository with default settings.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Disk-backed repository rooted at `root`, other settings default.
    pub fn disk(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::Disk { root: root.into() },
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> RepoResult<Self> {
        toml::from_str(text).map_err(|e| RepoError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RepoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> RepoResult<String> {
        toml::to_string_pretty(self).map_err(|e| RepoError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = RepositoryConfig::default();
        assert_eq!(c.backend, BackendConfig::Memory);
        assert!(!c.patch.verify_context);
        assert_eq!(c.ingest.skip_names, vec![".git"]);
        assert_eq!(c.defaults.file_mode, 0o644);
        assert_eq!(c.defaults.dir_mode, 0o755);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(RepositoryConfig::from_toml_str("").unwrap(), RepositoryConfig::default());
    }

    #[test]
    fn parses_disk_backend_and_overrides() {
        let c = RepositoryConfig::from_toml_str(
            r#"
            [backend]
            type = "disk"
            root = "/srv/poon"

            [patch]
            verify_context = true

            [ingest]
            skip_names = [".git", "node_modules"]
            "#,
        )
        .unwrap();
        assert_eq!(c.backend, BackendConfig::Disk { root: "/srv/poon".into() });
        assert!(c.patch.verify_context);
        assert_eq!(c.ingest.skip_names.len(), 2);
        assert_eq!(c.defaults, DefaultsConfig::default());
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = RepositoryConfig::from_toml_str("[backend]\ntype = \"s3\"\n").unwrap_err();
        assert!(matches!(err, RepoError::Config(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let c = RepositoryConfig::disk("/tmp/store");
        let text = c.to_toml_string().unwrap();
        assert_eq!(RepositoryConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("poon.toml");
        std::fs::write(&path, "[patch]\nverify_context = true\n").unwrap();
        assert!(RepositoryConfig::load(&path).unwrap().patch.verify_context);
        assert!(matches!(
            RepositoryConfig::load(dir.path().join("missing.toml")),
            Err(RepoError::Io { .. })
        ));
    }
}
