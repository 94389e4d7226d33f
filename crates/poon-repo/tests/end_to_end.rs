use std::fs;
use std::path::Path;
use std::sync::Arc;

use poon_patch::{parse_patch, PatchError};
use poon_repo::{ObjectType, RepoError, Repository, RepositoryConfig};
use poon_store::DiskBackend;
use tempfile::TempDir;

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

const README_PATCH: &str = "\
--- a/README.md
+++ b/README.md
@@ -1 +1 @@
-hello
+world
";

#[test]
fn patch_creates_new_version_and_keeps_old() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("README.md", "hello\n")]);
    let repo = Repository::in_memory();

    let v1 = repo.create_commit_from_filesystem(dir.path(), "alice", "initial").unwrap();
    assert_eq!(v1.version, 1);

    let v2 = repo.apply_patch(README_PATCH.as_bytes(), "bob", "say world").unwrap();
    assert_eq!(v2.version, 2);
    assert_eq!(repo.current_version().unwrap(), 2);

    assert_eq!(repo.read_file(2, "README.md").unwrap(), b"world\n");
    assert_eq!(repo.read_file(1, "README.md").unwrap(), b"hello\n");

    let commit = repo.commit_at(2).unwrap();
    assert_eq!(commit.parent, Some(v1.commit_hash));
    assert_eq!(commit.author, "bob");
    assert_eq!(commit.message, "say world");
}

#[test]
fn traversal_target_is_rejected_without_new_version() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("README.md", "hello\n")]);
    let repo = Repository::in_memory();
    repo.create_commit_from_filesystem(dir.path(), "alice", "initial").unwrap();

    let evil = "--- a/../../etc/passwd\n+++ b/../../etc/passwd\n@@ -1 +1 @@\n-root\n+owned\n";
    let err = repo.apply_patch(evil.as_bytes(), "mallory", "escape").unwrap_err();
    assert!(matches!(err, RepoError::InvalidTargetPath { .. }));
    assert_eq!(repo.current_version().unwrap(), 1);
}

#[test]
fn patch_on_empty_repository_fails() {
    let repo = Repository::in_memory();
    let err = repo.apply_patch(README_PATCH.as_bytes(), "alice", "too early").unwrap_err();
    assert!(matches!(err, RepoError::EmptyRepository));
    assert_eq!(repo.current_version().unwrap(), 0);
}

#[test]
fn malformed_patches_are_rejected() {
    assert_eq!(parse_patch(b"not a valid patch").unwrap_err(), PatchError::MissingHeaders);
    assert_eq!(parse_patch(b"").unwrap_err(), PatchError::EmptyPatch);

    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("README.md", "hello\n")]);
    let repo = Repository::in_memory();
    repo.create_commit_from_filesystem(dir.path(), "alice", "initial").unwrap();
    let err = repo.apply_patch(b"not a valid patch", "alice", "junk").unwrap_err();
    assert!(matches!(err, RepoError::PatchParse(PatchError::MissingHeaders)));
}

#[test]
fn deep_patch_shares_untouched_subtrees() {
    let dir = TempDir::new().unwrap();
    write_tree(
        dir.path(),
        &[
            ("src/core/engine.rs", "fn run() {}\n"),
            ("src/core/util.rs", "fn help() {}\n"),
            ("src/cli/main.rs", "fn main() {}\n"),
            ("docs/guide.md", "# Guide\n"),
        ],
    );
    let repo = Repository::in_memory();
    repo.create_commit_from_filesystem(dir.path(), "alice", "initial").unwrap();

    let patch = "--- a/src/core/engine.rs\n+++ b/src/core/engine.rs\n@@ -1 +1 @@\n-fn run() {}\n+fn run() { go() }\n";
    repo.apply_patch(patch.as_bytes(), "bob", "tweak engine").unwrap();

    let entry = |version, dir: &str, name: &str| {
        repo.read_directory(version, dir)
            .unwrap()
            .into_iter()
            .find(|e| e.name == name)
            .unwrap()
    };

    // untouched siblings at every depth keep their hashes
    assert_eq!(entry(1, "", "docs").hash, entry(2, "", "docs").hash);
    assert_eq!(entry(1, "src", "cli").hash, entry(2, "src", "cli").hash);
    assert_eq!(entry(1, "src/core", "util.rs").hash, entry(2, "src/core", "util.rs").hash);

    // every directory on the path is rewritten
    assert_ne!(entry(1, "", "src").hash, entry(2, "", "src").hash);
    assert_ne!(entry(1, "src", "core").hash, entry(2, "src", "core").hash);
    assert_ne!(entry(1, "src/core", "engine.rs").hash, entry(2, "src/core", "engine.rs").hash);
    assert_eq!(entry(2, "src", "core").entry_type, ObjectType::Tree);

    assert_eq!(repo.read_file(2, "src/core/engine.rs").unwrap(), b"fn run() { go() }\n");
}

#[test]
fn identical_snapshots_share_root_tree() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("a.txt", "same\n"), ("b/c.txt", "also same\n")]);
    let repo = Repository::in_memory();

    let v1 = repo.create_commit_from_filesystem(dir.path(), "alice", "first").unwrap();
    let v2 = repo.create_commit_from_filesystem(dir.path(), "alice", "second").unwrap();

    assert_eq!((v1.version, v2.version), (1, 2));
    assert_ne!(v1.commit_hash, v2.commit_hash);
    assert_eq!(repo.commit_at(1).unwrap().root_tree, repo.commit_at(2).unwrap().root_tree);
}

#[test]
fn disk_repository_survives_reopen() {
    let store_dir = TempDir::new().unwrap();
    let src = TempDir::new().unwrap();
    write_tree(src.path(), &[("README.md", "hello\n")]);

    {
        let repo = Repository::new(Arc::new(DiskBackend::open(store_dir.path()).unwrap()));
        repo.create_commit_from_filesystem(src.path(), "alice", "initial").unwrap();
        repo.apply_patch(README_PATCH.as_bytes(), "bob", "say world").unwrap();
        repo.close().unwrap();
    }

    let config = RepositoryConfig::disk(store_dir.path());
    let repo = Repository::open(&config).unwrap();
    assert_eq!(repo.current_version().unwrap(), 2);
    assert_eq!(repo.read_file(1, "README.md").unwrap(), b"hello\n");
    assert_eq!(repo.read_file(2, "README.md").unwrap(), b"world\n");
    assert!(repo.verify_objects().unwrap().is_ok());
}
